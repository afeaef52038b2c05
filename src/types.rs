//! Type definitions and protocol constants for the Constata client.

use thiserror::Error;

/// Size of the AEAD nonce prefixed to an encrypted key, in bytes.
pub const NONCE_SIZE: usize = 16;

/// Size of the AES-CMAC-SIV authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Size of the password-derived AEAD key in bytes.
pub const AEAD_KEY_SIZE: usize = 32;

/// Maximum password length in bytes.
pub const MAX_PASSWORD_SIZE: usize = 32;

/// Name of the HTTP header carrying the signed request metadata.
pub const AUTHENTICATION_HEADER: &str = "Authentication";

/// Magic prefix of the signed-message digest, including its own length byte.
pub const SIGNED_MSG_PREFIX: &[u8] = b"\x18Bitcoin Signed Message:\n";

/// Errors that can occur during Constata client operations.
#[derive(Error, Debug)]
pub enum ConstataError {
    // Key unwrapping errors
    /// Password exceeds the length bound; rejected before any cryptographic work.
    #[error("Invalid password: {0} bytes (max {MAX_PASSWORD_SIZE})")]
    InvalidPassword(usize),

    /// Encrypted key is not valid hex or too short to hold a nonce and tag.
    #[error("Malformed encrypted key: {0}")]
    MalformedKey(String),

    /// Authenticated decryption rejected the ciphertext. A wrong password and a
    /// corrupted ciphertext are indistinguishable here.
    #[error("Decryption failed: wrong password or corrupted key")]
    DecryptionFailed,

    /// Decrypted text is not a private key for the requested network.
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    // Signing errors
    /// Signing primitive or metadata serialization error.
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    // Callback errors
    /// Callback body does not match the expected envelope or payload shape.
    #[error("Malformed callback: {0}")]
    MalformedCallback(String),

    /// Callback signature recovers to an address other than the trusted one.
    #[error("Untrusted callback signed by {0}")]
    UntrustedCallback(String),

    // Client errors
    /// Environment name is not one of development, staging, production.
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    /// HTTP transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with GraphQL errors.
    #[error("GraphQL errors: {0}")]
    Graphql(String),

    /// The server answered with neither data nor errors.
    #[error("Invalid GraphQL response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ConstataError>;
