//! Key unwrapping and payload signing.
//!
//! The [`Signer`] decrypts an at-rest encrypted private key with a password
//! and can then sign byte payloads, like request metadata or new documents.
//! The decryption scheme is AES-CMAC-SIV with a password-derived key; the
//! signature scheme is the recoverable signed-message format, so verifiers
//! can derive the signing address from the message and signature alone.

use aes_siv::aead::{Aead, KeyInit};
use aes_siv::{Aes128SivAead, Nonce};
use bitcoin::hashes::{sha256d, Hash, HashEngine};
use bitcoin::secp256k1::{All, Message, Secp256k1};
use bitcoin::sign_message::MessageSignature;
use bitcoin::{Address, Network, NetworkKind, PrivateKey};
use zeroize::Zeroizing;

use crate::envelope::SignedPayload;
use crate::types::{
    ConstataError, Result, AEAD_KEY_SIZE, MAX_PASSWORD_SIZE, NONCE_SIZE, SIGNED_MSG_PREFIX,
    TAG_SIZE,
};

/// Holds an unwrapped signing key and its derived address.
///
/// The key is immutable after construction and signing does not mutate any
/// state, so a single instance may serve concurrent sign calls.
pub struct Signer {
    key: PrivateKey,
    address: String,
    secp: Secp256k1<All>,
}

impl Signer {
    /// Decrypts `encrypted_key_hex` with `password` and parses the plaintext
    /// as a WIF private key under `network`.
    ///
    /// The encrypted blob is a 16-byte nonce followed by the tag and
    /// ciphertext. The AEAD key is the password's bytes zero-padded to
    /// 32 bytes; passwords over 32 bytes are rejected outright.
    pub fn new(encrypted_key_hex: &str, password: &str, network: Network) -> Result<Self> {
        if password.len() > MAX_PASSWORD_SIZE {
            return Err(ConstataError::InvalidPassword(password.len()));
        }

        let mut aead_key = Zeroizing::new([0u8; AEAD_KEY_SIZE]);
        aead_key[..password.len()].copy_from_slice(password.as_bytes());

        let encrypted_key = hex::decode(encrypted_key_hex)
            .map_err(|e| ConstataError::MalformedKey(format!("not valid hex: {e}")))?;

        if encrypted_key.len() < NONCE_SIZE + TAG_SIZE {
            return Err(ConstataError::MalformedKey(format!(
                "{} bytes is too short for a nonce and tag",
                encrypted_key.len()
            )));
        }

        let (nonce, ciphertext) = encrypted_key.split_at(NONCE_SIZE);

        let cipher = Aes128SivAead::new_from_slice(aead_key.as_slice())
            .map_err(|_| ConstataError::DecryptionFailed)?;
        let decrypted = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| ConstataError::DecryptionFailed)?,
        );

        let wif = std::str::from_utf8(&decrypted)
            .map_err(|_| ConstataError::InvalidPrivateKey("not valid UTF-8".into()))?;
        let key = PrivateKey::from_wif(wif)
            .map_err(|e| ConstataError::InvalidPrivateKey(e.to_string()))?;
        if key.network != NetworkKind::from(network) {
            return Err(ConstataError::InvalidPrivateKey(format!(
                "key is not for the {network} network"
            )));
        }

        let secp = Secp256k1::new();
        let address = Address::p2pkh(key.public_key(&secp).pubkey_hash(), network).to_string();

        Ok(Self { key, address, secp })
    }

    /// The legacy P2PKH address of the held key.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Signs `bytes`, producing a self-describing envelope.
    ///
    /// The signature covers the raw bytes (not their base64 transport form)
    /// in the signed-message digest format.
    pub fn sign(&self, bytes: &[u8]) -> Result<SignedPayload> {
        let digest = signed_message_hash(bytes);
        let message = Message::from_digest(digest.to_byte_array());
        let recoverable = self.secp.sign_ecdsa_recoverable(&message, &self.key.inner);
        let signature = MessageSignature::new(recoverable, self.key.compressed);

        Ok(SignedPayload::new(
            bytes,
            self.address.clone(),
            signature.to_base64(),
        ))
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("key", &"[REDACTED]")
            .field("address", &self.address)
            .finish()
    }
}

/// Double-SHA256 digest of a byte message in the signed-message format:
/// magic prefix, compact-size length, then the message itself.
pub(crate) fn signed_message_hash(msg: &[u8]) -> sha256d::Hash {
    let mut engine = sha256d::Hash::engine();
    engine.input(SIGNED_MSG_PREFIX);
    engine.input(&compact_size(msg.len() as u64));
    engine.input(msg);
    sha256d::Hash::from_engine(engine)
}

/// Little-endian compact-size length prefix.
fn compact_size(n: u64) -> Vec<u8> {
    match n {
        0..=0xFC => vec![n as u8],
        0xFD..=0xFFFF => {
            let mut out = vec![0xFD];
            out.extend_from_slice(&(n as u16).to_le_bytes());
            out
        }
        0x1_0000..=0xFFFF_FFFF => {
            let mut out = vec![0xFE];
            out.extend_from_slice(&(n as u32).to_le_bytes());
            out
        }
        _ => {
            let mut out = vec![0xFF];
            out.extend_from_slice(&n.to_le_bytes());
            out
        }
    }
}
