//! Signed payload envelope for the Constata wire protocol.
//!
//! The same envelope shape travels in both directions: outbound inside the
//! `Authentication` header, and inbound as the body of a web callback.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::types::{ConstataError, Result};

/// A byte payload together with the address that signed it.
///
/// Field order matters: the JSON serialization is `payload`, `signer`,
/// `signature`, and the server hashes header values as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    /// Base64 encoding of the signed bytes.
    pub payload: String,
    /// Address of the signing key.
    pub signer: String,
    /// Base64 compact recoverable signature over the raw (non-base64) bytes.
    pub signature: String,
}

impl SignedPayload {
    /// Creates an envelope from raw payload bytes and a finished signature.
    pub fn new(bytes: &[u8], signer: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            payload: BASE64.encode(bytes),
            signer: signer.into(),
            signature: signature.into(),
        }
    }

    /// Decodes the base64 payload back to raw bytes.
    pub fn payload_bytes(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.payload)
            .map_err(|e| ConstataError::MalformedCallback(format!("payload is not base64: {e}")))
    }

    /// Serializes the envelope to its JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ConstataError::SigningFailed(e.to_string()))
    }
}
