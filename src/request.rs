//! Authentication of outbound requests.
//!
//! Every authenticated request carries an `Authentication` header whose value
//! is a signed envelope over canonical metadata about the request itself:
//! path, method, a millisecond nonce, and content hashes. The server checks
//! the signature and hashes; the body itself is never signed directly.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sha2::{Digest, Sha256};
use url::Url;

use crate::signer::Signer;
use crate::types::{ConstataError, Result};

/// Canonical metadata signed for one outbound request.
///
/// Serialization is part of the protocol: compact JSON with exactly this
/// field order, absent hashes encoded as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetadata {
    /// Absolute path of the request, without host or query string.
    pub path: String,
    /// Uppercase HTTP verb.
    pub method: String,
    /// Milliseconds since the Unix epoch. Wall-clock time; uniqueness across
    /// rapid requests is not guaranteed and the server owns the replay window.
    pub nonce: i64,
    /// Uppercase hex SHA-256 of the request body, if there is one.
    pub body_hash: Option<String>,
    /// Uppercase hex SHA-256 of the query string (leading `?` stripped), if
    /// the query string is non-empty.
    pub query_hash: Option<String>,
}

impl RequestMetadata {
    /// Builds metadata for a request about to be sent to `url`.
    pub fn for_request(url: &Url, method: &str, body: Option<&str>) -> Self {
        Self {
            path: url.path().to_string(),
            method: method.to_uppercase(),
            nonce: now_millis(),
            body_hash: body.map(hex_digest),
            query_hash: url.query().filter(|q| !q.is_empty()).map(hex_digest),
        }
    }

    /// Serializes the metadata to the exact byte sequence that gets signed.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ConstataError::SigningFailed(e.to_string()))
    }
}

/// Produces the `Authentication` header value for one request: the JSON
/// serialization of the signed metadata envelope.
///
/// Each request gets exactly one fresh signature; any hashing or signing
/// failure fails the whole send, there is no unauthenticated fallback.
pub fn authentication_header(signer: &Signer, metadata: &RequestMetadata) -> Result<String> {
    let envelope = signer.sign(&metadata.canonical_bytes()?)?;
    envelope.to_json()
}

/// Uppercase hex SHA-256 of a UTF-8 string.
pub(crate) fn hex_digest(text: impl AsRef<str>) -> String {
    hex::encode_upper(Sha256::digest(text.as_ref().as_bytes()))
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
