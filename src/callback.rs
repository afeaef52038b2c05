//! Verification of inbound web callbacks.
//!
//! The server signs every callback body with its per-environment key. The
//! verifier recovers the signing public key from the signature, encodes it
//! as a segwit address under the environment's callback network, and only
//! exposes the decoded payload once that address matches the trusted one.
//! Verification gates disclosure; nothing of the payload leaks on failure.

use bitcoin::secp256k1::Secp256k1;
use bitcoin::sign_message::MessageSignature;
use bitcoin::{Address, CompressedPublicKey, Network};
use serde_json::Value;
use tracing::debug;

use crate::envelope::SignedPayload;
use crate::environment::Environment;
use crate::signer::signed_message_hash;
use crate::types::{ConstataError, Result};

/// A web callback whose signature has been verified.
///
/// `kind` tags what happened; `resource` is the affected object as opaque
/// JSON. Callers must branch on `kind` before interpreting `resource` —
/// kinds unknown to this crate are data, not errors.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWebCallback {
    /// Callback kind tag, e.g. `"AttestationDone"`.
    pub kind: String,
    /// The resource the callback refers to.
    pub resource: Value,
}

impl ParsedWebCallback {
    /// Verifies and parses a raw callback body for `environment`.
    pub fn parse(raw_body: &str, environment: Environment) -> Result<Self> {
        Self::parse_with_trusted(
            raw_body,
            environment.trusted_address(),
            environment.callback_network(),
        )
    }

    /// Verifies and parses a raw callback body against an explicit trusted
    /// address and its network. This is the verification core; `parse` just
    /// supplies the environment's constants.
    pub fn parse_with_trusted(
        raw_body: &str,
        trusted_address: &str,
        network: Network,
    ) -> Result<Self> {
        let signed: SignedPayload = serde_json::from_str(raw_body)
            .map_err(|e| ConstataError::MalformedCallback(format!("not a signed envelope: {e}")))?;

        let payload = signed.payload_bytes()?;
        let signature = MessageSignature::from_base64(&signed.signature)
            .map_err(|e| ConstataError::MalformedCallback(format!("bad signature: {e}")))?;

        let secp = Secp256k1::verification_only();
        let digest = signed_message_hash(&payload);
        let pubkey = signature
            .recover_pubkey(&secp, digest)
            .map_err(|e| ConstataError::MalformedCallback(format!("unrecoverable signature: {e}")))?;

        let recovered = Address::p2wpkh(&CompressedPublicKey(pubkey.inner), network).to_string();
        if recovered != trusted_address {
            return Err(ConstataError::UntrustedCallback(recovered));
        }
        debug!(signer = %recovered, "verified web callback signature");

        let inner: Value = serde_json::from_slice(&payload)
            .map_err(|e| ConstataError::MalformedCallback(format!("payload is not JSON: {e}")))?;
        let kind = inner
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| ConstataError::MalformedCallback("missing kind field".into()))?
            .to_string();
        let resource = inner.get("resource").cloned().unwrap_or(Value::Null);

        Ok(Self { kind, resource })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::testutil::{test_signer, TEST_SEGWIT_ADDRESS};

    const CALLBACK_BODY: &[u8] = br#"{"kind":"AttestationDone","resource":{"id":7,"state":"done"}}"#;

    fn signed_callback(payload: &[u8]) -> String {
        let envelope = test_signer().sign(payload).unwrap();
        envelope.to_json().unwrap()
    }

    #[test]
    fn test_verify_roundtrip() {
        let raw = signed_callback(CALLBACK_BODY);
        let callback =
            ParsedWebCallback::parse_with_trusted(&raw, TEST_SEGWIT_ADDRESS, Network::Bitcoin)
                .unwrap();

        assert_eq!(callback.kind, "AttestationDone");
        assert_eq!(callback.resource["id"], 7);
        assert_eq!(callback.resource["state"], "done");
    }

    #[test]
    fn test_unknown_kind_is_data_not_error() {
        let raw = signed_callback(br#"{"kind":"SomethingNew","resource":{}}"#);
        let callback =
            ParsedWebCallback::parse_with_trusted(&raw, TEST_SEGWIT_ADDRESS, Network::Bitcoin)
                .unwrap();
        assert_eq!(callback.kind, "SomethingNew");
    }

    #[test]
    fn test_missing_resource_is_null() {
        let raw = signed_callback(br#"{"kind":"AttestationDone"}"#);
        let callback =
            ParsedWebCallback::parse_with_trusted(&raw, TEST_SEGWIT_ADDRESS, Network::Bitcoin)
                .unwrap();
        assert_eq!(callback.resource, Value::Null);
    }

    #[test]
    fn test_wrong_trusted_address_is_untrusted() {
        // The same bytes verified against another environment's trusted
        // address must be rejected before any payload field is exposed.
        let raw = signed_callback(CALLBACK_BODY);
        let result = ParsedWebCallback::parse(&raw, Environment::Production);
        match result {
            Err(ConstataError::UntrustedCallback(recovered)) => {
                assert_eq!(recovered, TEST_SEGWIT_ADDRESS);
            }
            other => panic!("expected UntrustedCallback, got {other:?}"),
        }
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let envelope = test_signer().sign(CALLBACK_BODY).unwrap();
        let mut bytes = CALLBACK_BODY.to_vec();
        bytes[10] ^= 0x01;
        let tampered = SignedPayload::new(&bytes, envelope.signer, envelope.signature);

        let result = ParsedWebCallback::parse_with_trusted(
            &tampered.to_json().unwrap(),
            TEST_SEGWIT_ADDRESS,
            Network::Bitcoin,
        );
        assert!(matches!(
            result,
            Err(ConstataError::UntrustedCallback(_)) | Err(ConstataError::MalformedCallback(_))
        ));
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let envelope = test_signer().sign(CALLBACK_BODY).unwrap();
        let mut signature = envelope.signature.clone();
        let flipped = if signature.starts_with('I') { "J" } else { "I" };
        signature.replace_range(0..1, flipped);
        let tampered = SignedPayload {
            signature,
            ..envelope
        };

        let result = ParsedWebCallback::parse_with_trusted(
            &tampered.to_json().unwrap(),
            TEST_SEGWIT_ADDRESS,
            Network::Bitcoin,
        );
        assert!(matches!(
            result,
            Err(ConstataError::UntrustedCallback(_)) | Err(ConstataError::MalformedCallback(_))
        ));
    }

    #[test]
    fn test_body_not_an_envelope() {
        let result =
            ParsedWebCallback::parse_with_trusted("not json", TEST_SEGWIT_ADDRESS, Network::Bitcoin);
        assert!(matches!(result, Err(ConstataError::MalformedCallback(_))));
    }

    #[test]
    fn test_missing_kind_is_malformed() {
        let raw = signed_callback(br#"{"resource":{"id":1}}"#);
        let result =
            ParsedWebCallback::parse_with_trusted(&raw, TEST_SEGWIT_ADDRESS, Network::Bitcoin);
        assert!(matches!(result, Err(ConstataError::MalformedCallback(_))));
    }
}
