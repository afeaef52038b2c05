//! Constata API client.
//!
//! Rust client SDK for the Constata attestation service: authenticated
//! GraphQL requests signed with a password-protected key, and verification
//! of signed web callbacks.

mod callback;
mod client;
mod envelope;
mod environment;
mod models;
mod request;
mod signer;
mod types;

pub use callback::*;
pub use client::*;
pub use envelope::*;
pub use environment::*;
pub use models::*;
pub use request::*;
pub use signer::*;
pub use types::*;
