//! Domain models returned by the Constata API.
//!
//! Field names follow the GraphQL schema (camelCase on the wire). Unknown
//! fields in a response are ignored, so the client keeps working when the
//! server adds fields.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// An attestation of one or more documents.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    /// Unique identifier.
    pub id: i32,
    /// Person that created the attestation.
    pub person_id: i32,
    /// Organization the person belongs to.
    pub org_id: i32,
    /// Optional markers text used for searching.
    pub markers: Option<String>,
    /// Documents can be appended until this date.
    pub open_until: Option<DateTime<Utc>>,
    /// Processing state, e.g. "processing", "done", "parked".
    pub state: Option<String>,
    /// Why the attestation is parked, if it is.
    pub parking_reason: Option<String>,
    /// Documents already attested.
    pub done_documents: i32,
    /// Documents waiting on payment or terms acceptance.
    pub parked_documents: i32,
    /// Documents being attested right now.
    pub processing_documents: i32,
    /// Total documents in this attestation.
    pub total_documents: i32,
    /// Token cost of the whole attestation.
    pub tokens_cost: f64,
    /// Tokens already paid for.
    pub tokens_paid: f64,
    /// Tokens still owed.
    pub tokens_owed: f64,
    /// Checkout link for missing tokens.
    pub buy_tokens_url: Option<String>,
    /// Link to accept the terms and conditions.
    pub accept_tyc_url: Option<String>,
    /// Date of the most recently added document.
    pub last_doc_date: Option<DateTime<Utc>>,
    /// Addresses that receive the admin access link by email.
    pub email_admin_access_url_to: Option<Vec<String>>,
    /// Administrative access link for this attestation.
    pub admin_access_url: Option<String>,
    /// Creation date.
    pub created_at: Option<DateTime<Utc>>,
}

/// A standalone verifiable HTML export of an attestation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationHtmlExport {
    /// Attestation id this export belongs to.
    pub id: i32,
    /// Self-contained HTML document with embedded proofs.
    pub verifiable_html: String,
}

/// Account-state fields returned when updating the web callbacks URL.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    /// Account id.
    pub id: i32,
    /// URL web callbacks are delivered to.
    pub web_callbacks_url: Option<String>,
}

/// A web callback the server has scheduled or delivered.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebCallback {
    /// Unique identifier.
    pub id: i32,
    /// Callback kind, e.g. "AttestationDone".
    pub kind: String,
    /// Id of the resource the callback refers to.
    pub resource_id: i32,
    /// Delivery state.
    pub state: String,
    /// Id of the latest delivery attempt, if any.
    pub last_attempt_id: Option<i32>,
    /// Creation date.
    pub created_at: DateTime<Utc>,
    /// When the next delivery attempt is due.
    pub next_attempt_on: DateTime<Utc>,
    /// The signed body that gets POSTed to the callbacks URL.
    pub request_body: String,
}

/// One delivery attempt of a web callback.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebCallbackAttempt {
    /// Unique identifier.
    pub id: i32,
    /// The callback this attempt belongs to.
    pub web_callback_id: i32,
    /// When the attempt was made.
    pub attempted_at: DateTime<Utc>,
    /// URL the callback was posted to.
    pub url: String,
    /// Outcome code, e.g. "OK" or "NETWORK_ERROR".
    pub result_code: String,
    /// Human-readable outcome detail.
    pub result_text: String,
}
