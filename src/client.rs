//! Authenticated GraphQL client for the Constata API.
//!
//! [`ApiClient`] is the main entry point. It composes a [`Signer`] with a
//! transport and supports any GraphQL operation through [`ApiClient::query`],
//! plus convenience functions for the common ones. The transport is a trait
//! so the signing path can be exercised without a network.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::environment::Environment;
use crate::models::{
    AccountState, Attestation, AttestationHtmlExport, WebCallback, WebCallbackAttempt,
};
use crate::request::{authentication_header, RequestMetadata};
use crate::signer::Signer;
use crate::types::{ConstataError, Result, AUTHENTICATION_HEADER};

/// Transport collaborator that delivers a serialized GraphQL request.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// Submits a JSON request body with its authentication header and
    /// returns the raw response body.
    async fn send(&self, body: String, auth_header: String) -> Result<String>;
}

/// HTTP implementation of [`GraphqlTransport`] over reqwest.
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Creates a transport posting to `endpoint`.
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn send(&self, body: String, auth_header: String) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(AUTHENTICATION_HEADER, auth_header)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        Ok(response.text().await?)
    }
}

/// The main entry point to the Constata API.
///
/// Performs authenticated GraphQL requests: every call signs metadata about
/// the request and attaches it under the `Authentication` header.
pub struct ApiClient<T: GraphqlTransport> {
    signer: Signer,
    endpoint: Url,
    transport: T,
}

impl ApiClient<HttpTransport> {
    /// Builds a client for `environment` by unwrapping the encrypted key.
    pub fn from_credentials(
        encrypted_key_hex: &str,
        password: &str,
        environment: Environment,
    ) -> Result<Self> {
        let endpoint =
            Url::parse(environment.api_url()).expect("environment endpoints are valid URLs");
        let signer = Signer::new(encrypted_key_hex, password, environment.signing_network())?;
        Ok(Self::new(signer, endpoint.clone(), HttpTransport::new(endpoint)))
    }
}

impl<T: GraphqlTransport> ApiClient<T> {
    /// Composes a client from an already-unwrapped signer and a transport.
    pub fn new(signer: Signer, endpoint: Url, transport: T) -> Self {
        Self {
            signer,
            endpoint,
            transport,
        }
    }

    /// The signer backing this client.
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Runs any GraphQL operation with a fresh authentication header.
    pub async fn query<D: DeserializeOwned>(
        &self,
        operation_name: &str,
        query: &str,
        variables: Value,
    ) -> Result<D> {
        let body = json!({
            "operationName": operation_name,
            "query": query,
            "variables": variables,
        })
        .to_string();

        let metadata = RequestMetadata::for_request(&self.endpoint, "POST", Some(&body));
        let header = authentication_header(&self.signer, &metadata)?;

        debug!(operation = operation_name, "sending authenticated GraphQL request");
        let response = self.transport.send(body, header).await?;

        let parsed: GraphqlResponse<D> = serde_json::from_str(&response)
            .map_err(|e| ConstataError::InvalidResponse(format!("unparseable response: {e}")))?;
        parsed.into_data()
    }

    /// Creates an attestation of `files`, signing each one with the held key.
    pub async fn create_attestation(
        &self,
        files: &[&[u8]],
        email_admin_access_url_to: &[&str],
        markers: Option<&str>,
    ) -> Result<Attestation> {
        let documents = files
            .iter()
            .map(|f| self.signer.sign(f))
            .collect::<Result<Vec<_>>>()?;

        let response: CreateAttestationResponse = self
            .query(
                "createAttestation",
                &format!(
                    "mutation createAttestation($input: AttestationInput!) {{\n  createAttestation(input: $input) {{\n{ATTESTATION_FIELDS}  }}\n}}"
                ),
                json!({
                    "input": {
                        "documents": documents,
                        "emailAdminAccessUrlTo": email_admin_access_url_to,
                        "markers": markers,
                    }
                }),
            )
            .await?;

        response
            .create_attestation
            .ok_or_else(|| ConstataError::InvalidResponse("no attestation returned".into()))
    }

    /// Lists the account's attestations, newest first.
    pub async fn all_attestations(&self, page: i32) -> Result<Vec<Attestation>> {
        let response: AttestationsResponse = self
            .query(
                "myAttestationsQuery",
                &format!(
                    "query myAttestationsQuery($page: Int) {{\n  allAttestations(page: $page, perPage: 200, sortField: \"createdAt\", sortOrder: \"desc\") {{\n{ATTESTATION_FIELDS}  }}\n}}"
                ),
                json!({ "page": page }),
            )
            .await?;

        Ok(response.all_attestations.unwrap_or_default())
    }

    /// Fetches one attestation by id.
    pub async fn attestation(&self, id: i32) -> Result<Attestation> {
        let response: AttestationResponse = self
            .query(
                "Attestation",
                &format!(
                    "query Attestation($id: Int!) {{\n  Attestation(id: $id) {{\n{ATTESTATION_FIELDS}  }}\n}}"
                ),
                json!({ "id": id }),
            )
            .await?;

        response
            .attestation
            .ok_or_else(|| ConstataError::InvalidResponse(format!("no attestation {id}")))
    }

    /// Exports an attestation as a standalone verifiable HTML document.
    pub async fn attestation_html_export(&self, id: i32) -> Result<AttestationHtmlExport> {
        let response: AttestationHtmlExportResponse = self
            .query(
                "AttestationHtmlExport",
                "query AttestationHtmlExport($id: Int!) {\n  AttestationHtmlExport(id: $id) {\n    id\n    verifiableHtml\n  }\n}",
                json!({ "id": id }),
            )
            .await?;

        response
            .attestation_html_export
            .ok_or_else(|| ConstataError::InvalidResponse(format!("no export for attestation {id}")))
    }

    /// Updates the URL web callbacks are delivered to; returns the new URL.
    pub async fn update_web_callbacks_url(&self, url: &str) -> Result<Option<String>> {
        let response: UpdateWebCallbacksUrlResponse = self
            .query(
                "updateWebCallbacksUrl",
                "mutation updateWebCallbacksUrl($url: String) {\n  updateWebCallbacksUrl(url: $url) {\n    id\n    webCallbacksUrl\n    __typename\n  }\n}",
                json!({ "url": url }),
            )
            .await?;

        let state = response
            .update_web_callbacks_url
            .ok_or_else(|| ConstataError::InvalidResponse("no account state returned".into()))?;
        Ok(state.web_callbacks_url)
    }

    /// Lists the account's web callbacks, newest first.
    pub async fn all_web_callbacks(&self, page: i32) -> Result<Vec<WebCallback>> {
        let response: WebCallbacksResponse = self
            .query(
                "allWebCallbacks",
                "query allWebCallbacks($page: Int) {\n  allWebCallbacks(page: $page, perPage: 200, sortField: \"createdAt\", sortOrder: \"desc\") {\n    id\n    kind\n    resourceId\n    state\n    lastAttemptId\n    createdAt\n    nextAttemptOn\n    requestBody\n  }\n}",
                json!({ "page": page }),
            )
            .await?;

        Ok(response.all_web_callbacks.unwrap_or_default())
    }

    /// Lists delivery attempts for one web callback, newest first.
    pub async fn all_web_callback_attempts(
        &self,
        web_callback_id: i32,
    ) -> Result<Vec<WebCallbackAttempt>> {
        let response: WebCallbackAttemptsResponse = self
            .query(
                "allWebCallbackAttempts",
                "query allWebCallbackAttempts($filter: WebCallbackAttemptFilter) {\n  allWebCallbackAttempts(page: 0, perPage: 200, sortField: \"attemptedAt\", sortOrder: \"desc\", filter: $filter) {\n    id\n    webCallbackId\n    attemptedAt\n    url\n    resultCode\n    resultText\n  }\n}",
                json!({ "filter": { "webCallbackIdEq": web_callback_id } }),
            )
            .await?;

        Ok(response.all_web_callback_attempts.unwrap_or_default())
    }
}

const ATTESTATION_FIELDS: &str = "    id\n    personId\n    orgId\n    markers\n    openUntil\n    state\n    parkingReason\n    doneDocuments\n    parkedDocuments\n    processingDocuments\n    totalDocuments\n    tokensCost\n    tokensPaid\n    tokensOwed\n    buyTokensUrl\n    acceptTycUrl\n    lastDocDate\n    emailAdminAccessUrlTo\n    adminAccessUrl\n    createdAt\n    __typename\n";

#[derive(Debug, Deserialize)]
struct GraphqlResponse<D> {
    data: Option<D>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

impl<D> GraphqlResponse<D> {
    /// Applies the data-or-error rule: any reported error fails the call,
    /// and a response with neither data nor errors is invalid.
    fn into_data(self) -> Result<D> {
        if let Some(errors) = &self.errors {
            if !errors.is_empty() {
                let joined = errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                return Err(ConstataError::Graphql(joined));
            }
        }
        self.data
            .ok_or_else(|| ConstataError::InvalidResponse("no errors nor data".into()))
    }
}

#[derive(Debug, Deserialize)]
struct AttestationsResponse {
    #[serde(rename = "allAttestations")]
    all_attestations: Option<Vec<Attestation>>,
}

#[derive(Debug, Deserialize)]
struct AttestationResponse {
    #[serde(rename = "Attestation")]
    attestation: Option<Attestation>,
}

#[derive(Debug, Deserialize)]
struct CreateAttestationResponse {
    #[serde(rename = "createAttestation")]
    create_attestation: Option<Attestation>,
}

#[derive(Debug, Deserialize)]
struct AttestationHtmlExportResponse {
    #[serde(rename = "AttestationHtmlExport")]
    attestation_html_export: Option<AttestationHtmlExport>,
}

#[derive(Debug, Deserialize)]
struct UpdateWebCallbacksUrlResponse {
    #[serde(rename = "updateWebCallbacksUrl")]
    update_web_callbacks_url: Option<AccountState>,
}

#[derive(Debug, Deserialize)]
struct WebCallbacksResponse {
    #[serde(rename = "allWebCallbacks")]
    all_web_callbacks: Option<Vec<WebCallback>>,
}

#[derive(Debug, Deserialize)]
struct WebCallbackAttemptsResponse {
    #[serde(rename = "allWebCallbackAttempts")]
    all_web_callback_attempts: Option<Vec<WebCallbackAttempt>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::SignedPayload;
    use crate::request::hex_digest;
    use crate::signer::testutil::{test_signer, TEST_ADDRESS};
    use std::sync::Mutex;

    /// Transport that captures what would go on the wire and answers with a
    /// canned response body.
    struct MockTransport {
        response: String,
        captured: Mutex<Option<(String, String)>>,
    }

    impl MockTransport {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                captured: Mutex::new(None),
            }
        }

        fn captured(&self) -> (String, String) {
            self.captured.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl GraphqlTransport for MockTransport {
        async fn send(&self, body: String, auth_header: String) -> Result<String> {
            *self.captured.lock().unwrap() = Some((body, auth_header));
            Ok(self.response.clone())
        }
    }

    fn test_client(response: &str) -> ApiClient<MockTransport> {
        let endpoint = Url::parse("https://api.constata.eu/graphql").unwrap();
        ApiClient::new(test_signer(), endpoint, MockTransport::new(response))
    }

    #[tokio::test]
    async fn test_query_attaches_signed_header() {
        let client = test_client(r#"{"data":{"ok":true}}"#);
        let _: Value = client
            .query("ping", "query ping { ok }", json!({}))
            .await
            .unwrap();

        let (body, header) = client.transport.captured();
        let envelope: SignedPayload = serde_json::from_str(&header).unwrap();
        assert_eq!(envelope.signer, TEST_ADDRESS);

        let metadata: Value = serde_json::from_slice(&envelope.payload_bytes().unwrap()).unwrap();
        assert_eq!(metadata["path"], "/graphql");
        assert_eq!(metadata["method"], "POST");
        assert_eq!(metadata["body_hash"], hex_digest(&body).as_str());

        let sent: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(sent["operationName"], "ping");
    }

    #[tokio::test]
    async fn test_graphql_errors_fail_the_call() {
        let client = test_client(
            r#"{"data":null,"errors":[{"message":"not authorized"},{"message":"try later"}]}"#,
        );
        let result: Result<Value> = client.query("x", "query x { y }", json!({})).await;
        match result {
            Err(ConstataError::Graphql(message)) => {
                assert_eq!(message, "not authorized\ntry later");
            }
            other => panic!("expected Graphql error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_data_nor_errors_is_invalid() {
        let client = test_client(r#"{}"#);
        let result: Result<Value> = client.query("x", "query x { y }", json!({})).await;
        assert!(matches!(result, Err(ConstataError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_all_attestations_unwraps_list() {
        let client = test_client(
            r#"{"data":{"allAttestations":[{
                "id":1,"personId":1,"orgId":1,"markers":null,"openUntil":null,
                "state":"done","parkingReason":null,"doneDocuments":1,
                "parkedDocuments":0,"processingDocuments":0,"totalDocuments":1,
                "tokensCost":1.0,"tokensPaid":1.0,"tokensOwed":0.0,
                "buyTokensUrl":null,"acceptTycUrl":null,"lastDocDate":null,
                "emailAdminAccessUrlTo":null,"adminAccessUrl":null,
                "createdAt":"2024-05-01T09:00:00Z"
            }]}}"#,
        );
        let attestations = client.all_attestations(0).await.unwrap();
        assert_eq!(attestations.len(), 1);
        assert_eq!(attestations[0].id, 1);
    }

    #[tokio::test]
    async fn test_create_attestation_signs_each_document() {
        let client = test_client(r#"{"data":{"createAttestation":null}}"#);
        // The canned null forces an InvalidResponse after the request was
        // built; what matters here is what went on the wire.
        let result = client
            .create_attestation(&[b"doc one", b"doc two"], &["ops@example.com"], None)
            .await;
        assert!(matches!(result, Err(ConstataError::InvalidResponse(_))));

        let (body, _) = client.transport.captured();
        let sent: Value = serde_json::from_str(&body).unwrap();
        let documents = sent["variables"]["input"]["documents"].as_array().unwrap();
        assert_eq!(documents.len(), 2);
        for document in documents {
            assert_eq!(document["signer"], TEST_ADDRESS);
            assert!(document["signature"].is_string());
        }
        assert_eq!(
            sent["variables"]["input"]["emailAdminAccessUrlTo"][0],
            "ops@example.com"
        );
    }

    #[tokio::test]
    async fn test_update_web_callbacks_url() {
        let client = test_client(
            r#"{"data":{"updateWebCallbacksUrl":{"id":1,"webCallbacksUrl":"https://example.com/cb"}}}"#,
        );
        let url = client
            .update_web_callbacks_url("https://example.com/cb")
            .await
            .unwrap();
        assert_eq!(url.as_deref(), Some("https://example.com/cb"));
    }
}
