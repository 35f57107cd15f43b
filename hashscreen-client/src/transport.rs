//! Transport towards the screening server.
//!
//! The orchestrator only depends on the [`EvalTransport`] trait; the
//! shipped implementation is [`HttpTransport`] over `reqwest`. Tests swap in
//! in-process transports, including dishonest ones.

use async_trait::async_trait;
use hashscreen_core::envelope::Envelope;
use hashscreen_core::manifest::DbManifest;
use hashscreen_types::api::v1::{ImageEvalResponse, TextScanOutcome, TextScanRequest};
use hashscreen_types::{
    KeyCommitment, DATABASE_MANIFEST_PATH, DATABASE_PATH, KEY_COMMITMENT_PATH,
};

/// Errors raised while talking to the server.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("server returned status {0}")]
    Status(u16),
    /// The request failed at the HTTP layer.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// The two protocol requests the orchestrator needs from a transport.
///
/// Implementations return the envelope untouched; opening and verification
/// stay with the orchestrator so a dishonest transport cannot skip them.
#[async_trait]
pub trait EvalTransport: Send + Sync {
    /// Submits a blinded point for evaluation.
    async fn evaluate(
        &self,
        blinded_hex: &str,
    ) -> Result<Envelope<ImageEvalResponse>, TransportError>;

    /// Submits a text for keyword scanning.
    async fn scan_text(&self, text: &str) -> Result<Envelope<TextScanOutcome>, TransportError>;
}

/// HTTP transport against a running screening service.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport for the service at `base_url`
    /// (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetches the published key commitment.
    pub async fn fetch_commitment(&self) -> Result<KeyCommitment, TransportError> {
        let response = self
            .client
            .get(format!("{}{KEY_COMMITMENT_PATH}", self.base_url))
            .send()
            .await?;
        Ok(check(response)?.json().await?)
    }

    /// Fetches the evaluated-hash database bytes and its manifest.
    ///
    /// The bytes are returned exactly as served; manifest verification
    /// hashes them unmodified.
    pub async fn fetch_database(&self) -> Result<(Vec<u8>, DbManifest), TransportError> {
        let db = self
            .client
            .get(format!("{}{DATABASE_PATH}", self.base_url))
            .send()
            .await?;
        let db_bytes = check(db)?.bytes().await?.to_vec();
        let manifest = self
            .client
            .get(format!("{}{DATABASE_MANIFEST_PATH}", self.base_url))
            .send()
            .await?;
        let manifest = check(manifest)?.json().await?;
        Ok((db_bytes, manifest))
    }
}

#[async_trait]
impl EvalTransport for HttpTransport {
    async fn evaluate(
        &self,
        blinded_hex: &str,
    ) -> Result<Envelope<ImageEvalResponse>, TransportError> {
        let form = reqwest::multipart::Form::new().text("blindedPoint", blinded_hex.to_owned());
        let response = self
            .client
            .post(format!("{}/api/scan/image", self.base_url))
            .multipart(form)
            .send()
            .await?;
        Ok(check(response)?.json().await?)
    }

    async fn scan_text(&self, text: &str) -> Result<Envelope<TextScanOutcome>, TransportError> {
        let response = self
            .client
            .post(format!("{}/api/scan", self.base_url))
            .json(&TextScanRequest {
                text: text.to_owned(),
            })
            .send()
            .await?;
        Ok(check(response)?.json().await?)
    }
}

fn check(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(TransportError::Status(response.status().as_u16()))
    }
}
