use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::retry::send_with_retry;
use crate::core::{EndpointConfig, FatooraConfig, FatooraError, RetryPolicy};
use crate::sign::CertificateManager;

/// Wire payload for the reporting and clearance endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    /// SHA-256 content hash of the signed XML, base64.
    pub invoice_hash: String,
    /// Submission UUID of this attempt.
    pub uuid: String,
    /// Base64-encoded signed XML.
    pub invoice: String,
    /// `"CreditNote"` for credit notes, omitted otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
}

/// HTTP client for the authority's four endpoints (compliance, reporting,
/// clearance, status), authenticated with Basic auth built from the
/// certificate id and the shared secret.
#[derive(Debug)]
pub struct AuthorityClient {
    http: reqwest::Client,
    endpoints: EndpointConfig,
    auth_header: String,
    retry: RetryPolicy,
}

impl AuthorityClient {
    pub fn new(config: &FatooraConfig, certs: &CertificateManager) -> Result<Self, FatooraError> {
        let (certificate_id, secret) = if config.is_sandbox() {
            (
                config.sandbox.certificate_id.clone().unwrap_or_default(),
                config.sandbox.pih.clone(),
            )
        } else {
            let data = certs.certificate_data()?;
            (data.certificate_id, config.pih.clone())
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FatooraError::Submission(e.to_string()))?;

        tracing::info!(
            environment = ?config.environment,
            base_url = %config.endpoints().base_url,
            "authority client initialized"
        );

        Ok(Self {
            http,
            endpoints: config.endpoints().clone(),
            auth_header: format!("Basic {}", BASE64.encode(format!("{certificate_id}:{secret}"))),
            retry: config.retry.clone(),
        })
    }

    /// Submit to the reporting endpoint.
    pub async fn report(&self, payload: &SubmissionPayload) -> Result<Value, FatooraError> {
        self.post_json(&self.endpoints.reporting_endpoint(), "report", payload)
            .await
    }

    /// Submit to the clearance endpoint.
    pub async fn clear(&self, payload: &SubmissionPayload) -> Result<Value, FatooraError> {
        self.post_json(&self.endpoints.clearance_endpoint(), "clear", payload)
            .await
    }

    /// Query the status of a previous submission. Read-only.
    pub async fn check_status(&self, uuid: &str) -> Result<Value, FatooraError> {
        let url = self.endpoints.status_endpoint();
        let response = send_with_retry(&self.retry, "check_status", || {
            self.http
                .get(&url)
                .header("Accept", "application/json")
                .header("Authorization", &self.auth_header)
                .query(&[("uuid", uuid)])
                .send()
        })
        .await
        .map_err(|e| FatooraError::Submission(e.to_string()))?;

        Self::read_json(response).await
    }

    /// Submit a CSR to the compliance endpoint during onboarding.
    pub async fn compliance_check(&self, csr_pem: &str) -> Result<Value, FatooraError> {
        let body = serde_json::json!({ "csr": BASE64.encode(csr_pem) });
        self.post_json(&self.endpoints.compliance_endpoint(), "compliance_check", &body)
            .await
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        operation: &str,
        payload: &T,
    ) -> Result<Value, FatooraError> {
        let response = send_with_retry(&self.retry, operation, || {
            self.http
                .post(url)
                .header("Accept", "application/json")
                .header("Content-Type", "application/json")
                .header("Authorization", &self.auth_header)
                .json(payload)
                .send()
        })
        .await
        .map_err(|e| FatooraError::Submission(e.to_string()))?;

        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, FatooraError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FatooraError::Submission(e.to_string()))?;

        if !status.is_success() {
            return Err(FatooraError::Submission(format!("HTTP {status}: {body}")));
        }

        serde_json::from_str(&body)
            .map_err(|e| FatooraError::Submission(format!("invalid response body: {e}")))
    }
}
