use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use super::client::{AuthorityClient, SubmissionPayload};
use crate::core::{
    FatooraConfig, FatooraError, SourceRecord, SubmissionState, map_document,
};
use crate::qr::generate_qr;
use crate::sign::CertificateManager;
use crate::xml::to_ubl_xml;

/// Which authority operation a submission targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Report,
    Clear,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Report => write!(f, "report"),
            Self::Clear => write!(f, "clear"),
        }
    }
}

/// Drives the full submission pipeline for one document at a time:
/// canonicalize → build XML → sign → encode QR → submit → apply the
/// resulting state transition.
pub struct SubmissionService {
    config: Arc<FatooraConfig>,
    certs: CertificateManager,
    client: AuthorityClient,
}

impl SubmissionService {
    pub fn new(config: FatooraConfig) -> Result<Self, FatooraError> {
        let config = Arc::new(config);
        let certs = CertificateManager::new(&config);
        let client = AuthorityClient::new(&config, &certs)?;
        Ok(Self {
            config,
            certs,
            client,
        })
    }

    pub fn config(&self) -> &FatooraConfig {
        &self.config
    }

    /// Collaborator query: is this record a credit note under the configured
    /// classification strategy?
    pub fn is_credit_note(&self, record: &SourceRecord) -> Result<bool, FatooraError> {
        self.config.credit_note.identification.classify(record)
    }

    /// Report a document to the authority.
    pub async fn report(
        &self,
        record: &SourceRecord,
        state: &mut SubmissionState,
    ) -> Result<Value, FatooraError> {
        self.process(Operation::Report, record, state).await
    }

    /// Request clearance for a document from the authority.
    pub async fn clear(
        &self,
        record: &SourceRecord,
        state: &mut SubmissionState,
    ) -> Result<Value, FatooraError> {
        self.process(Operation::Clear, record, state).await
    }

    /// Run the pipeline for the given operation. On any failure the state is
    /// marked FAILED with the error payload attached and the error is
    /// returned — nothing is swallowed mid-pipeline.
    pub async fn process(
        &self,
        operation: Operation,
        record: &SourceRecord,
        state: &mut SubmissionState,
    ) -> Result<Value, FatooraError> {
        match self.run_pipeline(operation, record, state).await {
            Ok(response) => Ok(response),
            Err(e) => {
                state.mark_failed(json!({ "error": e.to_string() }));
                tracing::error!(operation = %operation, error = %e, "submission failed");
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        operation: Operation,
        record: &SourceRecord,
        state: &mut SubmissionState,
    ) -> Result<Value, FatooraError> {
        let mut doc = map_document(record, &self.config)?;

        // A fresh UUID per attempt, retries included. Whether the authority
        // expects the UUID to be reused on retry is unconfirmed; confirm
        // before changing this.
        let uuid = Uuid::new_v4().to_string();
        doc.uuid = Some(uuid.clone());

        let document_kind = if doc.is_credit_note { "credit_note" } else { "invoice" };
        tracing::info!(
            operation = %operation,
            document = %doc.number,
            document_type = document_kind,
            "processing submission"
        );

        let xml = to_ubl_xml(&doc)?;
        let signed = self.certs.sign_xml(&xml)?;
        let hash = BASE64.encode(Sha256::digest(signed.xml.as_bytes()));
        let qr_code = generate_qr(&doc, Some(&hash), Some(&signed.signature_value))?;

        // Artifacts are persisted on the state before submission so a failed
        // network call still leaves the signed document inspectable.
        state.uuid = Some(uuid.clone());
        state.hash = Some(hash.clone());
        state.qr_code = Some(qr_code);
        state.signed_xml = Some(signed.xml.clone());

        let payload = SubmissionPayload {
            invoice_hash: hash,
            uuid,
            invoice: BASE64.encode(signed.xml.as_bytes()),
            document_type: doc.is_credit_note.then(|| "CreditNote".to_string()),
        };

        let response = match operation {
            Operation::Report => self.client.report(&payload).await?,
            Operation::Clear => self.client.clear(&payload).await?,
        };

        let accepted = match operation {
            Operation::Report => {
                response.get("reportingStatus").and_then(Value::as_str) == Some("SUBMITTED")
            }
            Operation::Clear => {
                response.get("clearanceStatus").and_then(Value::as_str) == Some("CLEARED")
            }
        };

        if accepted {
            match operation {
                Operation::Report => state.mark_reported(response.clone()),
                Operation::Clear => state.mark_cleared(response.clone()),
            }
            tracing::info!(
                operation = %operation,
                document = %doc.number,
                document_type = document_kind,
                "submission accepted"
            );
            Ok(response)
        } else {
            state.mark_failed(response.clone());
            Err(FatooraError::Submission(format!(
                "{document_kind} {operation} rejected: {response}"
            )))
        }
    }

    /// Query the authority for the status of a previous submission. The raw
    /// payload is returned without mutating state — reconciliation (e.g.
    /// against a callback) is the caller's responsibility.
    pub async fn check_status(&self, state: &SubmissionState) -> Result<Value, FatooraError> {
        let uuid = state.uuid.as_deref().ok_or_else(|| {
            FatooraError::Submission("document has no submission UUID yet".into())
        })?;
        self.client.check_status(uuid).await
    }

    /// Submit the stored CSR for a compliance check during onboarding.
    pub async fn compliance_check(&self, csr_pem: &str) -> Result<Value, FatooraError> {
        self.client.compliance_check(csr_pem).await
    }

    pub fn certificates(&self) -> &CertificateManager {
        &self.certs
    }
}
