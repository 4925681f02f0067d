use thiserror::Error;

/// Errors that can occur while preparing or submitting a document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FatooraError {
    /// Source data could not be projected into the canonical shape.
    #[error("mapping failed: {0}")]
    Mapping(String),

    /// A required identity field (e.g. the document number) is missing.
    #[error("incomplete document: {0}")]
    IncompleteDocument(String),

    /// A credit note has no resolvable original-invoice reference.
    #[error("missing original invoice reference: {0}")]
    MissingReference(String),

    /// The configured classification strategy could not be evaluated.
    #[error("classification failed: {0}")]
    Classification(String),

    /// XML generation error.
    #[error("XML error: {0}")]
    Xml(String),

    /// TLV/QR payload encoding error.
    #[error("QR encoding failed: {0}")]
    Qr(String),

    /// Key or certificate material is missing or malformed. Never retried
    /// blindly: the same material fails the same way.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A certificate could not be parsed or carries no serial number.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Network or HTTP failure talking to the authority. Retryable.
    #[error("submission failed: {0}")]
    Submission(String),

    /// An inbound status callback was malformed or unmatched.
    #[error("invalid callback: {0}")]
    Callback(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FatooraError {
    /// Whether the surrounding job mechanism may retry the failed attempt.
    ///
    /// Only transport-level submission failures qualify; data and signing
    /// errors repeat identically on retry and must surface immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Submission(_))
    }
}
