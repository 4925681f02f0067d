use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FatooraError;
use super::resolve::resolve;

/// A source record as handed to the library: an opaque data tree plus an
/// optional runtime kind tag (the model/collection name the record came
/// from), which only the `model` classification strategy consults.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    /// Runtime kind identity, e.g. `"CreditNote"`.
    pub kind: Option<String>,
    /// The record's data, accessed read-only through the field resolver.
    pub data: Value,
}

impl SourceRecord {
    pub fn new(data: Value) -> Self {
        Self { kind: None, data }
    }

    pub fn with_kind(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: Some(kind.into()),
            data,
        }
    }
}

impl From<Value> for SourceRecord {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

/// How a record is determined to be a credit note. Selected once by static
/// configuration; evaluation is pure and deterministic per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ClassifierStrategy {
    /// Compare a field on the record against a sentinel value.
    TypeField { field: String, value: String },
    /// Compare the record's runtime kind tag against a credit-note kind.
    #[serde(rename = "model")]
    ModelKind { kind: String },
    /// Classification by backing table. Requires load context the classifier
    /// does not have — evaluating it is an error, never a silent `false`.
    #[serde(rename = "table")]
    TableOrigin,
}

impl Default for ClassifierStrategy {
    fn default() -> Self {
        Self::TypeField {
            field: "type".into(),
            value: "credit_note".into(),
        }
    }
}

impl ClassifierStrategy {
    /// Classify a record as credit note (`true`) or standard document.
    pub fn classify(&self, record: &SourceRecord) -> Result<bool, FatooraError> {
        match self {
            Self::TypeField { field, value } => Ok(resolve(&record.data, field)
                .and_then(Value::as_str)
                .is_some_and(|v| v == value)),
            Self::ModelKind { kind } => Ok(record.kind.as_deref() == Some(kind.as_str())),
            Self::TableOrigin => Err(FatooraError::Classification(
                "table-origin classification requires load context that is not available; \
                 configure the type_field or model strategy instead"
                    .into(),
            )),
        }
    }
}
