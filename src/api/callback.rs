use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::core::{FatooraError, SubmissionState, SubmissionStatus};

/// Inbound status callback from the authority. Both fields are required;
/// payloads missing either are rejected before any state is touched.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackRequest {
    #[serde(rename = "requestID")]
    pub request_id: String,
    pub status: String,
}

impl CallbackRequest {
    /// Validate a raw callback payload.
    pub fn from_json(payload: &Value) -> Result<Self, FatooraError> {
        serde_json::from_value(payload.clone())
            .map_err(|e| FatooraError::Callback(format!("invalid callback payload: {e}")))
    }
}

/// What a callback did to the located document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Reported,
    Cleared,
    Failed,
    /// Status not recognized: payload persisted, no state inferred.
    Recorded,
}

/// Collaborator interface for locating submission state by the compliance
/// request correlation id. The storage itself (database, cache, …) stays
/// outside the crate.
pub trait StateStore {
    fn find_by_request_id(&mut self, request_id: &str) -> Option<&mut SubmissionState>;
}

/// Simple map-backed store, sufficient for tests and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    states: HashMap<String, SubmissionState>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, request_id: impl Into<String>, state: SubmissionState) {
        self.states.insert(request_id.into(), state);
    }

    pub fn get(&self, request_id: &str) -> Option<&SubmissionState> {
        self.states.get(request_id)
    }
}

impl StateStore for InMemoryStateStore {
    fn find_by_request_id(&mut self, request_id: &str) -> Option<&mut SubmissionState> {
        self.states.get_mut(request_id)
    }
}

/// Apply a validated callback to the owning document's state.
///
/// Recognized statuses transition the state machine; anything else is
/// persisted as the latest response payload without inferring a status.
pub fn apply_callback<S: StateStore>(
    store: &mut S,
    request: &CallbackRequest,
    payload: Value,
) -> Result<CallbackOutcome, FatooraError> {
    let state = store.find_by_request_id(&request.request_id).ok_or_else(|| {
        FatooraError::Callback(format!("no document for request id {}", request.request_id))
    })?;

    let outcome = match SubmissionStatus::parse(&request.status) {
        Some(SubmissionStatus::Reported) => {
            state.mark_reported(payload);
            CallbackOutcome::Reported
        }
        Some(SubmissionStatus::Cleared) => {
            state.mark_cleared(payload);
            CallbackOutcome::Cleared
        }
        Some(SubmissionStatus::Failed) => {
            state.mark_failed(payload);
            CallbackOutcome::Failed
        }
        Some(SubmissionStatus::Unsubmitted) | None => {
            state.response = Some(payload);
            CallbackOutcome::Recorded
        }
    };

    tracing::info!(
        request_id = %request.request_id,
        status = %request.status,
        outcome = ?outcome,
        "applied authority callback"
    );

    Ok(outcome)
}
