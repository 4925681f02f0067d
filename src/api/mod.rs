//! Authority client and submission orchestration.
//!
//! Each document submission is an independent unit of work driven through a
//! strictly sequential pipeline (map → build → sign → encode → submit);
//! nothing here shares mutable state between documents except the batch
//! summary counters. At-most-one-in-flight per document is the job-queue
//! collaborator's contract — the transitions applied here are safe to apply
//! exactly once per attempt.

mod batch;
mod callback;
mod client;
mod retry;
mod service;

pub use batch::{BatchSummary, process_batch};
pub use callback::{CallbackOutcome, CallbackRequest, InMemoryStateStore, StateStore, apply_callback};
pub use client::{AuthorityClient, SubmissionPayload};
pub use service::{Operation, SubmissionService};
