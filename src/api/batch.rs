use futures_util::future::join_all;

use super::service::{Operation, SubmissionService};
use crate::core::{SourceRecord, SubmissionState};

/// Aggregate result of a batched submission run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Submit a set of documents in fixed-size groups.
///
/// Every document is dispatched independently within its group; an
/// individual failure marks that document FAILED and never aborts the rest
/// of the batch. Documents share no mutable state — only the summary
/// counters aggregate across them.
pub async fn process_batch(
    service: &SubmissionService,
    documents: &mut [(SourceRecord, SubmissionState)],
    operation: Operation,
    batch_size: usize,
) -> BatchSummary {
    let batch_size = batch_size.max(1);
    let total = documents.len();
    tracing::info!(
        operation = %operation,
        documents = total,
        batch_size,
        "starting batch processing"
    );

    let mut summary = BatchSummary::default();
    for group in documents.chunks_mut(batch_size) {
        let results = join_all(group.iter_mut().map(|(record, state)| {
            let record = &*record;
            async move { service.process(operation, record, state).await }
        }))
        .await;

        for result in results {
            summary.attempted += 1;
            match result {
                Ok(_) => summary.succeeded += 1,
                Err(_) => summary.failed += 1,
            }
        }
    }

    tracing::info!(
        operation = %operation,
        attempted = summary.attempted,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "batch processing complete"
    );
    summary
}
