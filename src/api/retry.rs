//! Retry with configured backoff for authority HTTP calls.
//!
//! Retries transient failures only: transport errors and 5xx responses.
//! 4xx responses are the authority rejecting the document — retrying the
//! same payload repeats the rejection, so they surface immediately.

use crate::core::RetryPolicy;
use std::time::Duration;

/// Send a request with policy-driven backoff. The closure is called up to
/// `policy.max_attempts` times; the final attempt's outcome is returned
/// as-is for the caller to inspect.
pub(crate) async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 0..attempts.saturating_sub(1) {
        let delay = Duration::from_secs(policy.delay_secs(attempt));
        match f().await {
            Ok(resp) if resp.status().is_server_error() => {
                tracing::warn!(
                    operation,
                    attempt = attempt + 1,
                    status = %resp.status(),
                    "authority returned a server error, retrying in {delay:?}"
                );
            }
            Ok(resp) => return Ok(resp),
            Err(e) => {
                tracing::warn!(
                    operation,
                    attempt = attempt + 1,
                    "authority request failed, retrying in {delay:?}: {e}"
                );
            }
        }
        tokio::time::sleep(delay).await;
    }
    f().await
}
