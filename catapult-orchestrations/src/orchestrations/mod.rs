//! The fling pipeline and the operator cleanup flow

mod cleanup;
mod fling;

pub use fling::FlingOrchestrator;

use std::future::Future;
use std::time::Duration;

/// Bound a step by `after`, turning an elapsed timer into the step's own error
pub(crate) async fn bounded<T, E, Fut>(
    step: &'static str,
    after: Duration,
    future: Fut,
    on_timeout: impl FnOnce(&'static str, Duration) -> E,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(step, after_ms = after.as_millis() as u64, "Step timed out");
            Err(on_timeout(step, after))
        }
    }
}
