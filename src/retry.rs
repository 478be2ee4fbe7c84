use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ClusterError;

/// A sleeper is consulted with the 1-based attempt count after each
/// unfinished attempt. `Some(pause)` sleeps and retries, `None` gives up.
pub trait RetrySleeper: FnMut(u32) -> Option<Duration> {}
impl<F: FnMut(u32) -> Option<Duration>> RetrySleeper for F {}

/// Drive `worker` until it finishes, fails, or the sleeper gives up.
///
/// The worker reports `Ok(Some(value))` when done and `Ok(None)` when the
/// attempt should be retried. A worker error terminates the loop
/// immediately; sleeper exhaustion yields [`ClusterError::Exhausted`].
pub async fn retry_loop<T, W, Fut, S>(mut worker: W, mut sleeper: S) -> Result<T, ClusterError>
where
    W: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ClusterError>>,
    S: RetrySleeper,
{
    let mut attempts: u32 = 1;
    loop {
        if let Some(value) = worker().await? {
            return Ok(value);
        }

        match sleeper(attempts) {
            Some(pause) => {
                debug!("retry: attempt {} unfinished, sleeping {:?}", attempts, pause);
                tokio::time::sleep(pause).await;
            }
            None => {
                return Err(ClusterError::Exhausted {
                    attempts,
                    last: None,
                })
            }
        }

        attempts += 1;
    }
}

/// Like [`retry_loop`], but worker errors that are transient remote
/// failures are logged and retried instead of terminating the loop. The
/// exhaustion error then carries the last such failure.
pub async fn retry_loop_transient<T, W, Fut, S>(
    mut worker: W,
    mut sleeper: S,
) -> Result<T, ClusterError>
where
    W: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ClusterError>>,
    S: RetrySleeper,
{
    let mut attempts: u32 = 1;
    let mut last: Option<ClusterError> = None;
    loop {
        match worker().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) if e.is_transient_remote() => {
                warn!("retry: attempt {} failed: {}", attempts, e);
                last = Some(e);
            }
            Err(e) => return Err(e),
        }

        match sleeper(attempts) {
            Some(pause) => {
                debug!("retry: attempt {} unfinished, sleeping {:?}", attempts, pause);
                tokio::time::sleep(pause).await;
            }
            None => {
                return Err(ClusterError::Exhausted {
                    attempts,
                    last: last.map(Box::new),
                })
            }
        }

        attempts += 1;
    }
}

/// Fixed pause between attempts, bounded by `max_attempts`.
pub fn fixed(max_attempts: u32, sleep_secs: u64) -> impl FnMut(u32) -> Option<Duration> {
    move |attempt| (attempt <= max_attempts).then(|| Duration::from_secs(sleep_secs))
}

/// Linearly growing pause (`step`, `2*step`, `3*step`, ...), bounded by
/// `max_attempts`.
pub fn linear_backoff(max_attempts: u32, step_secs: u64) -> impl FnMut(u32) -> Option<Duration> {
    move |attempt| {
        (attempt <= max_attempts).then(|| Duration::from_secs(step_secs * u64::from(attempt)))
    }
}

/// Linear back-off with a ceiling on the pause, for loops that may poll for
/// hours (e.g. waiting for a whole cluster to come up).
pub fn capped_linear_backoff(
    max_attempts: u32,
    step_secs: u64,
    cap_secs: u64,
) -> impl FnMut(u32) -> Option<Duration> {
    move |attempt| {
        (attempt <= max_attempts)
            .then(|| Duration::from_secs((step_secs * u64::from(attempt)).min(cap_secs)))
    }
}
