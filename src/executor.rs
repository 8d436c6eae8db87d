//! Concurrent fan-out/fan-in of one wave of sub-requests.
//!
//! Every request becomes its own tokio task. Tasks report through a channel
//! sized to the wave, and the caller performs exactly one receive per request.
//! A semaphore caps how many tasks talk to the provider at once. The first
//! error wins: it is returned as-is, the wave's other results are discarded,
//! and a cancellation token tells still-running siblings to stop.
//!
//! Completion order is arbitrary. Callers that need submission order carry an
//! index in their result type and sort afterwards.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Run `task` on every request concurrently and collect all results.
///
/// * `max_concurrency` - upper bound on tasks running `task` at the same time
/// * `parent` - cancelling it aborts the wave with [`Error::Cancelled`]
///
/// Returns results in completion order, or the first error observed.
pub async fn execute<T, R, F, Fut>(
    requests: Vec<T>,
    max_concurrency: usize,
    parent: &CancellationToken,
    task: F,
) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let total = requests.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let cancel = parent.child_token();
    // Siblings are told to stop whenever this function returns.
    let _cancel_on_return = cancel.clone().drop_guard();

    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let task = Arc::new(task);
    let (tx, mut rx) = mpsc::channel::<Result<R>>(total);

    let mut handles = Vec::with_capacity(total);
    for request in requests {
        let tx = tx.clone();
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        let task = Arc::clone(&task);

        handles.push(tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => Err(Error::Cancelled),
                result = async {
                    match semaphore.acquire().await {
                        Ok(_permit) => task(request).await,
                        Err(_) => Err(Error::Cancelled),
                    }
                } => result,
            };
            // The receiver is gone if the wave already failed.
            let _ = tx.send(result).await;
        }));
    }
    drop(tx);

    let mut responses = Vec::with_capacity(total);
    for received in 0..total {
        match rx.recv().await {
            Some(Ok(response)) => responses.push(response),
            Some(Err(e)) => {
                warn!(
                    "[Executor] Request failed after {}/{} responses, cancelling wave: {}",
                    received, total, e
                );
                return Err(e);
            }
            None => {
                // Every sender is gone but results are missing: a task died.
                for handle in handles {
                    handle.await?;
                }
                return Err(Error::Cancelled);
            }
        }
    }

    debug!(
        "[Executor] Completed {} requests in {:.2}s (max concurrent: {})",
        total,
        start.elapsed().as_secs_f64(),
        max_concurrency
    );

    Ok(responses)
}
