//! Closable work queue and fixed-size worker pools
//!
//! The queue is filled once and its sender dropped, so `next()` returns
//! `None` exactly when every item has been handed out. There is no
//! "check empty, then pop" window: taking an item is a single receive.
//!
//! `run_worker_pool` joins every worker before returning, which is the
//! barrier between pipeline phases.

use deckstat_common::{Error, PipelinePhase, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

/// Multi-consumer queue over a closed unbounded channel
pub struct WorkQueue<T> {
    receiver: Mutex<mpsc::UnboundedReceiver<T>>,
    len: usize,
}

impl<T> WorkQueue<T> {
    /// Fill the queue and close it
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut len = 0;
        for item in items {
            // The receiver is alive, so send cannot fail
            if sender.send(item).is_ok() {
                len += 1;
            }
        }
        drop(sender);

        Self {
            receiver: Mutex::new(receiver),
            len,
        }
    }

    /// Next item, or `None` once drained
    pub async fn next(&self) -> Option<T> {
        self.receiver.lock().await.recv().await
    }

    /// Items originally queued
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Drain `queue` with exactly `workers` concurrent tasks
///
/// **Algorithm:**
/// 1. Spawn `workers` tasks into a `JoinSet`; each loops on `queue.next()`
/// 2. A handler error stops its worker and raises the halt flag; the others
///    finish their current item and stop taking new ones
/// 3. Join every task (barrier), then return the processed count or the
///    first error
///
/// A panicked worker is reported as `Error::Internal`.
pub async fn run_worker_pool<T, H, Fut>(
    phase: PipelinePhase,
    workers: usize,
    queue: Arc<WorkQueue<T>>,
    handler: H,
) -> Result<usize>
where
    T: Send + 'static,
    H: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let handler = Arc::new(handler);
    let halted = Arc::new(AtomicBool::new(false));
    let processed = Arc::new(AtomicUsize::new(0));
    let mut tasks = JoinSet::new();

    tracing::debug!(phase = phase.label(), workers, items = queue.len(), "Starting worker pool");

    for worker_id in 0..workers.max(1) {
        let queue = Arc::clone(&queue);
        let handler = Arc::clone(&handler);
        let halted = Arc::clone(&halted);
        let processed = Arc::clone(&processed);

        tasks.spawn(async move {
            while !halted.load(Ordering::Acquire) {
                let Some(item) = queue.next().await else {
                    break;
                };
                if let Err(e) = (*handler)(item).await {
                    tracing::error!(phase = phase.label(), worker_id, error = %e, "Worker stopped");
                    halted.store(true, Ordering::Release);
                    return Err(e);
                }
                processed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(result) => result,
            Err(e) => Err(Error::Internal(format!("{} worker failed: {}", phase.label(), e))),
        };
        if let Err(e) = outcome {
            halted.store(true, Ordering::Release);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(processed.load(Ordering::Relaxed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::sync::Mutex as StdMutex;

    #[tokio::test]
    async fn test_queue_drains_then_returns_none() {
        let queue = WorkQueue::from_items(vec![1, 2, 3]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.next().await, Some(1));
        assert_eq!(queue.next().await, Some(2));
        assert_eq!(queue.next().await, Some(3));
        assert_eq!(queue.next().await, None);
        assert_eq!(queue.next().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_processes_every_item_once() {
        let queue = Arc::new(WorkQueue::from_items(0..200u32));
        let seen = Arc::new(StdMutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let processed = run_worker_pool(PipelinePhase::Collecting, 8, queue, move |item| {
            let sink = Arc::clone(&sink);
            async move {
                tokio::task::yield_now().await;
                sink.lock().unwrap().push(item);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert_eq!(processed, 200);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 200);
        let distinct: BTreeSet<_> = seen.iter().copied().collect();
        assert_eq!(distinct.len(), 200);
    }

    #[tokio::test]
    async fn test_pool_on_empty_queue() {
        let queue = Arc::new(WorkQueue::<u32>::from_items(Vec::new()));
        let processed = run_worker_pool(PipelinePhase::BaseReports, 4, queue, |_| async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(processed, 0);
    }

    #[tokio::test]
    async fn test_pool_returns_first_error_and_stops() {
        let queue = Arc::new(WorkQueue::from_items(0..100u32));
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let result = run_worker_pool(PipelinePhase::Collecting, 1, queue, move |item| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if item == 5 {
                    Err(Error::storage(
                        PathBuf::from("/store"),
                        std::io::Error::new(std::io::ErrorKind::Other, "disk gone"),
                    ))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Storage { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }
}
