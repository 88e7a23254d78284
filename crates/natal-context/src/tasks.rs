use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Fire-and-forget work that callers never await, bounded in concurrency.
///
/// Process exit should go through [`BackgroundTasks::drain`] so pending
/// summaries and compactions get a chance to land.
#[derive(Clone)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    runtime: Option<Handle>,
}

impl BackgroundTasks {
    /// Captures the current tokio runtime, if any, for later spawns
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Schedule `task` on the calling runtime, falling back to the one seen
    /// at construction. Without either the task is dropped unrun and `false`
    /// is returned.
    pub fn spawn<F>(&self, label: &'static str, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(handle) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            warn!(task = label, "no tokio runtime, background task skipped");
            return false;
        };

        let permits = Arc::clone(&self.permits);
        self.tracker.spawn_on(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                debug!(task = label, "background task started");
                task.await;
                debug!(task = label, "background task finished");
            },
            &handle,
        );
        true
    }

    /// Tasks spawned and not yet finished
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait up to `timeout` for every pending task. Returns `false` on timeout.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let finished = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        self.tracker.reopen();
        if !finished {
            warn!(
                pending = self.tracker.len(),
                "background tasks still running after drain timeout"
            );
        }
        finished
    }
}
