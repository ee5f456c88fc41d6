//! Fire-and-forget execution of slow downstream actions.
//!
//! [`TaskLauncher::launch`] spawns immediately and never blocks the caller.
//! Each spawned task waits for one of a fixed number of permits before doing
//! any work, so at most `max_concurrent` actions execute at once while the
//! queue of waiting tasks is unbounded. Failures are logged with the task name
//! and then dropped: there is no retry and no return channel.

use crate::Result;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error};

#[derive(Default)]
struct TaskStats {
    in_flight: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
    idle: Notify,
}

/// Decrements the in-flight count even if the task panics.
struct InFlightGuard(Arc<TaskStats>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Bounded launcher for detached actions. Cheap to clone.
#[derive(Clone)]
pub struct TaskLauncher {
    permits: Arc<Semaphore>,
    stats: Arc<TaskStats>,
}

impl TaskLauncher {
    /// Create a launcher allowing `max_concurrent` actions to run at once.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            stats: Arc::new(TaskStats::default()),
        }
    }

    /// Spawn `task` in the background. Must be called from within a Tokio runtime.
    pub fn launch<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.stats.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(self.stats.clone());
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let stats = guard.0.clone();
            // The semaphore is never closed.
            let _permit = permits.acquire_owned().await.ok();
            debug!("Detached task {} started", name);

            match task.await {
                Ok(()) => {
                    stats.completed.fetch_add(1, Ordering::SeqCst);
                    debug!("Detached task {} finished", name);
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::SeqCst);
                    error!(task = name, error = %e, "Detached task failed");
                }
            }
            drop(guard);
        });
    }

    /// Tasks launched but not yet finished (queued or running).
    pub fn in_flight(&self) -> usize {
        self.stats.in_flight.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u64 {
        self.stats.completed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.stats.failed.load(Ordering::SeqCst)
    }

    /// Wait until no launched task is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let idle = self.stats.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            idle.await;
        }
    }
}

impl Default for TaskLauncher {
    fn default() -> Self {
        Self::new(crate::config::TaskConfig::MAX_DETACHED_TASKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WarezError;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn launcher_should_panic() -> bool {
        true
    }

    #[tokio::test]
    async fn test_launch_does_not_block() {
        let launcher = TaskLauncher::new(4);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        launcher.launch("blocked", async move {
            let _ = release_rx.await;
            Ok(())
        });
        assert_eq!(launcher.in_flight(), 1);

        release_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), launcher.wait_idle())
            .await
            .unwrap();
        assert_eq!(launcher.completed(), 1);
        assert_eq!(launcher.failed(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_counted_and_swallowed() {
        let launcher = TaskLauncher::new(2);
        launcher.launch("doomed", async { Err(WarezError::Other("boom".into())) });
        launcher.launch("fine", async { Ok(()) });

        tokio::time::timeout(Duration::from_secs(5), launcher.wait_idle())
            .await
            .unwrap();
        assert_eq!(launcher.failed(), 1);
        assert_eq!(launcher.completed(), 1);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let launcher = TaskLauncher::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = running.clone();
            let peak = peak.clone();
            launcher.launch("bounded", async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            });
        }
        // All six are accepted immediately even though only two may run.
        assert_eq!(launcher.in_flight(), 6);

        tokio::time::timeout(Duration::from_secs(5), launcher.wait_idle())
            .await
            .unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(launcher.completed(), 6);
    }

    #[tokio::test]
    async fn test_panicking_task_leaves_launcher_idle() {
        let launcher = TaskLauncher::new(1);
        launcher.launch("panics", async {
            if launcher_should_panic() {
                panic!("detached panic");
            }
            Ok(())
        });
        tokio::time::timeout(Duration::from_secs(5), launcher.wait_idle())
            .await
            .unwrap();
        assert_eq!(launcher.in_flight(), 0);
    }
}
