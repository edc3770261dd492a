use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Runs request-detached work. Outcomes are logged and never reach the
/// request that scheduled them.
#[derive(Clone, Debug, Default)]
pub struct TaskSupervisor {
    tracker: TaskTracker,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F, E>(&self, name: &'static str, correlation_id: String, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.tracker.spawn(async move {
            match task.await {
                Ok(()) => debug!(
                    event_name = "tasks.background.completed",
                    task = name,
                    correlation_id = %correlation_id,
                    "background task completed"
                ),
                Err(error) => warn!(
                    event_name = "tasks.background.failed",
                    task = name,
                    correlation_id = %correlation_id,
                    error = %error,
                    "background task failed"
                ),
            }
        });
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stops accepting work and waits for running tasks. Returns `false` if
    /// tasks were still running when `grace` elapsed.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(grace, self.tracker.wait()).await.is_ok()
    }

    /// Polls until no task is running. Leaves the open/closed state alone, so
    /// it cannot undo a concurrent [`shutdown`](Self::shutdown).
    #[cfg(any(test, feature = "test-support"))]
    pub async fn wait_idle(&self) {
        while !self.tracker.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::TaskSupervisor;

    #[tokio::test]
    async fn failed_tasks_are_contained() {
        let supervisor = TaskSupervisor::new();
        let completed = Arc::new(AtomicUsize::new(0));

        supervisor.spawn("failing", "corr-1".to_owned(), async { Err::<(), _>("boom") });
        let counter = completed.clone();
        supervisor.spawn("succeeding", "corr-2".to_owned(), async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), String>(())
        });

        supervisor.wait_idle().await;

        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(supervisor.in_flight(), 0);
    }

    #[tokio::test]
    async fn shutdown_reports_tasks_outliving_the_grace_period() {
        let supervisor = TaskSupervisor::new();
        supervisor.spawn("slow", "corr-3".to_owned(), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<(), String>(())
        });

        assert_eq!(supervisor.in_flight(), 1);
        assert!(!supervisor.shutdown(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn waiting_for_idle_keeps_a_shut_down_supervisor_closed() {
        let supervisor = TaskSupervisor::new();
        supervisor.spawn("quick", "corr-5".to_owned(), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<(), String>(())
        });

        let (drained, ()) =
            tokio::join!(supervisor.shutdown(Duration::from_secs(5)), supervisor.wait_idle());

        assert!(drained);
        assert!(supervisor.tracker.is_closed());
        assert_eq!(supervisor.in_flight(), 0);
    }

    #[tokio::test]
    async fn shutdown_drains_quick_tasks() {
        let supervisor = TaskSupervisor::new();
        supervisor.spawn("quick", "corr-4".to_owned(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<(), String>(())
        });

        assert!(supervisor.shutdown(Duration::from_secs(5)).await);
    }
}
