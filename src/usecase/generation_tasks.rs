//! Tracking of spawned generation tasks.
//!
//! Generation calls run on independent tasks so they never stall the
//! coordinator, but each task is spawned with a tracked handle rather
//! than detached: shutdown drains the tracker with a bounded grace
//! period and aborts stragglers, so no generation work outlives the
//! process.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Registry of in-flight generation tasks.
pub struct GenerationTasks {
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl GenerationTasks {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Spawn a tracked task. Finished handles are pruned on each spawn
    /// so the registry stays proportional to in-flight work.
    pub async fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|handle| !handle.is_finished());
        tasks.push(tokio::spawn(future));
    }

    /// Number of tasks that have not finished yet.
    pub async fn in_flight(&self) -> usize {
        let tasks = self.tasks.lock().await;
        tasks.iter().filter(|handle| !handle.is_finished()).count()
    }

    /// Wait up to `grace` for in-flight tasks to finish, then abort the
    /// rest. Called once at shutdown.
    pub async fn shutdown(&self, grace: Duration) {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().await;
            tasks.drain(..).collect()
        };

        let deadline = Instant::now() + grace;
        for mut handle in handles {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if tokio::time::timeout(remaining, &mut handle).await.is_err() {
                tracing::warn!("generation task did not finish within grace period, aborting");
                handle.abort();
            }
        }
    }
}

impl Default for GenerationTasks {
    fn default() -> Self {
        Self::new()
    }
}
