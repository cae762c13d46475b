//! Periodic overdue sweep
//!
//! Runs [`TaskService::sweep`] once at startup and then every `interval`
//! until the shutdown token is cancelled. A failed sweep is logged and
//! retried on the next tick; ticks missed while a sweep runs long are not
//! replayed in a burst.
//!
//! # Example
//!
//! ```no_run
//! # use std::time::Duration;
//! # use taskboard_shared::service::TaskService;
//! # use taskboard_worker::scheduler::SweepScheduler;
//! # async fn example(tasks: TaskService) {
//! let scheduler = SweepScheduler::new(tasks, Duration::from_secs(600));
//! let shutdown = scheduler.shutdown_token();
//!
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     shutdown.cancel();
//! });
//!
//! scheduler.run().await;
//! # }
//! ```

use std::time::Duration;
use taskboard_shared::service::TaskService;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct SweepScheduler {
    tasks: TaskService,

    /// Time between sweep starts
    interval: Duration,

    shutdown_token: CancellationToken,
}

impl SweepScheduler {
    pub fn new(tasks: TaskService, interval: Duration) -> Self {
        Self {
            tasks,
            interval,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops [`run`](Self::run) after the current sweep
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Sweeps on every tick until shutdown
    pub async fn run(&self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "sweep scheduler starting");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    break;
                }
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }

        tracing::info!("sweep scheduler shut down");
    }

    /// One sweep; returns the number of tasks marked overdue, or `None` on failure
    pub async fn run_once(&self) -> Option<u64> {
        match self.tasks.sweep().await {
            Ok(affected) => Some(affected),
            Err(e) => {
                tracing::error!(error = %e, "overdue sweep failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use taskboard_shared::cache::{CacheLayer, MemoryCache};
    use taskboard_shared::models::{CreateProject, CreateTask, CreateUser, Role, Task, TaskStatus};
    use taskboard_shared::store::{MemoryStore, ProjectStore, TaskStore, UserStore};

    const INTERVAL: Duration = Duration::from_secs(60);

    fn scheduler(store: Arc<MemoryStore>) -> SweepScheduler {
        let tasks = TaskService::new(
            store,
            CacheLayer::new(Arc::new(MemoryCache::new())),
            Duration::from_secs(300),
            Duration::from_secs(5),
        );
        SweepScheduler::new(tasks, INTERVAL)
    }

    async fn late_task(store: &MemoryStore, project_id: uuid::Uuid) -> Task {
        let task = store
            .create_task(CreateTask {
                title: "late".to_string(),
                description: String::new(),
                status: TaskStatus::InProgress,
                due_date: None,
                project_id,
                assignee_id: None,
            })
            .await
            .unwrap();
        store
            .force_task_schedule(
                task.id,
                TaskStatus::InProgress,
                Some(Utc::now() - chrono::Duration::hours(1)),
            )
            .await;
        task
    }

    async fn project(store: &MemoryStore) -> uuid::Uuid {
        let owner = store
            .create_user(CreateUser {
                email: "owner@taskboard.test".to_string(),
                password_hash: "hash".to_string(),
                name: "Owner".to_string(),
                role: Role::Manager,
            })
            .await
            .unwrap();
        store
            .create_project(CreateProject {
                name: "Sweep".to_string(),
                description: String::new(),
                owner_id: owner.id,
            })
            .await
            .unwrap()
            .id
    }

    async fn status_of(store: &MemoryStore, task: &Task) -> TaskStatus {
        store.find_task(task.id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn test_run_once() {
        let store = Arc::new(MemoryStore::new());
        let project_id = project(&store).await;
        late_task(&store, project_id).await;

        let scheduler = scheduler(store.clone());
        assert_eq!(scheduler.run_once().await, Some(1));
        assert_eq!(scheduler.run_once().await, Some(0));
    }

    #[tokio::test]
    async fn test_run_once_reports_failure() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);

        assert_eq!(scheduler(store).run_once().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sweeps_on_start_and_each_interval() {
        let store = Arc::new(MemoryStore::new());
        let project_id = project(&store).await;
        let first = late_task(&store, project_id).await;

        let scheduler = Arc::new(scheduler(store.clone()));
        let shutdown = scheduler.shutdown_token();
        let handle = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.run().await }
        });

        // First tick fires immediately
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(status_of(&store, &first).await, TaskStatus::Overdue);

        let second = late_task(&store, project_id).await;
        assert_eq!(status_of(&store, &second).await, TaskStatus::InProgress);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(status_of(&store, &second).await, TaskStatus::Overdue);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_store_outage() {
        let store = Arc::new(MemoryStore::new());
        let project_id = project(&store).await;
        let task = late_task(&store, project_id).await;
        store.set_unavailable(true);

        let scheduler = Arc::new(scheduler(store.clone()));
        let shutdown = scheduler.shutdown_token();
        let handle = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.run().await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        store.set_unavailable(false);
        assert_eq!(status_of(&store, &task).await, TaskStatus::InProgress);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(status_of(&store, &task).await, TaskStatus::Overdue);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let scheduler = scheduler(Arc::new(MemoryStore::new()));
        scheduler.shutdown_token().cancel();

        tokio::time::timeout(Duration::from_secs(5), scheduler.run())
            .await
            .expect("scheduler should stop once cancelled");
    }
}
