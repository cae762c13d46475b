//! Task service
//!
//! Task writes invalidate `tasks:project:<project_id>`, the only cached task
//! listing. Single tasks and per-assignee lists are always read from the store.

use super::error::{bounded, ServiceError};
use super::protocol::conditional_update;
use crate::auth::authorization::TaskScope;
use crate::cache::{keys, CacheLayer};
use crate::models::{CreateTask, Task, UpdateTask};
use crate::store::Store;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Longest accepted task title
pub const MAX_TITLE_LEN: usize = 255;

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
    cache: CacheLayer,
    ttl: Duration,
    timeout: Duration,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>, cache: CacheLayer, ttl: Duration, timeout: Duration) -> Self {
        Self {
            store,
            cache,
            ttl,
            timeout,
        }
    }

    /// Creates a task at version 1
    ///
    /// # Errors
    ///
    /// `NotFound` when the project or assignee does not exist.
    pub async fn create(&self, mut data: CreateTask) -> Result<Task, ServiceError> {
        data.title = data.title.trim().to_string();
        validate_title(&data.title)?;

        let project_id = data.project_id;
        let assignee_id = data.assignee_id;
        let task = bounded(self.timeout, self.store.create_task(data))
            .await
            .map_err(|err| reference_not_found(err, Some(project_id), assignee_id))?;

        self.cache.invalidate(&[keys::project_tasks(project_id)]).await;

        tracing::info!(task_id = %task.id, project_id = %project_id, "task created");
        Ok(task)
    }

    pub async fn get(&self, id: Uuid) -> Result<Task, ServiceError> {
        bounded(self.timeout, self.store.find_task(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("task", id))
    }

    /// Tasks of a project as seen through `scope`
    ///
    /// The unfiltered list is read through `tasks:project:<id>`; a scoped list
    /// comes straight from the store so one caller's view is never cached
    /// under another's key.
    pub async fn list_for_project(
        &self,
        project_id: Uuid,
        scope: TaskScope,
    ) -> Result<Vec<Task>, ServiceError> {
        match scope {
            TaskScope::All => {
                self.cache
                    .get_or_load(&keys::project_tasks(project_id), self.ttl, || {
                        bounded(self.timeout, self.store.list_tasks_by_project(project_id))
                    })
                    .await
            }
            TaskScope::AssignedTo(assignee_id) => {
                bounded(
                    self.timeout,
                    self.store
                        .list_tasks_by_project_and_assignee(project_id, assignee_id),
                )
                .await
            }
        }
    }

    pub async fn list_by_assignee(&self, assignee_id: Uuid) -> Result<Vec<Task>, ServiceError> {
        bounded(self.timeout, self.store.list_tasks_by_assignee(assignee_id)).await
    }

    /// Conditional update against the store alone, no cache side effects
    pub async fn update_in_store(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: UpdateTask,
    ) -> Result<Task, ServiceError> {
        let patch = patch.normalized();
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }

        conditional_update(
            "task",
            id,
            expected_version,
            || bounded(self.timeout, self.store.update_task(id, expected_version, &patch)),
            || bounded(self.timeout, self.store.task_version(id)),
        )
        .await
        .map_err(|err| reference_not_found(err, None, patch.assignee_id))
    }

    /// Optimistic update followed by invalidation of the project's task list
    pub async fn update(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: UpdateTask,
    ) -> Result<Task, ServiceError> {
        let task = self.update_in_store(id, expected_version, patch).await?;
        self.cache
            .invalidate(&[keys::project_tasks(task.project_id)])
            .await;

        tracing::info!(task_id = %id, version = task.version, "task updated");
        Ok(task)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let project_id = bounded(self.timeout, self.store.delete_task(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("task", id))?;
        self.cache.invalidate(&[keys::project_tasks(project_id)]).await;

        tracing::info!(task_id = %id, project_id = %project_id, "task deleted");
        Ok(())
    }

    /// Marks every past-due open task `Overdue`
    pub async fn sweep(&self) -> Result<u64, ServiceError> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweep against an explicit clock
    ///
    /// The project ids are collected before the bulk write, so a task that
    /// becomes eligible in between is flipped without its list being
    /// invalidated; that list catches up when its TTL lapses. Nothing is
    /// invalidated if the write fails.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        let project_ids = bounded(self.timeout, self.store.overdue_project_ids(now)).await?;
        let affected = bounded(self.timeout, self.store.mark_overdue(now)).await?;

        let keys: Vec<String> = project_ids.iter().copied().map(keys::project_tasks).collect();
        self.cache.invalidate(&keys).await;

        tracing::info!(
            affected,
            projects = project_ids.len(),
            "overdue sweep complete"
        );
        Ok(affected)
    }
}

fn validate_title(title: &str) -> Result<(), ServiceError> {
    if title.trim().is_empty() {
        return Err(ServiceError::invalid("title", "must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::invalid("title", "must be at most 255 characters"));
    }
    Ok(())
}

/// Turns a foreign key rejection into `NotFound` for the entity the caller named
fn reference_not_found(
    err: ServiceError,
    project_id: Option<Uuid>,
    assignee_id: Option<Uuid>,
) -> ServiceError {
    let errors = match err {
        ServiceError::Validation(errors) => errors,
        other => return other,
    };
    let field = errors.first().map(|e| e.field.clone());

    match (field.as_deref(), project_id, assignee_id) {
        (Some("project_id"), Some(id), _) => ServiceError::not_found("project", id),
        (Some("assignee_id"), _, Some(id)) => ServiceError::not_found("user", id),
        _ => ServiceError::Validation(errors),
    }
}
