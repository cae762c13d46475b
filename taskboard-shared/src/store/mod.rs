//! Persistent store abstraction
//!
//! Services talk to storage through these traits so that the update protocol
//! and the overdue sweep run unchanged against Postgres ([`postgres::PgStore`])
//! or the in-memory [`memory::MemoryStore`] used by tests.
//!
//! Every read ignores soft-deleted rows. Conditional updates return `None` when
//! no live row matches `(id, version)`; the matching `*_version` lookup lets the
//! caller tell a missing row from a stale version.

pub mod memory;
pub mod postgres;

use crate::models::{
    CreateProject, CreateTask, CreateUser, Project, Task, UpdateProject, UpdateTask, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Foreign key a write depended on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// `projects.owner_id`
    Owner,

    /// `tasks.project_id`
    Project,

    /// `tasks.assignee_id`
    Assignee,
}

impl Reference {
    pub fn field(&self) -> &'static str {
        match self {
            Reference::Owner => "owner_id",
            Reference::Project => "project_id",
            Reference::Assignee => "assignee_id",
        }
    }
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A referenced row does not exist
    #[error("referenced {} does not exist", .0.field())]
    MissingReference(Reference),

    /// A unique constraint rejected the write
    #[error("duplicate value for {0}")]
    Duplicate(&'static str),

    /// Backend cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// True for connectivity failures rather than rejected statements
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Database(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Case-insensitive email lookup
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(&self, data: CreateProject) -> Result<Project, StoreError>;

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;

    /// Newest first
    async fn list_projects(&self, limit: i64, offset: i64) -> Result<Vec<Project>, StoreError>;

    async fn count_projects(&self) -> Result<i64, StoreError>;

    /// Applies `patch` and bumps the version iff the live row is at `expected_version`
    async fn update_project(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: &UpdateProject,
    ) -> Result<Option<Project>, StoreError>;

    async fn project_version(&self, id: Uuid) -> Result<Option<i32>, StoreError>;

    /// Returns false when there was no live row to delete
    async fn delete_project(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn list_tasks_by_project(&self, project_id: Uuid) -> Result<Vec<Task>, StoreError>;

    async fn list_tasks_by_project_and_assignee(
        &self,
        project_id: Uuid,
        assignee_id: Uuid,
    ) -> Result<Vec<Task>, StoreError>;

    async fn list_tasks_by_assignee(&self, assignee_id: Uuid) -> Result<Vec<Task>, StoreError>;

    /// Applies `patch` and bumps the version iff the live row is at `expected_version`
    async fn update_task(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: &UpdateTask,
    ) -> Result<Option<Task>, StoreError>;

    async fn task_version(&self, id: Uuid) -> Result<Option<i32>, StoreError>;

    /// Soft-deletes and returns the owning project, `None` if nothing was deleted
    async fn delete_task(&self, id: Uuid) -> Result<Option<Uuid>, StoreError>;

    /// Distinct projects with tasks eligible for the overdue transition at `now`
    async fn overdue_project_ids(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError>;

    /// Single conditional bulk write; returns the number of tasks flipped
    async fn mark_overdue(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Everything the services need from storage
#[async_trait]
pub trait Store: UserStore + ProjectStore + TaskStore {
    /// Cheap liveness check for health checks
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(StoreError::Unavailable("down".to_string()).is_unavailable());
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_unavailable());
        assert!(!StoreError::Duplicate("email").is_unavailable());
    }

    #[test]
    fn test_missing_reference_message() {
        let err = StoreError::MissingReference(Reference::Assignee);
        assert_eq!(err.to_string(), "referenced assignee_id does not exist");
    }
}
