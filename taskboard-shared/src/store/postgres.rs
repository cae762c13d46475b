//! PostgreSQL-backed store
//!
//! A thin adapter from the store traits onto the model queries, translating
//! constraint violations into [`StoreError`] variants.

use super::{ProjectStore, Reference, Store, StoreError, TaskStore, UserStore};
use crate::db::{self, pool::health_check};
use crate::models::{
    CreateProject, CreateTask, CreateUser, Project, Task, UpdateProject, UpdateTask, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Store over a Postgres connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a foreign key violation on `tasks` to the column it concerns
fn task_reference(err: sqlx::Error) -> StoreError {
    if db::is_foreign_key_violation(&err) {
        let on_assignee = match &err {
            sqlx::Error::Database(db_err) => db_err
                .constraint()
                .is_some_and(|constraint| constraint.contains("assignee")),
            _ => false,
        };
        let reference = if on_assignee {
            Reference::Assignee
        } else {
            Reference::Project
        };
        return StoreError::MissingReference(reference);
    }
    StoreError::Database(err)
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        User::create(&self.pool, data).await.map_err(|err| {
            if db::is_unique_violation(&err) {
                StoreError::Duplicate("email")
            } else {
                StoreError::Database(err)
            }
        })
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(User::list(&self.pool).await?)
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn create_project(&self, data: CreateProject) -> Result<Project, StoreError> {
        Project::create(&self.pool, data).await.map_err(|err| {
            if db::is_foreign_key_violation(&err) {
                StoreError::MissingReference(Reference::Owner)
            } else {
                StoreError::Database(err)
            }
        })
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn list_projects(&self, limit: i64, offset: i64) -> Result<Vec<Project>, StoreError> {
        Ok(Project::list(&self.pool, limit, offset).await?)
    }

    async fn count_projects(&self) -> Result<i64, StoreError> {
        Ok(Project::count(&self.pool).await?)
    }

    async fn update_project(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: &UpdateProject,
    ) -> Result<Option<Project>, StoreError> {
        Ok(Project::update_versioned(&self.pool, id, expected_version, patch).await?)
    }

    async fn project_version(&self, id: Uuid) -> Result<Option<i32>, StoreError> {
        Ok(Project::current_version(&self.pool, id).await?)
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Project::soft_delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        Task::create(&self.pool, data).await.map_err(task_reference)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks_by_project(&self, project_id: Uuid) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list_by_project(&self.pool, project_id).await?)
    }

    async fn list_tasks_by_project_and_assignee(
        &self,
        project_id: Uuid,
        assignee_id: Uuid,
    ) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list_by_project_and_assignee(&self.pool, project_id, assignee_id).await?)
    }

    async fn list_tasks_by_assignee(&self, assignee_id: Uuid) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list_by_assignee(&self.pool, assignee_id).await?)
    }

    async fn update_task(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: &UpdateTask,
    ) -> Result<Option<Task>, StoreError> {
        Task::update_versioned(&self.pool, id, expected_version, patch)
            .await
            .map_err(task_reference)
    }

    async fn task_version(&self, id: Uuid) -> Result<Option<i32>, StoreError> {
        Ok(Task::current_version(&self.pool, id).await?)
    }

    async fn delete_task(&self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(Task::soft_delete(&self.pool, id).await?)
    }

    async fn overdue_project_ids(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError> {
        Ok(Task::overdue_project_ids(&self.pool, now).await?)
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(Task::mark_overdue(&self.pool, now).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(health_check(&self.pool).await?)
    }
}
