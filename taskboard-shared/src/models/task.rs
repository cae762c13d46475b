//! Task model and database operations
//!
//! Tasks belong to a project, may be assigned to a user, and carry the same
//! `version` compare-and-swap column as projects.
//!
//! # Status
//!
//! ```text
//! Not Started → In Progress → Completed
//!      └──────────┴──(due_date passed, swept)──→ Overdue
//! ```
//!
//! Any status may also be set directly through an update.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE task_status AS ENUM ('Not Started', 'In Progress', 'Completed', 'Overdue');
//!
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     title VARCHAR(255) NOT NULL,
//!     description TEXT NOT NULL DEFAULT '',
//!     status task_status NOT NULL DEFAULT 'Not Started',
//!     due_date TIMESTAMPTZ,
//!     project_id UUID NOT NULL REFERENCES projects(id),
//!     assignee_id UUID REFERENCES users(id),
//!     version INTEGER NOT NULL DEFAULT 1,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     deleted_at TIMESTAMPTZ
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task status
///
/// Serialized with the human-readable labels used on the wire and in the
/// `task_status` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    #[default]
    #[sqlx(rename = "Not Started")]
    #[serde(rename = "Not Started")]
    NotStarted,

    #[sqlx(rename = "In Progress")]
    #[serde(rename = "In Progress")]
    InProgress,

    #[sqlx(rename = "Completed")]
    #[serde(rename = "Completed")]
    Completed,

    #[sqlx(rename = "Overdue")]
    #[serde(rename = "Overdue")]
    Overdue,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Overdue => "Overdue",
        }
    }

    /// Whether the overdue sweep may move a task out of this status
    pub fn is_sweepable(&self) -> bool {
        !matches!(self, TaskStatus::Completed | TaskStatus::Overdue)
    }
}

/// Task row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    pub project_id: Uuid,

    /// Omitted from JSON when unassigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Uuid>,

    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// True when the sweep would flip this task at `now`
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.status.is_sweepable() && self.due_date.is_some_and(|due| due < now)
    }
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Uuid,
    pub assignee_id: Option<Uuid>,
}

/// Sparse patch for a task
///
/// `None` leaves a column untouched; an assignee can be changed but not
/// removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
}

impl UpdateTask {
    /// Trims the title and drops empty string fields
    pub fn normalized(self) -> Self {
        Self {
            title: self
                .title
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            description: self.description.filter(|s| !s.is_empty()),
            ..self
        }
    }

    /// Applies the patch to an in-memory copy
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(assignee_id) = self.assignee_id {
            task.assignee_id = Some(assignee_id);
        }
    }
}

const TASK_COLUMNS: &str = "id, title, description, status, due_date, project_id, assignee_id, \
                            version, created_at, updated_at";

impl Task {
    /// Inserts a new task at version 1
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation when the project or assignee does
    /// not exist.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, status, due_date, project_id, assignee_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.due_date)
        .bind(data.project_id)
        .bind(data.assignee_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Every live task of a project, oldest first
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE project_id = $1 AND deleted_at IS NULL
            ORDER BY created_at, id
            "#
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Live tasks of a project assigned to one user
    pub async fn list_by_project_and_assignee(
        pool: &PgPool,
        project_id: Uuid,
        assignee_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE project_id = $1 AND assignee_id = $2 AND deleted_at IS NULL
            ORDER BY created_at, id
            "#
        ))
        .bind(project_id)
        .bind(assignee_id)
        .fetch_all(pool)
        .await
    }

    /// Live tasks assigned to one user across all projects
    pub async fn list_by_assignee(pool: &PgPool, assignee_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE assignee_id = $1 AND deleted_at IS NULL
            ORDER BY created_at, id
            "#
        ))
        .bind(assignee_id)
        .fetch_all(pool)
        .await
    }

    /// Conditional update keyed on `(id, version)`
    ///
    /// Returns `None` when no live row matches. See [`Task::current_version`].
    pub async fn update_versioned(
        pool: &PgPool,
        id: Uuid,
        expected_version: i32,
        patch: &UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET version = version + 1, updated_at = NOW()");
        let mut bind_count = 2;

        if patch.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if patch.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if patch.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if patch.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if patch.assignee_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", assignee_id = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND version = $2 AND deleted_at IS NULL RETURNING {TASK_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(expected_version);

        if let Some(title) = &patch.title {
            q = q.bind(title);
        }
        if let Some(description) = &patch.description {
            q = q.bind(description);
        }
        if let Some(status) = patch.status {
            q = q.bind(status);
        }
        if let Some(due_date) = patch.due_date {
            q = q.bind(due_date);
        }
        if let Some(assignee_id) = patch.assignee_id {
            q = q.bind(assignee_id);
        }

        q.fetch_optional(pool).await
    }

    /// Version of a live task, `None` if missing or soft-deleted
    pub async fn current_version(pool: &PgPool, id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT version FROM tasks WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Marks a task deleted and returns the project it belonged to
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            UPDATE tasks SET deleted_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING project_id
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Distinct projects owning at least one task the sweep would flip at `now`
    pub async fn overdue_project_ids(
        pool: &PgPool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT DISTINCT project_id
            FROM tasks
            WHERE due_date < $1
              AND status NOT IN ('Completed', 'Overdue')
              AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await
    }

    /// Flips every eligible task to `Overdue` in one statement
    ///
    /// The predicate is evaluated at write time, so a concurrent update that
    /// completes a task first wins. Flipped rows get a new version so clients
    /// holding the old one see a conflict instead of silently reverting.
    pub async fn mark_overdue(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'Overdue', version = version + 1, updated_at = NOW()
            WHERE due_date < $1
              AND status NOT IN ('Completed', 'Overdue')
              AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(status: TaskStatus, due_date: Option<DateTime<Utc>>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "Write release notes".to_string(),
            description: String::new(),
            status,
            due_date,
            project_id: Uuid::new_v4(),
            assignee_id: None,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_wire_labels() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::NotStarted).unwrap(),
            "\"Not Started\""
        );
        assert_eq!(
            serde_json::from_str::<TaskStatus>("\"In Progress\"").unwrap(),
            TaskStatus::InProgress
        );
        assert!(serde_json::from_str::<TaskStatus>("\"in_progress\"").is_err());
    }

    #[test]
    fn test_unassigned_task_omits_assignee() {
        let task = sample(TaskStatus::NotStarted, None);
        let json = serde_json::to_value(&task).unwrap();

        assert!(json.get("assignee_id").is_none());
        assert!(json.get("due_date").is_none());

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_is_overdue_at() {
        let now = Utc::now();
        let past = Some(now - Duration::hours(1));

        assert!(sample(TaskStatus::InProgress, past).is_overdue_at(now));
        assert!(sample(TaskStatus::NotStarted, past).is_overdue_at(now));
        assert!(!sample(TaskStatus::Completed, past).is_overdue_at(now));
        assert!(!sample(TaskStatus::Overdue, past).is_overdue_at(now));
        assert!(!sample(TaskStatus::InProgress, None).is_overdue_at(now));
        assert!(!sample(TaskStatus::InProgress, Some(now)).is_overdue_at(now));
    }

    #[test]
    fn test_patch_keeps_non_string_fields() {
        let assignee = Uuid::new_v4();
        let patch = UpdateTask {
            title: Some(String::new()),
            status: Some(TaskStatus::Completed),
            assignee_id: Some(assignee),
            ..Default::default()
        }
        .normalized();

        assert_eq!(patch.title, None);
        assert_eq!(patch.status, Some(TaskStatus::Completed));
        assert_eq!(patch.assignee_id, Some(assignee));
    }

    #[test]
    fn test_patch_trims_title() {
        let patch = UpdateTask {
            title: Some("  Ship it \n".to_string()),
            description: Some(" keep padding ".to_string()),
            ..Default::default()
        }
        .normalized();

        assert_eq!(patch.title.as_deref(), Some("Ship it"));
        assert_eq!(patch.description.as_deref(), Some(" keep padding "));
    }
}
