//! Project model and database operations
//!
//! Projects carry a `version` column used as a compare-and-swap token: every
//! successful update bumps it by one, and an update naming a stale version
//! matches no row.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE projects (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     name VARCHAR(255) NOT NULL,
//!     description TEXT NOT NULL DEFAULT '',
//!     owner_id UUID NOT NULL REFERENCES users(id),
//!     version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     deleted_at TIMESTAMPTZ
//! );
//! ```
//!
//! # Example
//!
//! ```no_run
//! use taskboard_shared::models::project::{CreateProject, Project, UpdateProject};
//! use sqlx::PgPool;
//! use uuid::Uuid;
//!
//! # async fn example(pool: PgPool, owner_id: Uuid) -> Result<(), sqlx::Error> {
//! let project = Project::create(&pool, CreateProject {
//!     name: "Website relaunch".to_string(),
//!     description: String::new(),
//!     owner_id,
//! }).await?;
//!
//! let patch = UpdateProject { name: Some("Website v2".to_string()), description: None };
//! let updated = Project::update_versioned(&pool, project.id, project.version, &patch).await?;
//! assert_eq!(updated.map(|p| p.version), Some(2));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Project row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,

    /// Starts at 1, +1 per successful update
    pub version: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
}

/// Sparse patch for a project
///
/// `None` leaves a column untouched. Empty strings are treated as absent, so a
/// field can never be cleared through an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl UpdateProject {
    /// Trims the name and drops empty string fields
    pub fn normalized(self) -> Self {
        Self {
            name: self
                .name
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            description: self.description.filter(|s| !s.is_empty()),
        }
    }

    /// Applies the patch to an in-memory copy
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
    }
}

const PROJECT_COLUMNS: &str = "id, name, description, owner_id, version, created_at, updated_at";

impl Project {
    /// Inserts a new project at version 1
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation if `owner_id` does not exist.
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (name, description, owner_id)
            VALUES ($1, $2, $3)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.description)
        .bind(data.owner_id)
        .fetch_one(pool)
        .await?;

        Ok(project)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Lists live projects, newest first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE deleted_at IS NULL
            ORDER BY created_at DESC, id
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM projects WHERE deleted_at IS NULL")
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    /// Conditional update keyed on `(id, version)`
    ///
    /// Returns `None` when no live row has that id at that version. The caller
    /// tells a missing row from a stale version with [`Project::current_version`].
    pub async fn update_versioned(
        pool: &PgPool,
        id: Uuid,
        expected_version: i32,
        patch: &UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE projects SET version = version + 1, updated_at = NOW()");
        let mut bind_count = 2;

        if patch.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if patch.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND version = $2 AND deleted_at IS NULL RETURNING {PROJECT_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(expected_version);

        if let Some(name) = &patch.name {
            q = q.bind(name);
        }
        if let Some(description) = &patch.description {
            q = q.bind(description);
        }

        q.fetch_optional(pool).await
    }

    /// Version of a live project, `None` if missing or soft-deleted
    pub async fn current_version(pool: &PgPool, id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT version FROM projects WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Marks a project deleted; returns false if it was already gone
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
