//! Project service
//!
//! `update_in_store` is the bare optimistic update; `update` decorates it with
//! invalidation of `project:<id>`.

use super::error::{bounded, ServiceError};
use super::protocol::conditional_update;
use crate::cache::{keys, CacheLayer};
use crate::models::{CreateProject, Project, UpdateProject};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Longest accepted project name
pub const MAX_NAME_LEN: usize = 255;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// One page of projects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPage {
    pub data: Vec<Project>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn Store>,
    cache: CacheLayer,
    ttl: Duration,
    timeout: Duration,
}

impl ProjectService {
    pub fn new(store: Arc<dyn Store>, cache: CacheLayer, ttl: Duration, timeout: Duration) -> Self {
        Self {
            store,
            cache,
            ttl,
            timeout,
        }
    }

    /// Creates a project owned by `owner_id`; the cache is left cold
    pub async fn create(
        &self,
        owner_id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<Project, ServiceError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::invalid("name", "must not be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ServiceError::invalid("name", "must be at most 255 characters"));
        }

        let project = bounded(
            self.timeout,
            self.store.create_project(CreateProject {
                name,
                description: description.unwrap_or_default(),
                owner_id,
            }),
        )
        .await?;

        tracing::info!(project_id = %project.id, owner_id = %owner_id, "project created");
        Ok(project)
    }

    /// Read-through fetch of `project:<id>`
    pub async fn get(&self, id: Uuid) -> Result<Project, ServiceError> {
        self.cache
            .get_or_load(&keys::project(id), self.ttl, || async move {
                bounded(self.timeout, self.store.find_project(id))
                    .await?
                    .ok_or_else(|| ServiceError::not_found("project", id))
            })
            .await
    }

    /// Newest first, `page` from 1, `page_size` clamped to `1..=100`
    pub async fn list(&self, page: i64, page_size: i64) -> Result<ProjectPage, ServiceError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(page_size);

        let data = bounded(self.timeout, self.store.list_projects(page_size, offset)).await?;
        let total = bounded(self.timeout, self.store.count_projects()).await?;

        Ok(ProjectPage {
            data,
            page,
            page_size,
            total,
        })
    }

    /// Conditional update against the store alone, no cache side effects
    pub async fn update_in_store(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: UpdateProject,
    ) -> Result<Project, ServiceError> {
        let patch = patch.normalized();
        if patch.name.as_ref().is_some_and(|name| name.chars().count() > MAX_NAME_LEN) {
            return Err(ServiceError::invalid("name", "must be at most 255 characters"));
        }

        conditional_update(
            "project",
            id,
            expected_version,
            || bounded(self.timeout, self.store.update_project(id, expected_version, &patch)),
            || bounded(self.timeout, self.store.project_version(id)),
        )
        .await
    }

    /// Optimistic update followed by invalidation of the cached snapshot
    pub async fn update(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: UpdateProject,
    ) -> Result<Project, ServiceError> {
        let project = self.update_in_store(id, expected_version, patch).await?;
        self.cache.invalidate(&[keys::project(id)]).await;

        tracing::info!(project_id = %id, version = project.version, "project updated");
        Ok(project)
    }

    /// Soft-deletes a project and drops its cached snapshot
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        if !bounded(self.timeout, self.store.delete_project(id)).await? {
            return Err(ServiceError::not_found("project", id));
        }
        self.cache.invalidate(&[keys::project(id)]).await;

        tracing::info!(project_id = %id, "project deleted");
        Ok(())
    }
}
