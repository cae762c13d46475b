//! Project endpoints
//!
//! Updates are optimistic: the body carries the `version` the caller last
//! read, and a stale version is answered with `409 Conflict`.

use crate::{app::AppState, error::ApiResult, extract::ApiJson};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{
        authorization::{require_role, PRIVILEGED},
        middleware::AuthContext,
    },
    models::{Project, UpdateProject},
    service::ProjectPage,
};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_PAGE_SIZE: i64 = 10;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,

    pub description: Option<String>,
}

/// Update project request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    /// Version the caller last read
    #[validate(range(min = 1, message = "Version must be at least 1"))]
    pub version: i32,

    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,
}

/// Pagination query
#[derive(Debug, Default, Deserialize)]
pub struct ListProjectsQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Confirmation body for deletes
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `POST /api/projects` (admin, manager)
///
/// The caller becomes the owner.
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    require_role(&auth, PRIVILEGED)?;
    req.validate()?;

    let project = state
        .projects
        .create(auth.user_id, req.name, req.description)
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// `GET /api/projects?page=&page_size=`
pub async fn list_projects(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(query): Query<ListProjectsQuery>,
) -> ApiResult<Json<ProjectPage>> {
    let page = state
        .projects
        .list(
            query.page.unwrap_or(DEFAULT_PAGE),
            query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    Ok(Json(page))
}

/// `GET /api/projects/:id`, served from the cache when warm
pub async fn get_project(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.projects.get(id).await?))
}

/// `PUT /api/projects/:id`
///
/// # Errors
///
/// - `404 Not Found`: no live project with this id
/// - `409 Conflict`: `version` is stale
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;

    let project = state
        .projects
        .update(
            id,
            req.version,
            UpdateProject {
                name: req.name,
                description: req.description,
            },
        )
        .await?;

    tracing::debug!(project_id = %id, user_id = %auth.user_id, "project updated via API");
    Ok(Json(project))
}

/// `DELETE /api/projects/:id` (admin, manager)
pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    require_role(&auth, PRIVILEGED)?;
    state.projects.delete(id).await?;

    Ok(Json(MessageResponse {
        message: "Project deleted successfully".to_string(),
    }))
}
