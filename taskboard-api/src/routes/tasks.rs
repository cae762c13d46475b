//! Task endpoints
//!
//! Project listings go through the access gate: members only see tasks
//! assigned to them.

use super::projects::MessageResponse;
use crate::{app::AppState, error::ApiResult, extract::ApiJson};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskboard_shared::{
    auth::{
        authorization::{require_role, require_self_or_privileged, task_scope, PRIVILEGED},
        middleware::AuthContext,
    },
    models::{CreateTask, Task, TaskStatus, UpdateTask},
};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Defaults to `Not Started`
    pub status: Option<TaskStatus>,

    pub due_date: Option<DateTime<Utc>>,

    pub project_id: Uuid,

    pub assignee_id: Option<Uuid>,
}

/// Update task request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    /// Version the caller last read
    #[validate(range(min = 1, message = "Version must be at least 1"))]
    pub version: i32,

    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
}

/// `POST /api/tasks`
///
/// # Errors
///
/// - `404 Not Found`: project or assignee does not exist
pub async fn create_task(
    State(state): State<AppState>,
    _auth: AuthContext,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = state
        .tasks
        .create(CreateTask {
            title: req.title,
            description: req.description.unwrap_or_default(),
            status: req.status.unwrap_or_default(),
            due_date: req.due_date,
            project_id: req.project_id,
            assignee_id: req.assignee_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// `GET /api/tasks/:id`
pub async fn get_task(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.get(id).await?))
}

/// `GET /api/tasks/project/:project_id`, filtered by the caller's role
pub async fn list_project_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state
        .tasks
        .list_for_project(project_id, task_scope(&auth))
        .await?;

    Ok(Json(tasks))
}

/// `GET /api/tasks/assignee/:assignee_id`
///
/// # Errors
///
/// - `403 Forbidden`: a member asking for someone else's tasks
pub async fn list_assignee_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(assignee_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Task>>> {
    require_self_or_privileged(&auth, assignee_id)?;

    Ok(Json(state.tasks.list_by_assignee(assignee_id).await?))
}

/// `PUT /api/tasks/:id`
///
/// # Errors
///
/// - `404 Not Found`: no live task with this id, or unknown assignee
/// - `409 Conflict`: `version` is stale
pub async fn update_task(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let task = state
        .tasks
        .update(
            id,
            req.version,
            UpdateTask {
                title: req.title,
                description: req.description,
                status: req.status,
                due_date: req.due_date,
                assignee_id: req.assignee_id,
            },
        )
        .await?;

    Ok(Json(task))
}

/// `DELETE /api/tasks/:id` (admin, manager)
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    require_role(&auth, PRIVILEGED)?;
    state.tasks.delete(id).await?;

    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}
