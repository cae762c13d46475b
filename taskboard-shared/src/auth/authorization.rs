//! Role-based access checks
//!
//! # Permission Model
//!
//! | Action                          | admin | manager | member        |
//! |---------------------------------|-------|---------|---------------|
//! | create / delete project         | yes   | yes     | no            |
//! | create task                     | yes   | yes     | yes           |
//! | delete task                     | yes   | yes     | no            |
//! | list a project's tasks          | all   | all     | assigned only |
//! | list tasks of an assignee       | any   | any     | self only     |
//! | read and update                 | yes   | yes     | yes           |
//!
//! Decisions are made per request from the [`AuthContext`]; nothing here
//! touches the store.

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::Role;

/// Roles allowed to create projects and delete projects or tasks
pub const PRIVILEGED: &[Role] = &[Role::Admin, Role::Manager];

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller's role is not in the allowed set
    #[error("Insufficient permissions for role {actual}")]
    InsufficientRole { actual: Role },

    /// Caller may not act on another user's resources
    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// Which of a project's tasks a caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    All,
    AssignedTo(Uuid),
}

/// Requires the caller's role to be one of `allowed`
pub fn require_role(auth: &AuthContext, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&auth.role) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole { actual: auth.role })
    }
}

/// Members see only their own tasks; admins and managers see everything
pub fn task_scope(auth: &AuthContext) -> TaskScope {
    match auth.role {
        Role::Admin | Role::Manager => TaskScope::All,
        Role::Member => TaskScope::AssignedTo(auth.user_id),
    }
}

/// Members may only name themselves; admins and managers anyone
pub fn require_self_or_privileged(auth: &AuthContext, user_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id == user_id || PRIVILEGED.contains(&auth.role) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}
