//! API route handlers, one module per resource
//!
//! - `health`: liveness and dependency status
//! - `auth`: registration, login, token refresh, profile, user list
//! - `projects`: project CRUD with optimistic updates
//! - `tasks`: task CRUD, role-filtered listings

pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
