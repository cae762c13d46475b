//! Database models and their queries
//!
//! - `user`: accounts and roles
//! - `project`: versioned projects
//! - `task`: versioned tasks and the overdue sweep statements
//!
//! Every table is soft-deleted through `deleted_at`; reads never return
//! deleted rows.

pub mod project;
pub mod task;
pub mod user;

pub use project::{CreateProject, Project, UpdateProject};
pub use task::{CreateTask, Task, TaskStatus, UpdateTask};
pub use user::{CreateUser, Role, User};
