//! # Taskboard Worker Library
//!
//! Background jobs that run beside the API server.
//!
//! ## Modules
//!
//! - `scheduler`: periodic overdue sweep

pub mod scheduler;
