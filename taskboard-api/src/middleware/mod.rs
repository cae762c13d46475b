//! Middleware for the API server
//!
//! Authentication lives in `taskboard_shared::auth::middleware`; this module
//! holds what only the HTTP server needs.

pub mod rate_limit;
