//! # Taskboard API Server Library
//!
//! HTTP surface over the services in `taskboard_shared`.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `error`: error handling and HTTP response mapping
//! - `extract`: JSON body extractor with API-shaped rejections
//! - `middleware`: rate limiting
//! - `routes`: API route handlers

pub mod app;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
