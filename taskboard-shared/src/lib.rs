//! # Taskboard Shared Library
//!
//! Types, storage, caching, and business logic used by both the Taskboard API
//! server and the sweep worker.
//!
//! ## Module Organization
//!
//! - `config`: environment-driven configuration
//! - `telemetry`: tracing subscriber setup
//! - `db`: Postgres pool and migrations
//! - `models`: database rows and their queries
//! - `store`: storage traits with Postgres and in-memory implementations
//! - `cache`: Redis and in-memory caches behind a read-through layer
//! - `auth`: passwords, JWTs, request authentication, role checks
//! - `service`: optimistic updates, task sweep, accounts
//! - `seed`: demo accounts

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod seed;
pub mod service;
pub mod store;
pub mod telemetry;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
