//! Authentication and authorization
//!
//! # Modules
//!
//! - [`password`]: Argon2id password hashing and verification
//! - [`jwt`]: access and refresh tokens carrying user id and role
//! - [`middleware`]: bearer token middleware and the [`middleware::AuthContext`] extractor
//! - [`authorization`]: role checks and the task visibility gate

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
