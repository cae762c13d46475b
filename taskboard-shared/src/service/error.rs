//! Service-level errors

use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// A single rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors returned by the project, task, and account services
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// Entity is missing or soft-deleted
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// Optimistic lock lost: the stored version moved on
    #[error("{entity} {id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        entity: &'static str,
        id: Uuid,
        expected: i32,
        actual: i32,
    },

    /// Input rejected before touching the store
    #[error("validation failed: {} error(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// Unique value already taken
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Email/password pair did not match
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Token was rejected or its account is gone
    #[error("{0}")]
    Unauthenticated(String),

    /// Store could not be reached in time
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Anything else; detail is for logs only
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        ServiceError::NotFound { entity, id }
    }

    pub fn invalid(field: &str, message: &str) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        if err.is_unavailable() {
            return ServiceError::Unavailable(err.to_string());
        }

        match err {
            StoreError::MissingReference(reference) => {
                ServiceError::invalid(reference.field(), "referenced entity does not exist")
            }
            StoreError::Duplicate(field) => ServiceError::AlreadyExists(field.to_string()),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

/// Runs a store call under the operation timeout
pub(crate) async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(ServiceError::from),
        Err(_) => Err(ServiceError::Unavailable(format!(
            "store operation exceeded {}ms",
            timeout.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Reference;

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(
            ServiceError::from(StoreError::Duplicate("email")),
            ServiceError::AlreadyExists("email".to_string())
        );
        assert!(matches!(
            ServiceError::from(StoreError::Unavailable("down".to_string())),
            ServiceError::Unavailable(_)
        ));
        assert!(matches!(
            ServiceError::from(StoreError::Database(sqlx::Error::RowNotFound)),
            ServiceError::Internal(_)
        ));

        let ServiceError::Validation(errors) =
            ServiceError::from(StoreError::MissingReference(Reference::Owner))
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].field, "owner_id");
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let result: Result<(), ServiceError> = bounded(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(ServiceError::Unavailable(_))));
    }
}
