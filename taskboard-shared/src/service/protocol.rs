//! Optimistic update protocol
//!
//! ```text
//! expected < 1 ──────────────────────────────→ Validation
//! conditional write (id, expected, live) ─┬─→ Some(row)       → updated
//!                                         └─→ None ─ lookup ┬─→ None        → NotFound
//!                                                           └─→ Some(other) → Conflict
//! ```
//!
//! The write and the version lookup are separate statements. A row deleted between
//! them reads as `NotFound`, which is the correct answer at lookup time.

use super::error::ServiceError;
use std::future::Future;
use uuid::Uuid;

/// Runs a compare-and-swap write and classifies a miss
pub async fn conditional_update<T, W, WFut, P, PFut>(
    entity: &'static str,
    id: Uuid,
    expected: i32,
    write: W,
    current_version: P,
) -> Result<T, ServiceError>
where
    W: FnOnce() -> WFut,
    WFut: Future<Output = Result<Option<T>, ServiceError>>,
    P: FnOnce() -> PFut,
    PFut: Future<Output = Result<Option<i32>, ServiceError>>,
{
    if expected < 1 {
        return Err(ServiceError::invalid("version", "must be at least 1"));
    }

    if let Some(updated) = write().await? {
        return Ok(updated);
    }

    match current_version().await? {
        None => Err(ServiceError::not_found(entity, id)),
        Some(actual) => {
            tracing::debug!(entity, %id, expected, actual, "version conflict");
            Err(ServiceError::Conflict {
                entity,
                id,
                expected,
                actual,
            })
        }
    }
}
