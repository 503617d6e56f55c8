//! Store error types.

use std::time::Duration;
use thiserror::Error;

use crate::room::RoomId;

/// Persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query did not finish in time
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Conditional update lost against a concurrent writer
    #[error("Room {0} was modified concurrently")]
    Conflict(RoomId),

    /// Background store task did not complete
    #[error("Store task interrupted: {0}")]
    Interrupted(String),

    /// Persisted row violates room invariants
    #[error("Room {room_id:?} has invalid persisted state: {reason}")]
    Corrupt {
        room_id: Option<RoomId>,
        reason: String,
    },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
