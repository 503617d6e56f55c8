//! Room and matchmaking error types.

use thiserror::Error;

use super::models::RoomId;
use crate::store::StoreError;

/// Matchmaking errors
#[derive(Debug, Error)]
pub enum RoomError {
    /// Player name failed validation; reported to the client as a normal response
    #[error("{0}")]
    InvalidName(String),

    /// Requester may not join the room
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Room does not exist
    #[error("Room {0} not found")]
    NotFound(RoomId),

    /// Seat moved out of turn
    #[error("Not your turn")]
    NotYourTurn,

    /// Malformed request body
    #[error("Invalid request payload")]
    InvalidPayload,

    /// Persistence failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl RoomError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Store errors are sanitized to prevent information disclosure about
    /// the persistence layer, and room IDs are redacted.
    pub fn client_message(&self) -> String {
        match self {
            RoomError::Store(_) => "Internal server error".to_string(),
            RoomError::NotFound(_) => "Room not found".to_string(),
            RoomError::AccessDenied(_) => "You are not allowed to join this room".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the error stems from client input rather than server state
    pub fn is_input_error(&self) -> bool {
        matches!(self, RoomError::InvalidName(_) | RoomError::InvalidPayload)
    }
}

/// Result type for room operations
pub type RoomResult<T> = Result<T, RoomError>;
