//! Session binding: which room and seat a client joined last.
//!
//! The binding is read on the next join to find the client's prior room,
//! and overwritten once the new join succeeds. The storage medium is behind
//! the [`SessionBinder`] trait; PostgreSQL and in-memory implementations are
//! provided.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};
use uuid::Uuid;

use crate::room::{RoomId, Seat};
use crate::store::StoreResult;

pub use memory::MemorySessionBinder;
pub use postgres::PgSessionBinder;

/// Bindings expire one day after they were last written
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24);

/// Opaque per-client session key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientSession(Uuid);

impl ClientSession {
    /// Mint a fresh session key
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ClientSession {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

/// Room and seat a client currently occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBinding {
    pub room_id: RoomId,
    pub player_number: Seat,
}

/// Trait for session binding storage
#[async_trait]
pub trait SessionBinder: Send + Sync {
    /// Current binding for the session, if any and not expired
    async fn binding(&self, session: ClientSession) -> StoreResult<Option<SessionBinding>>;

    /// Create or overwrite the binding for the session
    async fn bind(&self, session: ClientSession, binding: SessionBinding) -> StoreResult<()>;

    /// Delete expired bindings, returning how many were removed
    async fn purge_expired(&self) -> StoreResult<u64>;
}
