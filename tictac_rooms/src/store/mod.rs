//! Room store: persistence primitives the matchmaker relies on.
//!
//! The one operation that needs cross-request exclusion is picking an
//! available public room. Stores must implement
//! [`RoomStore::find_available_and_reserve`] as a single conditional update
//! so two concurrent callers never receive the same room. Every other write
//! is a compare-and-set on the room's revision.
//!
//! A reservation whose holder never comes back (dropped request, timed out
//! query, restarted process) is reclaimable once it is older than the
//! store's reservation TTL.

pub mod errors;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::time::Duration;

use crate::room::{Room, RoomError, RoomId, RoomResult};
use crate::session::SessionBinding;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryRoomStore;
pub use postgres::PgRoomStore;

/// Reservations older than this are treated as abandoned
pub const DEFAULT_RESERVATION_TTL: Duration = Duration::from_secs(30);

/// What the requester brings to a join-by-id
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessContext {
    /// Room and seat the requester currently holds
    pub binding: Option<SessionBinding>,
}

/// Check whether the requester may take a seat in `room` by its id.
///
/// Only private rooms are joinable by id; a full room or a room the
/// requester already sits in is refused.
pub fn check_join_access(room: &Room, access: &AccessContext) -> RoomResult<()> {
    if !room.is_private() {
        return Err(RoomError::AccessDenied("room is not private".to_string()));
    }

    if room.seats().is_full() {
        return Err(RoomError::AccessDenied("room is full".to_string()));
    }

    if let (Some(binding), Some(room_id)) = (access.binding, room.id())
        && binding.room_id == room_id
    {
        return Err(RoomError::AccessDenied(
            "requester already holds a seat in this room".to_string(),
        ));
    }

    Ok(())
}

/// Trait for room persistence
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Atomically pick one public, non-full room other than `exclude` that
    /// is unreserved or whose reservation outlived the TTL, mark it reserved
    /// and return it.
    async fn find_available_and_reserve(&self, exclude: Option<RoomId>) -> StoreResult<Option<Room>>;

    /// Insert a new room (assigning its id) or replace an existing one.
    ///
    /// Replacement succeeds only if the stored revision still matches
    /// `room.revision()`; otherwise [`StoreError::Conflict`] is returned.
    async fn save(&self, room: &mut Room) -> StoreResult<RoomId>;

    /// Clear the reservation flag of a room.
    async fn release_by_id(&self, room_id: RoomId) -> StoreResult<()>;

    /// Load a room by id.
    async fn find_by_id(&self, room_id: RoomId) -> StoreResult<Option<Room>>;

    /// Check that the backing store answers.
    async fn health_check(&self) -> StoreResult<()>;

    /// Load a room the requester wants to join by id.
    ///
    /// # Errors
    ///
    /// * `RoomError::NotFound` - no room with this id
    /// * `RoomError::AccessDenied` - see [`check_join_access`]
    async fn find_by_id_with_access_check(
        &self,
        room_id: RoomId,
        access: &AccessContext,
    ) -> RoomResult<Room> {
        let room = self
            .find_by_id(room_id)
            .await?
            .ok_or(RoomError::NotFound(room_id))?;
        check_join_access(&room, access)?;
        Ok(room)
    }
}
