//! In-memory room store.
//!
//! All rooms live behind one async mutex, so reserve-and-return happens
//! while no other caller can observe the room.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::{sync::Mutex, time::Instant};

use super::{DEFAULT_RESERVATION_TTL, RoomStore, StoreError, StoreResult};
use crate::room::{Room, RoomId};

#[derive(Default)]
struct Rooms {
    by_id: BTreeMap<RoomId, Room>,
    reserved_at: HashMap<RoomId, Instant>,
    next_id: RoomId,
}

/// Room store held in process memory
pub struct MemoryRoomStore {
    rooms: Mutex<Rooms>,
    reservation_ttl: Duration,
}

impl Default for MemoryRoomStore {
    fn default() -> Self {
        Self {
            rooms: Mutex::new(Rooms::default()),
            reservation_ttl: DEFAULT_RESERVATION_TTL,
        }
    }
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reservation_ttl(mut self, reservation_ttl: Duration) -> Self {
        self.reservation_ttl = reservation_ttl;
        self
    }

    /// Snapshot of every stored room, ordered by id
    pub async fn all_rooms(&self) -> Vec<Room> {
        self.rooms.lock().await.by_id.values().cloned().collect()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.by_id.len()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn find_available_and_reserve(&self, exclude: Option<RoomId>) -> StoreResult<Option<Room>> {
        let mut rooms = self.rooms.lock().await;
        let Rooms {
            by_id, reserved_at, ..
        } = &mut *rooms;

        let now = Instant::now();
        let abandoned = |room_id: RoomId, room: &Room| {
            room.is_blocked()
                && !room.is_private()
                && !room.seats().is_full()
                && reserved_at
                    .get(&room_id)
                    .is_none_or(|at| now.duration_since(*at) >= self.reservation_ttl)
        };

        let candidate = by_id
            .iter_mut()
            .filter(|(room_id, _)| Some(**room_id) != exclude)
            .find(|(room_id, room)| room.is_available() || abandoned(**room_id, &**room));

        let Some((&room_id, room)) = candidate else {
            return Ok(None);
        };

        if room.is_blocked() {
            log::warn!("Reclaiming abandoned reservation of room {}", room_id);
            room.clear_reservation();
        }
        if room.reserve().is_err() {
            return Ok(None);
        }

        let reserved = room.clone();
        reserved_at.insert(room_id, now);
        Ok(Some(reserved))
    }

    async fn save(&self, room: &mut Room) -> StoreResult<RoomId> {
        let mut rooms = self.rooms.lock().await;

        let Some(room_id) = room.id() else {
            rooms.next_id += 1;
            let room_id = rooms.next_id;
            room.assign_id(room_id);
            room.set_revision(1);
            rooms.by_id.insert(room_id, room.clone());
            return Ok(room_id);
        };

        let stored = rooms
            .by_id
            .get_mut(&room_id)
            .ok_or(StoreError::Conflict(room_id))?;
        if stored.revision() != room.revision() {
            return Err(StoreError::Conflict(room_id));
        }

        room.set_revision(room.revision() + 1);
        *stored = room.clone();
        if !room.is_blocked() {
            rooms.reserved_at.remove(&room_id);
        }
        Ok(room_id)
    }

    async fn release_by_id(&self, room_id: RoomId) -> StoreResult<()> {
        let mut rooms = self.rooms.lock().await;
        if let Some(room) = rooms.by_id.get_mut(&room_id) {
            room.clear_reservation();
        }
        rooms.reserved_at.remove(&room_id);
        Ok(())
    }

    async fn find_by_id(&self, room_id: RoomId) -> StoreResult<Option<Room>> {
        Ok(self.rooms.lock().await.by_id.get(&room_id).cloned())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
