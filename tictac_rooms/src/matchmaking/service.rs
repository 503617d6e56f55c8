//! Matchmaking service: the join flows on top of a room store and a session binder.

use std::sync::Arc;

use super::{
    responses::{DirectSessionResponse, DirectSessionRoom, JoinResponse, PlayerSummary, PrivateRoomResponse},
    validation::{INVITATION_NAME_MESSAGE, NAME_LENGTH_MESSAGE, validate_player_name},
};
use crate::room::{Room, RoomError, RoomId, RoomResult, Seat};
use crate::session::{ClientSession, SessionBinder, SessionBinding};
use crate::store::{AccessContext, RoomStore, StoreError};

/// Default application origin used in invitation links
pub const DEFAULT_APP_DOMAIN: &str = "http://localhost:3000";

/// Matchmaking configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchmakingConfig {
    /// Origin prepended to invitation links
    pub app_domain: String,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            app_domain: DEFAULT_APP_DOMAIN.to_string(),
        }
    }
}

impl MatchmakingConfig {
    /// Invitation link for a private room
    pub fn invitation_url(&self, room_id: RoomId) -> String {
        format!(
            "{}/game/new/friend/{}",
            self.app_domain.trim_end_matches('/'),
            room_id
        )
    }
}

/// Seats clients into rooms
pub struct MatchmakingService {
    rooms: Arc<dyn RoomStore>,
    sessions: Arc<dyn SessionBinder>,
    config: MatchmakingConfig,
}

impl MatchmakingService {
    /// Create a new matchmaking service
    ///
    /// # Arguments
    ///
    /// * `rooms` - Room store
    /// * `sessions` - Session binder
    /// * `config` - Matchmaking configuration
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        sessions: Arc<dyn SessionBinder>,
        config: MatchmakingConfig,
    ) -> Self {
        Self {
            rooms,
            sessions,
            config,
        }
    }

    pub fn rooms(&self) -> &Arc<dyn RoomStore> {
        &self.rooms
    }

    pub fn config(&self) -> &MatchmakingConfig {
        &self.config
    }

    /// Seat the client in any available public room, creating one if none is free.
    ///
    /// # Errors
    ///
    /// * `RoomError::InvalidName` - name fails validation; nothing is touched
    /// * `RoomError::Store` - persistence failure
    pub async fn join_random(&self, session: ClientSession, raw_name: &str) -> RoomResult<JoinResponse> {
        let name = validate_player_name(raw_name, NAME_LENGTH_MESSAGE)?;
        let prior = self.prior_room(session).await?;

        // The placement runs as its own task so a dropped request cannot
        // strand the reservation between reserve and save.
        let rooms = Arc::clone(&self.rooms);
        let placement = tokio::spawn(async move { place_in_public_room(rooms, prior, name).await })
            .await
            .map_err(|e| StoreError::Interrupted(e.to_string()))??;

        self.finish_join(session, prior, placement.room_id, placement.seat)
            .await?;
        log::info!(
            "Session {} joined public room {} at seat {}",
            session,
            placement.room_id,
            placement.seat
        );

        let mut response = JoinResponse::for_seat(placement.room_id, &placement.room, placement.seat);
        response.room_created = placement.created;
        Ok(response)
    }

    /// Create a private room with the client in seat 1 and return its invitation link.
    ///
    /// # Errors
    ///
    /// * `RoomError::InvalidName` - name fails validation
    /// * `RoomError::Store` - persistence failure
    pub async fn create_private(
        &self,
        session: ClientSession,
        raw_name: &str,
    ) -> RoomResult<PrivateRoomResponse> {
        let name = validate_player_name(raw_name, NAME_LENGTH_MESSAGE)?;
        let prior = self.prior_room(session).await?;

        let placement = create_and_seat(self.rooms.as_ref(), true, name).await?;
        let room_id = placement.room_id;
        self.finish_join(session, prior, room_id, placement.seat).await?;
        log::info!("Session {} created private room {}", session, room_id);

        let mut join = JoinResponse::for_seat(room_id, &placement.room, placement.seat);
        join.room_created = true;
        Ok(PrivateRoomResponse {
            join,
            invitation_url: self.config.invitation_url(room_id),
        })
    }

    /// Take the free seat of a private room from an invitation.
    ///
    /// # Errors
    ///
    /// * `RoomError::InvalidName` - name fails validation
    /// * `RoomError::NotFound` - unknown room id
    /// * `RoomError::AccessDenied` - room is public, full, already holds the
    ///   client, or its seat was taken by a concurrent join
    /// * `RoomError::Store` - persistence failure
    pub async fn join_private(
        &self,
        session: ClientSession,
        room_id: RoomId,
        raw_name: &str,
    ) -> RoomResult<JoinResponse> {
        let name = validate_player_name(raw_name, INVITATION_NAME_MESSAGE)?;
        let binding = self.sessions.binding(session).await?;
        let access = AccessContext { binding };

        let mut room = self
            .rooms
            .find_by_id_with_access_check(room_id, &access)
            .await?;
        let seat = room.seat_player(name)?;

        match self.rooms.save(&mut room).await {
            Ok(_) => {}
            Err(StoreError::Conflict(_)) => {
                log::info!("Seat in private room {} was taken concurrently", room_id);
                return Err(RoomError::AccessDenied("seat was taken".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let prior = binding.map(|b| b.room_id);
        self.finish_join(session, prior, room_id, seat).await?;
        log::info!("Session {} joined private room {} at seat {}", session, room_id, seat);

        Ok(JoinResponse::for_seat(room_id, &room, seat))
    }

    /// Create a private room with both players seated.
    ///
    /// # Errors
    ///
    /// * `RoomError::InvalidPayload` - a name is missing or blank
    /// * `RoomError::Store` - persistence failure
    pub async fn create_two_player_session(
        &self,
        player1_name: Option<&str>,
        player2_name: Option<&str>,
    ) -> RoomResult<DirectSessionResponse> {
        let (Some(player1), Some(player2)) = (
            player1_name.map(str::trim).filter(|n| !n.is_empty()),
            player2_name.map(str::trim).filter(|n| !n.is_empty()),
        ) else {
            return Err(RoomError::InvalidPayload);
        };

        let mut room = Room::create(true);
        room.seat_player(player1)?;
        room.seat_player(player2)?;
        let room_id = self.rooms.save(&mut room).await?;
        log::info!("Created two-player room {}", room_id);

        Ok(DirectSessionResponse {
            room: DirectSessionRoom {
                id: room_id,
                game_session_uuid: room.game_session_id(),
            },
            players: room.seats().iter().map(PlayerSummary::from).collect(),
        })
    }

    async fn prior_room(&self, session: ClientSession) -> RoomResult<Option<RoomId>> {
        Ok(self
            .sessions
            .binding(session)
            .await?
            .map(|binding| binding.room_id))
    }

    async fn finish_join(
        &self,
        session: ClientSession,
        prior: Option<RoomId>,
        room_id: RoomId,
        seat: Seat,
    ) -> RoomResult<()> {
        self.sessions
            .bind(
                session,
                SessionBinding {
                    room_id,
                    player_number: seat,
                },
            )
            .await?;

        if let Some(prior_id) = prior
            && prior_id != room_id
        {
            release_in_background(Arc::clone(&self.rooms), prior_id);
        }
        Ok(())
    }
}

/// Where a join put the client
struct Placement {
    room_id: RoomId,
    room: Room,
    seat: Seat,
    created: bool,
}

/// Seat `name` in an available public room other than `prior`, or in a new one.
async fn place_in_public_room(
    rooms: Arc<dyn RoomStore>,
    prior: Option<RoomId>,
    name: String,
) -> RoomResult<Placement> {
    match rooms.find_available_and_reserve(prior).await? {
        Some(room) => take_reserved_seat(rooms, room, name).await,
        None => create_and_seat(rooms.as_ref(), false, name).await,
    }
}

/// Seat `name` in a room this call reserved, releasing the reservation if anything fails.
async fn take_reserved_seat(rooms: Arc<dyn RoomStore>, mut room: Room, name: String) -> RoomResult<Placement> {
    let room_id = room.id().ok_or_else(|| StoreError::Corrupt {
        room_id: None,
        reason: "reserved room has no id".to_string(),
    })?;

    let seated = match room.seat_player(name) {
        Ok(seat) => rooms
            .save(&mut room)
            .await
            .map(|_| seat)
            .map_err(RoomError::from),
        Err(e) => Err(e),
    };

    match seated {
        Ok(seat) => Ok(Placement {
            room_id,
            room,
            seat,
            created: false,
        }),
        Err(e) => {
            log::warn!("Join of reserved room {} failed: {}", room_id, e);
            release_in_background(rooms, room_id);
            Err(e)
        }
    }
}

async fn create_and_seat(rooms: &dyn RoomStore, is_private: bool, name: String) -> RoomResult<Placement> {
    let mut room = Room::create(is_private);
    let seat = room.seat_player(name)?;
    let room_id = rooms.save(&mut room).await?;
    log::debug!("Created {} room {}", if is_private { "private" } else { "public" }, room_id);
    Ok(Placement {
        room_id,
        room,
        seat,
        created: true,
    })
}

/// Clear a room's reservation without holding up the caller.
fn release_in_background(rooms: Arc<dyn RoomStore>, room_id: RoomId) {
    tokio::spawn(async move {
        match rooms.release_by_id(room_id).await {
            Ok(()) => log::debug!("Released room {}", room_id),
            Err(e) => log::error!("Failed to release room {}: {}", room_id, e),
        }
    });
}
