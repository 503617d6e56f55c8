//! Response payloads returned by the matchmaking flows.

use serde::Serialize;
use uuid::Uuid;

use crate::room::{GameStatus, Player, Room, RoomId, Seat, Symbol};

/// Outcome of a successful join
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    #[serde(skip)]
    pub room_id: RoomId,
    pub players: Vec<Player>,
    pub game_status: GameStatus,
    pub player_number: Seat,
    pub is_your_turn: bool,
    /// Whether this join opened a new room
    #[serde(skip)]
    pub room_created: bool,
}

impl JoinResponse {
    /// Build the response for the client seated at `seat` in a saved room.
    pub fn for_seat(room_id: RoomId, room: &Room, seat: Seat) -> Self {
        let is_your_turn = room
            .seats()
            .occupant(seat)
            .is_some_and(Player::has_turn);

        Self {
            room_id,
            players: room.players(),
            game_status: room.game_status(),
            player_number: seat,
            is_your_turn,
            room_created: false,
        }
    }
}

/// Outcome of creating a private room
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateRoomResponse {
    #[serde(flatten)]
    pub join: JoinResponse,
    pub invitation_url: String,
}

/// Identity of a directly created two-player room
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectSessionRoom {
    pub id: RoomId,
    pub game_session_uuid: Uuid,
}

/// Seat summary in a direct session response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSummary {
    pub name: String,
    pub symbol: Symbol,
    pub number: Seat,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            name: player.name().to_string(),
            symbol: player.symbol(),
            number: player.seat(),
        }
    }
}

/// Outcome of creating a room with both players at once
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectSessionResponse {
    pub room: DirectSessionRoom,
    pub players: Vec<PlayerSummary>,
}
