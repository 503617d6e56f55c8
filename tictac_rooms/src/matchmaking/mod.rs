//! Matchmaking: seating clients into two-player rooms.
//!
//! Three flows share the same shape. Validate the name, find or create a
//! room, seat the player, persist, then bind the client session to the new
//! room and seat. A room the client held before is released once the new
//! binding is written.

pub mod responses;
pub mod service;
pub mod validation;

pub use responses::{
    DirectSessionResponse, DirectSessionRoom, JoinResponse, PlayerSummary, PrivateRoomResponse,
};
pub use service::{DEFAULT_APP_DOMAIN, MatchmakingConfig, MatchmakingService};
pub use validation::{
    INVITATION_NAME_MESSAGE, MAX_NAME_LEN, MIN_NAME_LEN, NAME_LENGTH_MESSAGE, validate_player_name,
};
