//! # Tictac Rooms
//!
//! Room matchmaking for two-player tic-tac-toe.
//!
//! A room holds at most two players. The first player takes seat 1 and the
//! `X` symbol; the second takes seat 2 and `O`. Public rooms are handed out
//! to random joiners, private rooms are joined through an invitation link
//! carrying the room id.
//!
//! ## Core Modules
//!
//! - [`room`]: Room, seat and player models plus the seating rules
//! - [`store`]: Room persistence with atomic reservation of available rooms
//! - [`session`]: Binding of client sessions to the room and seat they hold
//! - [`matchmaking`]: The join flows tying the above together
//! - [`db`]: PostgreSQL pool, configuration and query timeouts
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tictac_rooms::{
//!     ClientSession, MatchmakingConfig, MatchmakingService, MemoryRoomStore, MemorySessionBinder,
//! };
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let service = MatchmakingService::new(
//!         Arc::new(MemoryRoomStore::new()),
//!         Arc::new(MemorySessionBinder::default()),
//!         MatchmakingConfig::default(),
//!     );
//!
//!     let joined = service.join_random(ClientSession::new(), "Alice").await.unwrap();
//!     assert!(joined.is_your_turn);
//! });
//! ```

/// Database pool, configuration and timeouts.
pub mod db;
pub use db::{Database, DatabaseConfig};

/// Room models and seating rules.
pub mod room;
pub use room::{GameStatus, Player, Room, RoomError, RoomId, RoomResult, Seat, Symbol};

/// Room persistence.
pub mod store;
pub use store::{
    AccessContext, DEFAULT_RESERVATION_TTL, MemoryRoomStore, PgRoomStore, RoomStore, StoreError,
    StoreResult,
};

/// Session bindings.
pub mod session;
pub use session::{ClientSession, MemorySessionBinder, PgSessionBinder, SessionBinder, SessionBinding};

/// Matchmaking flows.
pub mod matchmaking;
pub use matchmaking::{
    DirectSessionResponse, JoinResponse, MatchmakingConfig, MatchmakingService, PrivateRoomResponse,
};
