//! Room aggregate: seats, symbols and turn state for two-player rooms.
//!
//! A room moves through `Empty → OneSeated → Full`. While it has a free seat
//! it may additionally be reserved by a single in-flight join; the
//! reservation is released by the same join once the seat is taken or the
//! join fails.

pub mod errors;
pub mod models;

pub use errors::{RoomError, RoomResult};
pub use models::{GameStatus, Player, Reservation, Room, RoomId, Seat, Seats, Symbol};
