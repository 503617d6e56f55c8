//! Room aggregate and seat models.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::errors::{RoomError, RoomResult};
use crate::store::StoreError;

/// Room ID type, assigned by the store on first save
pub type RoomId = i64;

/// One of the two fixed slots in a room.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    /// Seats in fill order.
    pub const ALL: [Seat; 2] = [Seat::One, Seat::Two];

    pub fn number(self) -> u8 {
        match self {
            Seat::One => 1,
            Seat::Two => 2,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Seat::One),
            2 => Some(Seat::Two),
            _ => None,
        }
    }

    /// The opposite seat.
    pub fn other(self) -> Self {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }
}

impl TryFrom<u8> for Seat {
    type Error = String;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Seat::from_number(number).ok_or_else(|| format!("invalid seat number {number}"))
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> Self {
        seat.number()
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Game marks. `X` is the first-mover mark.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// Mark handed to the next occupant of a room that already seats `occupied` players.
    pub fn for_occupancy(occupied: usize) -> Self {
        if occupied == 0 { Symbol::X } else { Symbol::O }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::X => "X",
            Self::O => "O",
        };
        write!(f, "{repr}")
    }
}

/// A seat occupant.
///
/// Name, symbol and seat are fixed at creation. The turn flags are
/// re-derived from the room's [`GameStatus`] whenever it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    name: String,
    symbol: Symbol,
    #[serde(rename = "number")]
    seat: Seat,
    has_turn: bool,
    has_moved: bool,
}

impl Player {
    pub fn new(name: impl Into<String>, symbol: Symbol, seat: Seat, has_turn: bool) -> Self {
        Self {
            name: name.into(),
            symbol,
            seat,
            has_turn,
            has_moved: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn has_turn(&self) -> bool {
        self.has_turn
    }

    pub fn has_moved(&self) -> bool {
        self.has_moved
    }
}

/// Turn bookkeeping shared by both seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    /// Seat expected to move next
    pub current_turn_seat: Seat,
    /// Moves made so far by either seat
    pub move_count: u32,
}

impl Default for GameStatus {
    fn default() -> Self {
        Self {
            current_turn_seat: Seat::One,
            move_count: 0,
        }
    }
}

/// Seat occupancy. A third occupant has no representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seats {
    Empty,
    OneSeated(Player),
    Full { first: Player, second: Player },
}

impl Seats {
    /// Rebuild occupancy from a persisted player list, checking seat and symbol uniqueness.
    pub fn from_players(mut players: Vec<Player>) -> Result<Self, String> {
        players.sort_by_key(Player::seat);
        match players.len() {
            0 => Ok(Seats::Empty),
            1 => {
                let player = players.remove(0);
                if player.symbol != Symbol::X {
                    return Err(format!("sole occupant of seat {} holds {}", player.seat, player.symbol));
                }
                Ok(Seats::OneSeated(player))
            }
            2 => {
                let second = players.remove(1);
                let first = players.remove(0);
                if first.seat != Seat::One || second.seat != Seat::Two {
                    return Err("duplicate seat numbers".to_string());
                }
                if first.symbol == second.symbol {
                    return Err(format!("both occupants hold {}", first.symbol));
                }
                Ok(Seats::Full { first, second })
            }
            n => Err(format!("{n} occupants")),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Seats::Empty => 0,
            Seats::OneSeated(_) => 1,
            Seats::Full { .. } => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Seats::Empty)
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Seats::Full { .. })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        let (a, b) = match self {
            Seats::Empty => (None, None),
            Seats::OneSeated(p) => (Some(p), None),
            Seats::Full { first, second } => (Some(first), Some(second)),
        };
        a.into_iter().chain(b)
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        let (a, b) = match self {
            Seats::Empty => (None, None),
            Seats::OneSeated(p) => (Some(p), None),
            Seats::Full { first, second } => (Some(first), Some(second)),
        };
        a.into_iter().chain(b)
    }

    pub fn occupant(&self, seat: Seat) -> Option<&Player> {
        self.iter().find(|p| p.seat == seat)
    }

    /// Lowest-numbered seat nobody occupies.
    pub fn free_seat(&self) -> Option<Seat> {
        Seat::ALL.into_iter().find(|seat| self.occupant(*seat).is_none())
    }

    fn with(self, player: Player) -> Self {
        match self {
            Seats::Empty => Seats::OneSeated(player),
            Seats::OneSeated(incumbent) => {
                let (first, second) = if incumbent.seat == Seat::One {
                    (incumbent, player)
                } else {
                    (player, incumbent)
                };
                Seats::Full { first, second }
            }
            // Callers check free_seat() first.
            full @ Seats::Full { .. } => full,
        }
    }
}

/// Transient exclusive claim on a room during a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Open,
    Reserved,
}

/// The reservation unit: up to two players plus turn state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    id: Option<RoomId>,
    game_session_id: Uuid,
    is_private: bool,
    seats: Seats,
    game_status: GameStatus,
    reservation: Reservation,
    revision: i64,
}

impl Room {
    /// Create an empty, unsaved room.
    pub fn create(is_private: bool) -> Self {
        Self {
            id: None,
            game_session_id: Uuid::new_v4(),
            is_private,
            seats: Seats::Empty,
            game_status: GameStatus::default(),
            reservation: Reservation::Open,
            revision: 0,
        }
    }

    /// Rebuild a room from its persisted parts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if the players break seat/symbol
    /// uniqueness or a full room is marked as reserved.
    pub fn from_parts(
        id: RoomId,
        game_session_id: Uuid,
        is_private: bool,
        players: Vec<Player>,
        game_status: GameStatus,
        blocked: bool,
        revision: i64,
    ) -> Result<Self, StoreError> {
        let seats = Seats::from_players(players).map_err(|reason| StoreError::Corrupt {
            room_id: Some(id),
            reason,
        })?;

        if blocked && seats.is_full() {
            return Err(StoreError::Corrupt {
                room_id: Some(id),
                reason: "full room is reserved".to_string(),
            });
        }

        Ok(Self {
            id: Some(id),
            game_session_id,
            is_private,
            seats,
            game_status,
            reservation: if blocked { Reservation::Reserved } else { Reservation::Open },
            revision,
        })
    }

    pub fn id(&self) -> Option<RoomId> {
        self.id
    }

    pub fn game_session_id(&self) -> Uuid {
        self.game_session_id
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn seats(&self) -> &Seats {
        &self.seats
    }

    pub fn players(&self) -> Vec<Player> {
        self.seats.iter().cloned().collect()
    }

    pub fn game_status(&self) -> GameStatus {
        self.game_status
    }

    pub fn is_blocked(&self) -> bool {
        self.reservation == Reservation::Reserved
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    /// Public, not reserved and with a free seat.
    pub fn is_available(&self) -> bool {
        !self.is_private && !self.is_blocked() && !self.seats.is_full()
    }

    /// Mark the room as reserved. Only an available room can be reserved.
    pub fn reserve(&mut self) -> RoomResult<()> {
        if !self.is_available() {
            return Err(RoomError::AccessDenied("room is not available".to_string()));
        }
        self.reservation = Reservation::Reserved;
        Ok(())
    }

    pub fn clear_reservation(&mut self) {
        self.reservation = Reservation::Open;
    }

    /// Record the id handed out by the store on first insert.
    pub fn assign_id(&mut self, id: RoomId) {
        self.id = Some(id);
    }

    /// Record the revision written by the store.
    pub fn set_revision(&mut self, revision: i64) {
        self.revision = revision;
    }

    /// Whether the next occupant starts with the turn.
    ///
    /// The first occupant of an empty room always does. A second occupant
    /// does only when the turn has already passed away from the incumbent,
    /// i.e. the incumbent has moved and is now waiting.
    pub fn newcomer_has_turn(&self) -> bool {
        match &self.seats {
            Seats::Empty => true,
            Seats::OneSeated(incumbent) => self.game_status.current_turn_seat != incumbent.seat,
            Seats::Full { .. } => false,
        }
    }

    /// Seat a new player in the lowest free seat and release any reservation.
    ///
    /// Returns the assigned seat.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::AccessDenied`] if both seats are taken.
    pub fn seat_player(&mut self, name: impl Into<String>) -> RoomResult<Seat> {
        let seat = self
            .seats
            .free_seat()
            .ok_or_else(|| RoomError::AccessDenied("room is full".to_string()))?;
        let symbol = Symbol::for_occupancy(self.seats.len());
        let has_turn = self.newcomer_has_turn();

        if has_turn {
            self.game_status.current_turn_seat = seat;
        }

        let seats = std::mem::replace(&mut self.seats, Seats::Empty);
        self.seats = seats.with(Player::new(name, symbol, seat, has_turn));
        self.sync_turn_flags();
        self.clear_reservation();

        Ok(seat)
    }

    /// Hand the turn over after `seat` moved.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::NotYourTurn`] if `seat` is unoccupied or not due to move.
    pub fn record_move(&mut self, seat: Seat) -> RoomResult<()> {
        if self.game_status.current_turn_seat != seat || self.seats.occupant(seat).is_none() {
            return Err(RoomError::NotYourTurn);
        }

        self.game_status.move_count += 1;
        self.game_status.current_turn_seat = seat.other();
        for player in self.seats.iter_mut() {
            if player.seat == seat {
                player.has_moved = true;
            }
        }
        self.sync_turn_flags();
        Ok(())
    }

    fn sync_turn_flags(&mut self) {
        let current = self.game_status.current_turn_seat;
        for player in self.seats.iter_mut() {
            player.has_turn = player.seat == current;
        }
    }
}
