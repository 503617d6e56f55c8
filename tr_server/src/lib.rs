//! HTTP front end for tic-tac-toe room matchmaking.
//!
//! Exposes the matchmaking flows of [`tictac_rooms`] as JSON endpoints and
//! carries the per-client session in a signed cookie.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
