//! Room matchmaking handlers.
//!
//! Each handler takes `{"name": "..."}` and the client session resolved by
//! the session cookie middleware.

use axum::{
    Json,
    extract::{Extension, Path, State, rejection::JsonRejection},
    response::Response,
};
use serde::Deserialize;
use tictac_rooms::{ClientSession, RoomError, RoomId};

use super::{AppState, error_response, respond};
use crate::metrics;

#[derive(Debug, Default, Deserialize)]
pub struct NameRequest {
    #[serde(default)]
    pub name: String,
}

fn name_from(payload: Result<Json<NameRequest>, JsonRejection>) -> Result<String, Response> {
    match payload {
        Ok(Json(request)) => Ok(request.name),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected room request body");
            Err(error_response(&RoomError::InvalidPayload))
        }
    }
}

/// Join any available public room, creating one when none is free.
///
/// # Response
///
/// ```json
/// {
///   "players": [{"name": "Ann", "symbol": "X", "number": 1, "hasTurn": true, "hasMoved": false}],
///   "gameStatus": {"currentTurnSeat": 1, "moveCount": 0},
///   "playerNumber": 1,
///   "isYourTurn": true
/// }
/// ```
pub async fn join_random(
    State(state): State<AppState>,
    Extension(session): Extension<ClientSession>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> Response {
    let name = match name_from(payload) {
        Ok(name) => name,
        Err(response) => return response,
    };

    let result = state.matchmaking.join_random(session, &name).await;
    if let Ok(joined) = &result
        && joined.room_created
    {
        metrics::rooms_created_total(false);
    }

    respond("join_random", result, |joined| joined.room_id)
}

/// Create a private room; the response carries the invitation link.
pub async fn create_private(
    State(state): State<AppState>,
    Extension(session): Extension<ClientSession>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> Response {
    let name = match name_from(payload) {
        Ok(name) => name,
        Err(response) => return response,
    };

    let result = state.matchmaking.create_private(session, &name).await;
    if result.is_ok() {
        metrics::rooms_created_total(true);
    }

    respond("create_private", result, |created| created.join.room_id)
}

/// Take the free seat of a private room from an invitation link.
///
/// # Errors
///
/// - `403 Forbidden`: room is public, full, or already holds this client
/// - `404 Not Found`: unknown room
pub async fn join_private(
    State(state): State<AppState>,
    Extension(session): Extension<ClientSession>,
    Path(room_id): Path<RoomId>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> Response {
    let name = match name_from(payload) {
        Ok(name) => name,
        Err(response) => return response,
    };

    let result = state.matchmaking.join_private(session, room_id, &name).await;
    respond("join_private", result, |joined| joined.room_id)
}
