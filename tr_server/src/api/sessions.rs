//! Direct two-player session handler.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::Response,
};
use serde::Deserialize;
use tictac_rooms::RoomError;

use super::{AppState, error_response, respond};
use crate::metrics;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectSessionRequest {
    pub player1_name: Option<String>,
    pub player2_name: Option<String>,
}

/// Create a private room with both players already seated.
///
/// # Request
///
/// ```json
/// {"player1Name": "Ann", "player2Name": "Bo"}
/// ```
///
/// # Response
///
/// ```json
/// {
///   "room": {"id": 12, "gameSessionUuid": "6f1c..."},
///   "players": [
///     {"name": "Ann", "symbol": "X", "number": 1},
///     {"name": "Bo", "symbol": "O", "number": 2}
///   ]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: a name is missing or blank, or the body is not JSON
pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<DirectSessionRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected session request body");
            return error_response(&RoomError::InvalidPayload);
        }
    };

    let result = state
        .matchmaking
        .create_two_player_session(
            request.player1_name.as_deref(),
            request.player2_name.as_deref(),
        )
        .await;
    if result.is_ok() {
        metrics::rooms_created_total(true);
    }

    respond("direct_session", result, |created| created.room.id)
}
