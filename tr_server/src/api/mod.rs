//! HTTP API for the matchmaking server.
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                  - Store health status
//! POST /api/v1/rooms/random                     - Join any public room
//! POST /api/v1/rooms/private                    - Create a private room
//! POST /api/v1/rooms/private/{room_id}/join     - Join a private room by invitation
//! POST /api/v1/sessions                         - Create a room with both players
//! ```
//!
//! Room routes resolve the client session from the signed `ttr.sid` cookie
//! (see [`client_session`]). All responses are JSON with camelCase keys.
//!
//! # Error Responses
//!
//! | Error            | Status | Body                                   |
//! |------------------|--------|----------------------------------------|
//! | invalid name     | 200    | `{"message": …, "inputNotValid": true}` |
//! | invalid payload  | 400    | `{"message": "Invalid request payload"}` |
//! | access denied    | 403    | `{"message": …}`                       |
//! | unknown room     | 404    | `{"message": "Room not found"}`        |
//! | store failure    | 500    | `{"message": "Internal server error"}` |

pub mod client_session;
pub mod request_id;
pub mod rooms;
pub mod sessions;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tictac_rooms::{MatchmakingService, RoomError, RoomId, RoomResult};
use tower_http::cors::CorsLayer;

use crate::{logging, metrics};
use client_session::SessionConfig;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub matchmaking: Arc<MatchmakingService>,
    pub session: Arc<SessionConfig>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use tr_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    // Seat-taking routes need the client session
    let room_routes = Router::new()
        .route("/rooms/random", post(rooms::join_random))
        .route("/rooms/private", post(rooms::create_private))
        .route("/rooms/private/{room_id}/join", post(rooms::join_private))
        .layer(axum::middleware::from_fn_with_state(
            state.session.clone(),
            client_session::client_session_middleware,
        ));

    Router::new()
        .merge(room_routes)
        .route("/sessions", post(sessions::create_session))
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Body of a rejected name; the client shows `message` next to the input
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidInputResponse {
    pub message: String,
    pub input_not_valid: bool,
}

/// Metric and log label for an error
fn outcome_label(err: &RoomError) -> &'static str {
    match err {
        RoomError::InvalidName(_) => "invalid_name",
        RoomError::InvalidPayload => "invalid_payload",
        RoomError::AccessDenied(_) => "access_denied",
        RoomError::NotFound(_) => "not_found",
        RoomError::NotYourTurn => "not_your_turn",
        RoomError::Store(_) => "store_error",
    }
}

/// Map a matchmaking error to its HTTP response
pub fn error_response(err: &RoomError) -> Response {
    let status = match err {
        RoomError::InvalidName(message) => {
            return (
                StatusCode::OK,
                Json(InvalidInputResponse {
                    message: message.clone(),
                    input_not_valid: true,
                }),
            )
                .into_response();
        }
        RoomError::InvalidPayload => StatusCode::BAD_REQUEST,
        RoomError::AccessDenied(_) => StatusCode::FORBIDDEN,
        RoomError::NotFound(_) => StatusCode::NOT_FOUND,
        RoomError::NotYourTurn => StatusCode::CONFLICT,
        RoomError::Store(e) => {
            tracing::error!(error = %e, "Room store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            message: err.client_message(),
        }),
    )
        .into_response()
}

/// Record the outcome of a flow and turn it into a response
pub(crate) fn respond<T: Serialize>(
    flow: &str,
    result: RoomResult<T>,
    room_of: impl Fn(&T) -> RoomId,
) -> Response {
    match result {
        Ok(body) => {
            metrics::matchmaking_joins_total(flow, "joined");
            logging::log_matchmaking_event(flow, Some(room_of(&body)), "joined");
            Json(body).into_response()
        }
        Err(err) => {
            let outcome = outcome_label(&err);
            metrics::matchmaking_joins_total(flow, outcome);
            logging::log_matchmaking_event(flow, None, outcome);
            error_response(&err)
        }
    }
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` if the room store answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"0.1.0","store":true,"timestamp":"2026-10-18T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let store_healthy = state.matchmaking.rooms().health_check().await.is_ok();
    let elapsed_ms = start.elapsed().as_millis() as u64;

    logging::log_store_operation("health_check", elapsed_ms, store_healthy);
    metrics::store_operation_duration_ms("health_check", elapsed_ms as f64);

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
