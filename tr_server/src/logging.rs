//! Structured logging configuration.
//!
//! The matchmaking library logs through the `log` facade; the subscriber
//! installed here picks those records up alongside the server's own
//! `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the RUST_LOG env var.
///
/// # Example
///
/// ```no_run
/// use tr_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log the outcome of a matchmaking flow
///
/// # Arguments
///
/// * `flow` - Flow name (join_random, create_private, join_private, direct_session)
/// * `room_id` - Room the client ended up in, if any
/// * `outcome` - Outcome label
///
/// # Example
///
/// ```
/// use tr_server::logging::log_matchmaking_event;
///
/// log_matchmaking_event("join_random", Some(7), "joined");
/// ```
pub fn log_matchmaking_event(flow: &str, room_id: Option<i64>, outcome: &str) {
    match outcome {
        "store_error" => tracing::error!(flow = flow, room_id = room_id, outcome = outcome, "Matchmaking failed"),
        "access_denied" | "not_found" => {
            tracing::warn!(flow = flow, room_id = room_id, outcome = outcome, "Matchmaking refused")
        }
        _ => tracing::info!(flow = flow, room_id = room_id, outcome = outcome, "Matchmaking completed"),
    }
}

/// Log a room store operation
///
/// # Arguments
///
/// * `operation` - Operation name
/// * `duration_ms` - Duration in milliseconds
/// * `success` - Whether the operation succeeded
pub fn log_store_operation(operation: &str, duration_ms: u64, success: bool) {
    tracing::debug!(
        operation = operation,
        duration_ms = duration_ms,
        success = success,
        "Store operation"
    );

    if duration_ms > 100 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Slow store operation detected"
        );
    }
}
