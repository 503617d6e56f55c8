//! Tic-tac-toe matchmaking server.
//!
//! Seats anonymous clients into two-player rooms over a small JSON API,
//! backed by PostgreSQL or, for local runs, an in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use log::info;
use pico_args::Arguments;
use tictac_rooms::{
    Database, MatchmakingConfig, MatchmakingService, MemoryRoomStore, MemorySessionBinder,
    PgRoomStore, PgSessionBinder, RoomStore, SessionBinder,
};
use tr_server::{
    api::{self, client_session::SessionConfig},
    config::{ServerConfig, StoreBackend},
    logging, metrics,
};

/// How often expired session bindings are deleted
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(600);

const HELP: &str = "\
Run the tic-tac-toe matchmaking server

USAGE:
  tr_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory                 Keep rooms in process memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  SESSION_SECRET           Session cookie signing secret (required)
  APP_DOMAIN               Origin used in invitation links
  STORE_BACKEND            postgres | memory
  METRICS_BIND             Prometheus scrape address
  RESERVATION_TTL_SECS     Age after which a room reservation is reclaimed
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let force_memory = pargs.contains("--memory");

    let mut config = ServerConfig::from_env(bind, database_url)?;
    if force_memory {
        config.store_backend = StoreBackend::Memory;
    }
    config.validate()?;

    logging::init();
    info!("Starting matchmaking server at {}", config.bind);

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exposed at http://{}/metrics", metrics_bind);
    }

    let (rooms, sessions) = build_stores(&config).await?;
    spawn_session_purge(Arc::clone(&sessions));

    let matchmaking = Arc::new(MatchmakingService::new(
        rooms,
        sessions,
        MatchmakingConfig {
            app_domain: config.app_domain.clone(),
        },
    ));

    let state = api::AppState {
        matchmaking,
        session: Arc::new(SessionConfig::new(
            config.session.secret.clone(),
            config.session.max_age,
        )),
    };

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Room store and session binder for the configured backend
async fn build_stores(
    config: &ServerConfig,
) -> Result<(Arc<dyn RoomStore>, Arc<dyn SessionBinder>), Error> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory room store");
            let rooms: Arc<dyn RoomStore> =
                Arc::new(MemoryRoomStore::new().with_reservation_ttl(config.reservation_ttl));
            let sessions: Arc<dyn SessionBinder> =
                Arc::new(MemorySessionBinder::new(config.session.max_age));
            Ok((rooms, sessions))
        }
        StoreBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            db.migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            info!("Database connected and migrated");

            let pool = Arc::new(db.pool().clone());
            let rooms: Arc<dyn RoomStore> = Arc::new(
                PgRoomStore::new(pool.clone())
                    .with_query_timeout(config.query_timeout)
                    .with_reservation_ttl(config.reservation_ttl),
            );
            let sessions: Arc<dyn SessionBinder> = Arc::new(
                PgSessionBinder::new(pool)
                    .with_max_age(config.session.max_age)
                    .with_query_timeout(config.query_timeout),
            );
            Ok((rooms, sessions))
        }
    }
}

/// Periodically delete expired session bindings
fn spawn_session_purge(sessions: Arc<dyn SessionBinder>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => info!("Purged {} expired session bindings", removed),
                Err(e) => log::warn!("Failed to purge session bindings: {}", e),
            }
        }
    });
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
