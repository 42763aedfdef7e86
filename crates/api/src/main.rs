mod config;
mod error;
mod middleware;
mod routes;
mod state;

use std::sync::Arc;

use match_events_core::events::{ChangeFeed, PgChangeListener};
use match_events_core::store::{PgEventStore, SharedStore};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::EnvFilter;

/// Match routes take no request bodies worth more than this.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience)
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = config::AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    tracing::info!("Starting match events API server");

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;

    tracing::info!("Connected to PostgreSQL");

    // Run migrations
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;

    tracing::info!("Database migrations applied");

    let store: SharedStore = Arc::new(PgEventStore::new(pool.clone()));

    // Forward row changes from Postgres onto the in-process feed
    let change_feed = ChangeFeed::new(config.event_bus_capacity);
    let listener = PgChangeListener::connect(
        &pool,
        &config.notify_channel,
        store.clone(),
        change_feed.clone(),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to start change listener: {e}"))?;
    let listener_task = tokio::spawn(async move {
        if let Err(e) = listener.run().await {
            tracing::error!(error = %e, "change listener stopped");
        }
    });

    // Build application state
    let state = state::AppState::new(store, config.clone(), change_feed);
    let reaper_task = state.spawn_reaper();

    // Build router with middleware
    let app = routes::build_router(state.clone()).layer(
        ServiceBuilder::new()
            .layer(middleware::request_tracing::trace_layer())
            .layer(middleware::cors::cors_layer())
            .map_response(axum::response::IntoResponse::into_response)
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
    );

    // Start server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown_live_matches().await;
    reaper_task.abort();
    listener_task.abort();

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("Received Ctrl+C, shutting down..."); }
        _ = terminate => { tracing::info!("Received SIGTERM, shutting down..."); }
    }
}
