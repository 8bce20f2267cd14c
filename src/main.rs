//! Admin Session Gate
//!
//! Cookie-based session authentication for a single admin principal:
//! opaque session tokens, an in-memory store with lazy expiry, a background
//! sweep of expired sessions and a request gate for protected routes.

mod config;
mod error;
mod gate;
mod handlers;
mod session;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use config::{Args, AuthConfig};
use session::{spawn_cleanup_task, SessionStore};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up a local .env before clap reads the environment
    let dotenv = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("{}={},tower_http=info", env!("CARGO_CRATE_NAME"), log_level))
        .json()
        .init();

    match dotenv {
        Ok(path) => debug!(path = ?path, "Loaded environment file"),
        Err(e) => debug!(error = %e, "No .env file loaded"),
    }

    info!("Starting admin session gate");

    // Build configuration
    let config = AuthConfig::from_args(&args).context("Invalid configuration")?;

    info!(
        session_ttl_secs = config.session_ttl_secs,
        cleanup_interval_secs = config.cleanup_interval_secs,
        cookie_name = %config.cookie_name,
        cookie_secure = config.cookie_secure,
        "Configuration loaded"
    );

    // Session store lives for the process; sessions do not survive a restart
    let session_store = Arc::new(SessionStore::new(config.session_ttl_secs));

    let shutdown = CancellationToken::new();
    info!("Starting session cleanup task");
    let cleanup_handle = spawn_cleanup_task(
        Arc::clone(&session_store),
        Duration::from_secs(config.cleanup_interval_secs),
        shutdown.clone(),
    );

    let app = handlers::router(AppState::new(session_store, config));

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!(addr = %args.listen, "Listening");

    let server_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
                _ = server_shutdown.cancelled() => {}
            }
        })
        .await;

    // Stop the sweeper whether the server exited cleanly or not
    shutdown.cancel();
    if let Err(e) = cleanup_handle.await {
        warn!(error = %e, "Session cleanup task ended abnormally");
    }

    served.context("HTTP server failed")?;
    info!("Shutdown complete");

    Ok(())
}
