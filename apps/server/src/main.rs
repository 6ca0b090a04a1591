//! # Cantina Server
//!
//! HTTP API for multi-location stock movements and menu resolution.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cantina Server                                   │
//! │                                                                         │
//! │  Operator UI ───► HTTP (8080) ───► Services ───► SQLite                │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                                  Audit trail                            │
//! │                                 (best effort)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cantina_db::{Database, DbConfig};
use cantina_server::{routes, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Cantina server...");

    // Load configuration
    let config = ServerConfig::load()?;
    info!(
        port = config.http_port,
        db_path = %config.database_path,
        strategy = ?config.override_strategy,
        "Configuration loaded"
    );

    // Connect to database (runs migrations)
    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Connected to SQLite");

    // Wire services and routes
    let state = AppState::new(db, &config);
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves when the process is asked to stop (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation failed")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.expect("Ctrl+C handler installation failed");
        }
        _ = sigterm => {}
    }

    info!("Shutdown signal received, draining in-flight requests");
}
