//! GrantDesk server
//!
//! This binary starts the GrantDesk HTTP server: the REST API, the
//! server-rendered pages and the Swagger UI.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::mysql::MySqlPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use grantdesk_db::{SessionRepository, migrations};

use grantdesk_server::{AppState, ServerConfig, create_router};

/// How often expired sessions are removed.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command line arguments
    let config = ServerConfig::parse();

    // Connect to database
    info!("Connecting to database...");
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    info!("Database connection established");

    if config.run_migrations {
        migrations::run(&pool)
            .await
            .context("Failed to apply migrations")?;
        info!("Migrations applied");
    }

    if config.summary_template.is_none() {
        info!("No summary template configured, PDF summaries are disabled");
    }

    // Create shutdown token for graceful shutdown
    let shutdown_token = CancellationToken::new();

    let purge = tokio::spawn(purge_sessions(
        SessionRepository::new(pool.clone()),
        shutdown_token.clone(),
    ));

    let app_state = AppState::new(pool, &config);
    let app = create_router(app_state, &config);

    // Bind to address
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid address")?;

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Starting GrantDesk server on http://{}", addr);
    info!("Swagger UI available at http://{}/swagger-ui", addr);

    // Peer addresses are needed by the rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_token))
    .await
    .context("Server error")?;

    purge.await.ok();
    info!("Server shutdown complete");
    Ok(())
}

/// Periodically deletes expired sessions until shutdown.
async fn purge_sessions(sessions: SessionRepository, shutdown_token: CancellationToken) {
    let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => break,
            _ = interval.tick() => {
                match sessions.purge_expired(Utc::now()).await {
                    Ok(0) => {}
                    Ok(purged) => info!(purged, "Expired sessions removed"),
                    Err(e) => tracing::warn!(error = %e, "Session purge failed"),
                }
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");

    // Stops the session purge loop
    shutdown_token.cancel();
}
