mod handlers;
mod routes;

use anyhow::{Context, Result};
use axum::Router;
use grader_common::config::GraderConfig;
use grader_engine::{GraderEngine, SshSession};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub engine: GraderEngine,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Grader API booting...");

    let config = match std::env::var("GRADER_CONFIG") {
        Ok(path) => GraderConfig::load(Path::new(&path))?,
        Err(_) => GraderConfig::from_env().map_err(|e| {
            error!("Failed to load configuration: {:#}", e);
            error!("Set SSH_ADDRESS, SSH_USERNAME and SSH_PRIVATE_KEY_LOCATION or point GRADER_CONFIG at a JSON file");
            e
        })?,
    };

    info!(
        host = %config.ssh.host,
        username = %config.ssh.username,
        remote_base_dir = %config.remote_base_dir(),
        compiler = %config.compiler,
        "Configuration loaded"
    );

    // The SSH session connects lazily on the first submission
    let session = Arc::new(SshSession::new(config.ssh.clone()));
    let engine = GraderEngine::new(session.clone(), &config);

    engine
        .layout()
        .prepare_staging_dir()
        .await
        .with_context(|| format!("Failed to create staging directory {}", config.staging_dir.display()))?;

    let state = Arc::new(AppState { engine });

    // Build router
    let app = Router::new()
        .merge(routes::routes())
        .with_state(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);
    info!("Ready to accept submissions");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    match Arc::try_unwrap(session) {
        Ok(session) => match session.close().await {
            Ok(()) => info!("SSH connection closed successfully"),
            Err(e) => warn!(error = %e, "Failed to close SSH connection cleanly"),
        },
        Err(_) => warn!("SSH session still in use at shutdown; dropping it"),
    }

    info!("Grader API shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    warn!("Ctrl+C detected, shutting down server...");
}
