//! LightFirst HTTP Server Binary
//!
//! Loads the source configuration, builds the query session and serves the
//! REST API.
//!
//! # Usage
//!
//! ```bash
//! # Configuration from lightfirst.toml in a default location
//! cargo run --bin lightfirst-server
//!
//! # Configuration from the environment
//! LIGHTFIRST_SOURCES=atlas,asas-sn ATLAS_USERNAME=user ATLAS_PASSWORD=pass \
//!   cargo run --bin lightfirst-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `LIGHTFIRST_CONFIG`: Path to a TOML configuration file
//! - `JOB_RETENTION_MINUTES`: How long finished query jobs are kept (default: 60)
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use lightfirst::config::SessionConfig;
use lightfirst::http::{create_router, AppState};
use lightfirst::services::{JobTracker, Session, DEFAULT_JOB_RETENTION_MINUTES};

/// Configuration file named by `LIGHTFIRST_CONFIG`, else the default
/// location, else the environment.
fn load_config() -> anyhow::Result<SessionConfig> {
    if let Ok(path) = env::var("LIGHTFIRST_CONFIG") {
        info!("Loading configuration from {}", path);
        return Ok(SessionConfig::from_file(&path)?);
    }

    match SessionConfig::from_default_location() {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!("{}; falling back to environment", e);
            Ok(SessionConfig::from_env()?)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting LightFirst HTTP Server");

    let config = load_config()?;
    let session = Session::new(&config)?;
    info!("Session configured with sources: {:?}", session.source_names());

    let retention = env::var("JOB_RETENTION_MINUTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_JOB_RETENTION_MINUTES);
    let job_tracker = JobTracker::with_retention(chrono::Duration::minutes(retention));
    let state = AppState::with_job_tracker(Arc::new(session), job_tracker);
    let app = create_router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
