mod config;
mod registry;
mod routes_allocations;
mod runner;
mod state;
mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::state::{AppState, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;
    let app_state: SharedState = Arc::new(AppState::new(cfg.clone()));

    // Periodically drop tasks that have been terminal longer than the
    // retention window, so the registry stays bounded.
    let sweeper_state = app_state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweeper_state.cfg.sweep_every).await;
            let evicted = sweeper_state.tasks.sweep(sweeper_state.cfg.task_ttl).await;
            if evicted > 0 {
                debug!(evicted, "task registry sweep");
            }
        }
    });

    let app = Router::new()
        .route("/allocations", post(routes_allocations::submit_allocation))
        .route("/allocations/:id", get(routes_allocations::poll_allocation))
        .route("/healthz", get(routes_allocations::healthz))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = &cfg.bind_addr;
    info!("subnetd listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
