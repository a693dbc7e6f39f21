mod aggregator;
mod config;
mod frame;
mod http;
mod identity;
mod message;
mod models;
mod pipeline;
mod state;
#[cfg(test)]
mod testing;
mod upstream;

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::pipeline::PerkChecker;
use crate::state::AppState;
use crate::upstream::{HubVerifier, NeynarClient, ReservoirClient};
use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = Arc::new(ApiConfig::load().context("Failed to load configuration")?);

    let http_client = upstream::build_http_client(config.upstream.request_timeout())?;
    let verifier = HubVerifier::new(
        http_client.clone(),
        &config.verifier.hub_url,
        &config.verifier.api_key,
        &config.verifier.api_key_header,
    );
    let social_graph = NeynarClient::new(
        http_client.clone(),
        &config.social_graph.base_url,
        &config.social_graph.api_key,
    );
    let ownership = ReservoirClient::new(
        http_client,
        &config.ownership.base_url,
        &config.ownership.api_key,
    );
    let checker = PerkChecker::new(
        &config,
        Arc::new(verifier),
        Arc::new(social_graph),
        Arc::new(ownership),
    );
    let app_state = AppState::new(Arc::clone(&config), checker);

    let listener = TcpListener::bind(config.server.address())
        .await
        .context("Failed to bind HTTP listener")?;
    let local_addr = listener
        .local_addr()
        .context("Failed to obtain listener address")?;
    info!(
        "Perk frame listening on {local_addr}{}",
        config.frame.base_path
    );

    let router = NormalizePathLayer::trim_trailing_slash().layer(http::router(app_state));
    axum::serve(listener, ServiceExt::<Request>::into_make_service(router))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server exited with error")?;

    Ok(())
}

fn init_tracing() {
    let default_filter = "info";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    assert!(!filter.is_empty(), "Tracing filter must not be empty");
    assert!(filter.len() < 256, "Tracing filter length exceeds bounds");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .compact()
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Shutdown signal received");
}
