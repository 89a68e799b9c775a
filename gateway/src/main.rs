use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracking_core::TrackingEngine;

mod config;
mod feeds;
mod routes;

use config::{GatewayConfig, TOKEN_VAR};
use feeds::{EnvCredential, HttpFeeds};
use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "orbital_gateway=debug,tracking_core=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env()?;

    let feeds = HttpFeeds::new(
        config.api_base.clone(),
        Duration::from_secs(config.http_timeout_sec),
        Arc::new(EnvCredential::new(TOKEN_VAR)),
    )?;
    if std::env::var(TOKEN_VAR).is_err() {
        tracing::warn!("   {} not set - feeds wait for a credential", TOKEN_VAR);
    }

    let (engine, engine_task) = TrackingEngine::spawn(config.tracking.clone(), feeds);
    let app = routes::app(AppState::new(engine.clone()));

    let addr = config.listen_addr();
    tracing::info!("🛰️  Orbital Gateway starting on {}", addr);
    tracing::info!("   Upstream: {}", config.api_base);
    tracing::info!(
        "   Refresh: objects {}s, warnings {}s",
        config.tracking.catalog_interval_sec,
        config.tracking.warning_interval_sec
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.shutdown().await?;
    engine_task.await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
