//! omnicanal server

use std::net::SocketAddr;

use anyhow::Context;
use omnicanal::{config::OmnicanalConfig, observability, routes, state::AppState};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OmnicanalConfig::load()?;
    observability::init(&config.logging, config.log_format())?;

    let address = config.server.bind_address();
    info!(
        service = %config.app.name,
        env = %config.app.env,
        backend = ?config.email.backend,
        request_logging = config.should_log_requests(),
        "Starting omnicanal"
    );

    let state = AppState::from_config(config).context("failed to configure email delivery")?;
    let app = routes::router(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("Ctrl-C handler unavailable; running until killed");
        std::future::pending::<()>().await;
    }
}
