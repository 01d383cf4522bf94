//! Serve command - runs the key server

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use super::ServeArgs;
use crate::api::create_router;
use crate::config::{AppConfig, admin_secret_from_env};
use crate::infrastructure::access_key::spawn_expired_key_sweeper;
use crate::infrastructure::logging;

/// Run the HTTP server until ctrl-c
pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load()?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    logging::init_logging(&config.logging);

    // Fail fast: without a secret no key can be issued
    let admin_secret = admin_secret_from_env()?;

    let (state, key_service) = crate::create_app_state_with_config(&config, admin_secret).await?;

    let sweeper = match config.keys.sweep_interval_secs {
        0 => None,
        secs => Some(spawn_expired_key_sweeper(
            key_service.store().clone(),
            Duration::from_secs(secs),
        )),
    };

    let app = create_router(state);
    let addr = build_socket_addr(&config)?;
    info!("Starting key server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }

    info!("Key server stopped");
    Ok(())
}

/// Load configuration and the admin secret, report problems, and exit
pub async fn check_config() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    config.validate()?;
    admin_secret_from_env()?;

    info!(
        port = config.server.port,
        backend = ?config.storage.backend,
        identity_attributes = ?config.keys.identity_attributes,
        "Configuration is valid"
    );

    Ok(())
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
