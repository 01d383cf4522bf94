//! Keybind - identity-bound access key server
//!
//! Mints short-lived, single-identity access keys:
//! - Keys are issued by an administrator and start unbound
//! - The first client to validate a key binds it to its identity
//! - Later validations succeed only for the same identity, until expiry

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use api::state::AppState;
use config::StorageBackend;
use domain::access_key::KeyRepository;
use infrastructure::access_key::{
    AdminSecret, InMemoryKeyRepository, KeyService, KeyStore, PostgresConfig,
    PostgresKeyRepository,
};
use infrastructure::rate_limiter::RateLimiter;

/// Build the key service for the configured storage backend
pub async fn build_key_service(
    config: &AppConfig,
    admin_secret: String,
) -> anyhow::Result<KeyService> {
    config.validate()?;

    let repository: Arc<dyn KeyRepository> = match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory key storage");
            Arc::new(InMemoryKeyRepository::new())
        }
        StorageBackend::Postgres => {
            let url = config.storage.database_url.clone().ok_or_else(|| {
                anyhow::anyhow!("storage.database_url is required for the postgres backend")
            })?;
            let pg_config =
                PostgresConfig::new(url).with_max_connections(config.storage.max_connections);

            let repository = PostgresKeyRepository::connect(&pg_config).await?;

            info!("Using PostgreSQL key storage");
            Arc::new(repository)
        }
    };

    let store = KeyStore::new(repository).with_generator(config.keys.generator()?);

    Ok(
        KeyService::new(store, AdminSecret::new(admin_secret)?)
            .with_identity_policy(config.keys.identity_policy()?)
            .with_ttl_policy(config.keys.ttl_policy()?),
    )
}

/// Assemble the HTTP state around an existing key service
pub fn create_app_state(config: &AppConfig, key_service: KeyService) -> AppState {
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

    AppState::new(Arc::new(key_service), rate_limiter)
        .with_script_url(config.keys.script_url.clone())
}

/// Build the key service and HTTP state from configuration
pub async fn create_app_state_with_config(
    config: &AppConfig,
    admin_secret: String,
) -> anyhow::Result<(AppState, KeyService)> {
    let key_service = build_key_service(config, admin_secret).await?;
    let state = create_app_state(config, key_service.clone());

    Ok((state, key_service))
}
