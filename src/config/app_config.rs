use serde::Deserialize;

use crate::domain::DomainError;
use crate::domain::access_key::{DEFAULT_IDENTITY_ATTRIBUTES, IdentityPolicy};
use crate::infrastructure::access_key::{
    DEFAULT_KEY_BYTES, DEFAULT_TTL_HOURS, KeyGenerator, MAX_TTL_HOURS, TtlPolicy,
};
use crate::infrastructure::rate_limiter::RateLimitConfig;

/// Environment variable holding the administrative secret
pub const ADMIN_SECRET_ENV: &str = "ADMIN_SECRET";

/// Environment variable overriding the listen port
pub const PORT_ENV: &str = "PORT";

/// Environment variable with the PostgreSQL connection URL
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Key issuance and validation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Readable prefix of generated keys
    pub prefix: String,
    /// Random bytes per key (minimum 8)
    pub key_bytes: usize,
    pub default_ttl_hours: f64,
    pub max_ttl_hours: f64,
    /// Identity attributes that must be present and must match
    pub identity_attributes: Vec<String>,
    /// Seconds between expired-key purges; 0 disables the sweeper
    pub sweep_interval_secs: u64,
    /// Returned to clients whose key validated
    pub script_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            prefix: "KEY".to_string(),
            key_bytes: DEFAULT_KEY_BYTES,
            default_ttl_hours: DEFAULT_TTL_HOURS,
            max_ttl_hours: MAX_TTL_HOURS,
            identity_attributes: DEFAULT_IDENTITY_ATTRIBUTES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sweep_interval_secs: 0,
            script_url: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: None,
            max_connections: 10,
        }
    }
}

impl KeysConfig {
    pub fn identity_policy(&self) -> Result<IdentityPolicy, DomainError> {
        IdentityPolicy::new(self.identity_attributes.iter().cloned())
    }

    pub fn ttl_policy(&self) -> Result<TtlPolicy, DomainError> {
        TtlPolicy::new(self.default_ttl_hours, self.max_ttl_hours)
    }

    pub fn generator(&self) -> Result<KeyGenerator, DomainError> {
        KeyGenerator::new(self.prefix.trim()).with_key_bytes(self.key_bytes)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("keys.identity_attributes")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: Self = config.try_deserialize()?;
        app_config.apply_env_overrides(|name| std::env::var(name).ok())?;

        Ok(app_config)
    }

    /// Apply the plain `PORT` and `DATABASE_URL` variables on top of the layered sources
    fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), config::ConfigError> {
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port.trim().parse().map_err(|_| {
                config::ConfigError::Message(format!("{} must be a port number, got '{}'", PORT_ENV, port))
            })?;
        }

        if self.storage.database_url.is_none() {
            self.storage.database_url = lookup(DATABASE_URL_ENV);
        }

        Ok(())
    }

    /// Check every section that can be misconfigured
    pub fn validate(&self) -> Result<(), DomainError> {
        self.keys.identity_policy()?;
        self.keys.ttl_policy()?;
        self.keys.generator()?;

        if self.rate_limit.enabled && self.rate_limit.requests_per_minute == 0 {
            return Err(DomainError::configuration(
                "rate_limit.requests_per_minute must be positive when rate limiting is enabled",
            ));
        }

        if self.storage.backend == StorageBackend::Postgres && self.storage.database_url.is_none() {
            return Err(DomainError::configuration(format!(
                "The postgres storage backend needs storage.database_url or {}",
                DATABASE_URL_ENV
            )));
        }

        Ok(())
    }
}

/// Read the administrative secret, failing when it is unset or blank
pub fn admin_secret_from_env() -> anyhow::Result<String> {
    match std::env::var(ADMIN_SECRET_ENV) {
        Ok(secret) if !secret.trim().is_empty() => Ok(secret),
        _ => Err(anyhow::anyhow!(
            "{} environment variable must be set",
            ADMIN_SECRET_ENV
        )),
    }
}
