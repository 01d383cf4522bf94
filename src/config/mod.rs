//! Application configuration

mod app_config;

pub use app_config::{
    ADMIN_SECRET_ENV, AppConfig, DATABASE_URL_ENV, KeysConfig, LogFormat, LoggingConfig,
    PORT_ENV, ServerConfig, StorageBackend, StorageConfig, admin_secret_from_env,
};
