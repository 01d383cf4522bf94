//! Access key infrastructure
//!
//! Key generation, repository backends, the key store and the key service.

mod admin_secret;
mod generator;
mod in_memory;
mod postgres;
mod service;
mod store;
mod sweeper;

pub use admin_secret::AdminSecret;
pub use generator::{DEFAULT_KEY_BYTES, KeyGenerator, MIN_KEY_BYTES};
pub use in_memory::InMemoryKeyRepository;
pub use postgres::{PostgresConfig, PostgresKeyRepository};
pub use service::{DEFAULT_TTL_HOURS, IssuedKey, KeyService, MAX_TTL_HOURS, TtlPolicy};
pub use store::{KeyStore, MAX_GENERATION_ATTEMPTS};
pub use sweeper::spawn_expired_key_sweeper;
