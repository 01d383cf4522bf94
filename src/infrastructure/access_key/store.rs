//! Key store
//!
//! Wraps a [`KeyRepository`] backend with key generation and the clock. This
//! is the only path through which records are created or bound.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::domain::access_key::{
    BindVerdict, Identity, IdentityPolicy, InsertOutcome, KeyRecord, KeyRepository,
};
use crate::domain::{Clock, DomainError, SystemClock};

use super::generator::KeyGenerator;

/// Generation attempts before giving up on finding an unused key string
pub const MAX_GENERATION_ATTEMPTS: u32 = 5;

/// Single source of truth for key records
#[derive(Clone)]
pub struct KeyStore {
    repository: Arc<dyn KeyRepository>,
    generator: KeyGenerator,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("generator", &self.generator)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl KeyStore {
    /// Create a store over `repository` using the system clock
    pub fn new(repository: Arc<dyn KeyRepository>) -> Self {
        Self {
            repository,
            generator: KeyGenerator::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a custom generator
    pub fn with_generator(mut self, generator: KeyGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Use a custom clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create an unbound record living for `ttl`
    ///
    /// A generated key that is already taken is discarded and regenerated;
    /// existing records are never overwritten.
    pub async fn create(&self, ttl: Duration) -> Result<KeyRecord, DomainError> {
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let record = KeyRecord::new(self.generator.generate(), self.clock.now(), ttl)?;

            match self.repository.insert(record.clone()).await? {
                InsertOutcome::Inserted => {
                    debug!(attempt, expires_at = %record.expires_at(), "Key record created");
                    return Ok(record);
                }
                InsertOutcome::Collision => {
                    warn!(attempt, "Generated key collided with an existing key, retrying");
                }
            }
        }

        Err(DomainError::exhausted_keyspace(MAX_GENERATION_ATTEMPTS))
    }

    /// Bind the key to `identity` if unbound, else compare against the bound identity
    pub async fn try_bind_or_match(
        &self,
        key: &str,
        identity: &Identity,
        policy: &IdentityPolicy,
    ) -> Result<BindVerdict, DomainError> {
        self.repository
            .try_bind_or_match(key, identity, policy, self.clock.now())
            .await
    }

    /// Informational lookup; never use the result to decide a bind
    pub async fn get(&self, key: &str) -> Result<Option<KeyRecord>, DomainError> {
        self.repository.get(key).await
    }

    /// Remove records that are past their expiry
    pub async fn purge_expired(&self) -> Result<usize, DomainError> {
        self.repository.purge_expired(self.clock.now()).await
    }

    pub async fn count(&self) -> Result<usize, DomainError> {
        self.repository.count().await
    }

    pub async fn ping(&self) -> Result<(), DomainError> {
        self.repository.ping().await
    }
}
