//! Application state for shared services

use std::sync::Arc;

use crate::domain::DomainError;
use crate::domain::access_key::{Identity, ValidationOutcome};
use crate::infrastructure::access_key::{IssuedKey, KeyService};
use crate::infrastructure::rate_limiter::RateLimiter;

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub key_service: Arc<dyn KeyServiceTrait>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Handed to clients whose key validated
    pub script_url: Option<String>,
}

impl AppState {
    pub fn new(key_service: Arc<dyn KeyServiceTrait>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            key_service,
            rate_limiter,
            script_url: None,
        }
    }

    pub fn with_script_url(mut self, script_url: Option<String>) -> Self {
        self.script_url = script_url;
        self
    }
}

/// Trait for key service operations
#[async_trait::async_trait]
pub trait KeyServiceTrait: Send + Sync {
    fn authorize(&self, credential: Option<&str>) -> Result<(), DomainError>;

    async fn issue_key(
        &self,
        credential: Option<&str>,
        ttl_hours: Option<f64>,
    ) -> Result<IssuedKey, DomainError>;

    async fn validate_key(
        &self,
        key: Option<&str>,
        identity: Option<&Identity>,
    ) -> Result<ValidationOutcome, DomainError>;

    /// Check that the key store is reachable
    async fn ping_store(&self) -> Result<(), DomainError>;
}

#[async_trait::async_trait]
impl KeyServiceTrait for KeyService {
    fn authorize(&self, credential: Option<&str>) -> Result<(), DomainError> {
        KeyService::authorize(self, credential)
    }

    async fn issue_key(
        &self,
        credential: Option<&str>,
        ttl_hours: Option<f64>,
    ) -> Result<IssuedKey, DomainError> {
        KeyService::issue_key(self, credential, ttl_hours).await
    }

    async fn validate_key(
        &self,
        key: Option<&str>,
        identity: Option<&Identity>,
    ) -> Result<ValidationOutcome, DomainError> {
        KeyService::validate_key(self, key, identity).await
    }

    async fn ping_store(&self) -> Result<(), DomainError> {
        self.store().ping().await
    }
}
