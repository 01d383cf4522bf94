//! Key service
//!
//! Policy layer over [`KeyStore`]: the admin gate and TTL rules for issuance,
//! input checks and verdict mapping for validation.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::domain::DomainError;
use crate::domain::access_key::{
    BindVerdict, Identity, IdentityPolicy, RejectReason, ValidationOutcome,
};

use super::admin_secret::AdminSecret;
use super::store::KeyStore;

/// Default key lifetime
pub const DEFAULT_TTL_HOURS: f64 = 24.0;

/// Longest lifetime an issued key may have (one year)
pub const MAX_TTL_HOURS: f64 = 24.0 * 365.0;

/// Ceiling for a configured maximum lifetime (100 years)
pub const TTL_CEILING_HOURS: f64 = 24.0 * 365.0 * 100.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Lifetime rules for issued keys
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TtlPolicy {
    pub default_hours: f64,
    pub max_hours: f64,
}

impl TtlPolicy {
    pub fn new(default_hours: f64, max_hours: f64) -> Result<Self, DomainError> {
        let policy = Self {
            default_hours,
            max_hours,
        };

        if !max_hours.is_finite() || max_hours <= 0.0 {
            return Err(DomainError::configuration(
                "Maximum key lifetime must be a positive number of hours",
            ));
        }

        if max_hours > TTL_CEILING_HOURS {
            return Err(DomainError::configuration(format!(
                "Maximum key lifetime cannot exceed {} hours",
                TTL_CEILING_HOURS
            )));
        }

        policy.resolve(None).map_err(|e| {
            DomainError::configuration(format!("Invalid default key lifetime: {}", e))
        })?;

        Ok(policy)
    }

    /// Turn a requested lifetime in hours into a duration, rejecting bad values
    pub fn resolve(&self, requested_hours: Option<f64>) -> Result<Duration, DomainError> {
        let hours = requested_hours.unwrap_or(self.default_hours);

        if !hours.is_finite() || hours <= 0.0 {
            return Err(DomainError::validation(
                "expires_in_hours must be a positive number",
            ));
        }

        if hours > self.max_hours {
            return Err(DomainError::validation(format!(
                "expires_in_hours cannot exceed {}",
                self.max_hours
            )));
        }

        let millis = (hours * MILLIS_PER_HOUR).round() as i64;

        if millis <= 0 {
            return Err(DomainError::validation(
                "expires_in_hours is too small to produce a usable key",
            ));
        }

        Ok(Duration::milliseconds(millis))
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            default_hours: DEFAULT_TTL_HOURS,
            max_hours: MAX_TTL_HOURS,
        }
    }
}

/// A freshly issued key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedKey {
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues keys and validates them against client identities
#[derive(Debug, Clone)]
pub struct KeyService {
    store: KeyStore,
    admin_secret: AdminSecret,
    identity_policy: IdentityPolicy,
    ttl_policy: TtlPolicy,
}

impl KeyService {
    /// Create a service with the default identity and TTL policies
    pub fn new(store: KeyStore, admin_secret: AdminSecret) -> Self {
        Self {
            store,
            admin_secret,
            identity_policy: IdentityPolicy::default(),
            ttl_policy: TtlPolicy::default(),
        }
    }

    /// Use a custom identity policy
    pub fn with_identity_policy(mut self, policy: IdentityPolicy) -> Self {
        self.identity_policy = policy;
        self
    }

    /// Use a custom TTL policy
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    pub fn identity_policy(&self) -> &IdentityPolicy {
        &self.identity_policy
    }

    /// Check an admin credential without touching the store
    pub fn authorize(&self, credential: Option<&str>) -> Result<(), DomainError> {
        let Some(credential) = credential else {
            warn!("Key issuance rejected: missing admin credential");
            return Err(DomainError::unauthorized("missing admin credential"));
        };

        if !self.admin_secret.verify(credential) {
            warn!("Key issuance rejected: invalid admin credential");
            return Err(DomainError::unauthorized("invalid admin credential"));
        }

        Ok(())
    }

    /// Mint a new unbound key
    ///
    /// The credential is checked before anything else; a bad credential never
    /// touches the store.
    pub async fn issue_key(
        &self,
        credential: Option<&str>,
        ttl_hours: Option<f64>,
    ) -> Result<IssuedKey, DomainError> {
        self.authorize(credential)?;

        let ttl = self.ttl_policy.resolve(ttl_hours)?;
        let record = self.store.create(ttl).await?;

        info!(
            expires_at = %record.expires_at(),
            ttl_minutes = ttl.num_minutes(),
            "Access key issued"
        );

        Ok(IssuedKey {
            key: record.key().to_string(),
            expires_at: record.expires_at(),
        })
    }

    /// Validate a key for a client identity, binding it on first use
    pub async fn validate_key(
        &self,
        key: Option<&str>,
        identity: Option<&Identity>,
    ) -> Result<ValidationOutcome, DomainError> {
        let key = match key.map(str::trim) {
            Some(k) if !k.is_empty() => k,
            _ => {
                debug!("Validation rejected: missing key");
                return Ok(ValidationOutcome::rejected(RejectReason::MalformedInput));
            }
        };

        let Some(identity) = identity else {
            debug!("Validation rejected: missing identity");
            return Ok(ValidationOutcome::rejected(RejectReason::MalformedInput));
        };

        let missing = self.identity_policy.missing(identity);
        if !missing.is_empty() {
            debug!(missing = ?missing, "Validation rejected: incomplete identity");
            return Ok(ValidationOutcome::rejected(RejectReason::MalformedInput));
        }

        let verdict = self
            .store
            .try_bind_or_match(key, identity, &self.identity_policy)
            .await?;

        match verdict {
            BindVerdict::Bound { first: true, .. } => info!("Access key bound to identity"),
            BindVerdict::Conflict => warn!("Access key presented by a different identity"),
            _ => debug!(verdict = ?verdict, "Access key validated"),
        }

        Ok(verdict.into())
    }

    /// Remove expired records, returning how many were removed
    pub async fn purge_expired(&self) -> Result<usize, DomainError> {
        self.store.purge_expired().await
    }
}
