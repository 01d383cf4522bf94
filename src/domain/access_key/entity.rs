//! Key record entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::identity::Identity;
use crate::domain::DomainError;

/// Observable lifecycle state of a key at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyState {
    /// Within its window and not yet claimed
    UnboundValid,
    /// Within its window and bound to an identity
    BoundValid,
    /// Past its expiry; terminal
    Invalid,
}

/// One issued access key
///
/// `key`, `created_at` and `expires_at` are fixed at construction.
/// `bound_identity` can be set once, through [`KeyRecord::bind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    key: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bound_identity: Option<Identity>,
}

impl KeyRecord {
    /// Create an unbound record valid for `ttl` from `created_at`
    ///
    /// Fails when the expiry falls outside the representable time range.
    pub fn new(
        key: impl Into<String>,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, DomainError> {
        let expires_at = created_at
            .checked_add_signed(ttl)
            .ok_or_else(|| DomainError::validation("Key lifetime is out of range"))?;

        Ok(Self {
            key: key.into(),
            created_at,
            expires_at,
            bound_identity: None,
        })
    }

    /// Rebuild a record loaded from persistent storage
    pub fn from_parts(
        key: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        bound_identity: Option<Identity>,
    ) -> Self {
        Self {
            key: key.into(),
            created_at,
            expires_at,
            bound_identity,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn bound_identity(&self) -> Option<&Identity> {
        self.bound_identity.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.bound_identity.is_some()
    }

    /// Expired once `now` reaches `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> KeyState {
        if self.is_expired_at(now) {
            KeyState::Invalid
        } else if self.is_bound() {
            KeyState::BoundValid
        } else {
            KeyState::UnboundValid
        }
    }

    /// Bind the record to `identity` if it is still unbound
    ///
    /// Returns `false` and leaves the record untouched when already bound.
    pub fn bind(&mut self, identity: Identity) -> bool {
        if self.bound_identity.is_some() {
            return false;
        }

        self.bound_identity = Some(identity);
        true
    }
}
