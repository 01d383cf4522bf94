//! Wire types for key issuance and validation

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::access_key::{Identity, RejectReason, ValidationOutcome};

/// Body of `POST /genkey`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenKeyRequest {
    #[serde(default, alias = "expires_in")]
    pub expires_in_hours: Option<f64>,
}

/// Response of `POST /genkey`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenKeyResponse {
    pub key: String,
    /// Expiry as epoch milliseconds
    pub expires: i64,
}

/// Body of `POST /validate`
///
/// Parsed leniently: a body that does not fit this shape is treated as
/// missing fields rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, alias = "fingerprint")]
    pub identity: Option<Value>,
}

impl ValidateRequest {
    pub fn from_slice(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.as_ref().and_then(Identity::from_value)
    }
}

/// Response of `POST /validate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    /// Expiry as epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_use: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_url: Option<String>,
}

impl ValidateResponse {
    pub fn from_outcome(outcome: ValidationOutcome, script_url: Option<&str>) -> Self {
        Self {
            valid: outcome.valid,
            reason: outcome.reason,
            expires: outcome.expires_at.map(|t| t.timestamp_millis()),
            first_use: outcome.first_use,
            script_url: if outcome.valid {
                script_url.map(str::to_string)
            } else {
                None
            },
        }
    }
}
