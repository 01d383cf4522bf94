//! Outcomes of the bind-or-match step and of key validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of the store's atomic bind-or-match primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindVerdict {
    /// No record for the key
    NotFound,
    /// The record exists but its window has closed
    Expired,
    /// The presented identity now owns (or already owned) the key
    Bound {
        first: bool,
        expires_at: DateTime<Utc>,
    },
    /// The key is bound to a different identity
    Conflict,
}

/// Why a validation did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    #[serde(rename = "malformed input")]
    MalformedInput,
    #[serde(rename = "invalid key")]
    NotFound,
    #[serde(rename = "expired")]
    Expired,
    #[serde(rename = "bound to another identity")]
    Conflict,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedInput => "malformed input",
            Self::NotFound => "invalid key",
            Self::Expired => "expired",
            Self::Conflict => "bound to another identity",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict returned to a validating client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub reason: Option<RejectReason>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Set on success: whether this call performed the binding
    pub first_use: Option<bool>,
}

impl ValidationOutcome {
    pub fn accepted(expires_at: DateTime<Utc>, first_use: bool) -> Self {
        Self {
            valid: true,
            reason: None,
            expires_at: Some(expires_at),
            first_use: Some(first_use),
        }
    }

    pub fn rejected(reason: RejectReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            expires_at: None,
            first_use: None,
        }
    }
}

impl From<BindVerdict> for ValidationOutcome {
    fn from(verdict: BindVerdict) -> Self {
        match verdict {
            BindVerdict::NotFound => Self::rejected(RejectReason::NotFound),
            BindVerdict::Expired => Self::rejected(RejectReason::Expired),
            BindVerdict::Conflict => Self::rejected(RejectReason::Conflict),
            BindVerdict::Bound { first, expires_at } => Self::accepted(expires_at, first),
        }
    }
}
