//! Client identity (fingerprint) and the policy used to compare identities

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

/// Attribute names the original clients send in their fingerprint
pub const DEFAULT_IDENTITY_ATTRIBUTES: [&str; 3] = ["userid", "placeid", "executor"];

/// A client fingerprint: named attributes mapped to string values
///
/// Scalar JSON values are stringified on the way in (`123` and `"123"` are
/// the same attribute value); `null`, arrays and nested objects are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>", into = "BTreeMap<String, String>")]
pub struct Identity {
    attributes: BTreeMap<String, String>,
}

impl Identity {
    /// Create an empty identity
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Build an identity from an arbitrary JSON value
    ///
    /// Returns `None` unless the value is an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<BTreeMap<String, Value>>()
                    .into(),
            ),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

impl From<BTreeMap<String, Value>> for Identity {
    fn from(raw: BTreeMap<String, Value>) -> Self {
        let attributes = raw
            .into_iter()
            .filter_map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null | Value::Array(_) | Value::Object(_) => return None,
                };
                Some((name, value))
            })
            .collect();

        Self { attributes }
    }
}

impl From<Identity> for BTreeMap<String, String> {
    fn from(identity: Identity) -> Self {
        identity.attributes
    }
}

/// The set of identity attributes that decide whether two identities match
///
/// Every attribute named here is required on validation and must be equal
/// between the bound identity and the presented one. Anything else the client
/// sends is kept on the record but never compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPolicy {
    attributes: Vec<String>,
}

impl IdentityPolicy {
    /// Create a policy from attribute names (trimmed, deduplicated, non-empty)
    pub fn new(
        attributes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, DomainError> {
        let mut names: Vec<String> = Vec::new();

        for name in attributes {
            let name = name.into().trim().to_string();

            if name.is_empty() {
                return Err(DomainError::configuration(
                    "Identity attribute names cannot be empty",
                ));
            }

            if !names.contains(&name) {
                names.push(name);
            }
        }

        if names.is_empty() {
            return Err(DomainError::configuration(
                "Identity policy needs at least one attribute",
            ));
        }

        Ok(Self { attributes: names })
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Significant attributes the identity does not carry
    pub fn missing<'a>(&'a self, identity: &Identity) -> Vec<&'a str> {
        self.attributes
            .iter()
            .filter(|name| identity.get(name).is_none_or(|v| v.is_empty()))
            .map(String::as_str)
            .collect()
    }

    /// Whether `presented` is the same client as `bound`
    pub fn matches(&self, bound: &Identity, presented: &Identity) -> bool {
        self.attributes
            .iter()
            .all(|name| match (bound.get(name), presented.get(name)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            })
    }
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self {
            attributes: DEFAULT_IDENTITY_ATTRIBUTES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
