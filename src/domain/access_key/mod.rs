//! Access key domain
//!
//! Key records, client identities, the identity matching policy and the
//! verdicts produced when a key is validated.

mod entity;
mod identity;
mod repository;
mod verdict;

pub use entity::{KeyRecord, KeyState};
pub use identity::{DEFAULT_IDENTITY_ATTRIBUTES, Identity, IdentityPolicy};
pub use repository::{InsertOutcome, KeyRepository, bind_or_match};
pub use verdict::{BindVerdict, RejectReason, ValidationOutcome};

#[cfg(test)]
pub use repository::MockKeyRepository;
