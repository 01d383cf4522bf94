//! Domain layer - Core business logic and entities

pub mod access_key;
pub mod clock;
pub mod error;

pub use access_key::{
    BindVerdict, Identity, IdentityPolicy, InsertOutcome, KeyRecord, KeyRepository, KeyState,
    RejectReason, ValidationOutcome,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::DomainError;
