//! Infrastructure layer - Storage backends, key generation, logging

pub mod access_key;
pub mod logging;
pub mod rate_limiter;
