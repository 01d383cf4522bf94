//! API middleware components

pub mod admin_auth;
pub mod logging;
pub mod rate_limit;
pub mod security;

pub use admin_auth::{ADMIN_SECRET_HEADER, AdminCredential};
pub use logging::logging_middleware;
pub use rate_limit::rate_limit_middleware;
pub use security::{MAX_BODY_SIZE, security_headers_middleware};
