//! Request/response types shared by the HTTP handlers

pub mod error;
pub mod json;
pub mod keys;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::parse_optional_json;
pub use keys::{GenKeyRequest, GenKeyResponse, ValidateRequest, ValidateResponse};
