//! Lenient JSON body parsing

use axum::http::StatusCode;
use serde::de::DeserializeOwned;

use super::error::{ApiError, ApiErrorType};

/// Parse an optional JSON body
///
/// An empty (or whitespace-only) body yields `None`. The Content-Type header
/// is not required, since admin tooling commonly posts with bare `curl -d`.
/// Malformed JSON becomes an API-format error: 400 for a syntax error, 422
/// when the shape does not fit.
pub fn parse_optional_json<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(body).map(Some).map_err(|e| {
        let (status, message) = if e.is_data() {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid JSON data: {}", e),
            )
        } else {
            (StatusCode::BAD_REQUEST, format!("Invalid JSON syntax: {}", e))
        };

        ApiError::new(status, ApiErrorType::InvalidRequestError, message)
            .with_code("json_parse_error")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestStruct {
        hours: f64,
    }

    #[test]
    fn test_empty_body_is_none() {
        assert_eq!(parse_optional_json::<TestStruct>(b"").unwrap(), None);
        assert_eq!(parse_optional_json::<TestStruct>(b"  \n").unwrap(), None);
    }

    #[test]
    fn test_valid_body() {
        let parsed = parse_optional_json::<TestStruct>(br#"{"hours": 2}"#).unwrap();
        assert_eq!(parsed, Some(TestStruct { hours: 2.0 }));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_optional_json::<TestStruct>(b"{hours").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.response.error.message.starts_with("Invalid JSON syntax"));
        assert_eq!(err.response.error.code.as_deref(), Some("json_parse_error"));
    }

    #[test]
    fn test_data_error() {
        let err = parse_optional_json::<TestStruct>(br#"{"hours": "two"}"#).unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
