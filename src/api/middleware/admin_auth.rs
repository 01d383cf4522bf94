//! Admin credential extraction
//!
//! The credential is only extracted here; the key service decides whether
//! it is correct.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

/// Header carrying the admin secret
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Extractor for the presented admin credential, if any
///
/// Read from:
/// - `X-Admin-Secret: <secret>`
/// - `Authorization: Bearer <secret>`
///
/// Headers that are not valid UTF-8 count as absent.
#[derive(Debug, Clone)]
pub struct AdminCredential(pub Option<String>);

impl<S> FromRequestParts<S> for AdminCredential
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AdminCredential(extract_admin_credential(&parts.headers)))
    }
}

fn extract_admin_credential(headers: &HeaderMap) -> Option<String> {
    if let Some(secret) = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(secret.trim().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_admin_header() {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_SECRET_HEADER, "s3cret".parse().unwrap());

        assert_eq!(extract_admin_credential(&headers), Some("s3cret".to_string()));
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer s3cret ".parse().unwrap());

        assert_eq!(extract_admin_credential(&headers), Some("s3cret".to_string()));
    }

    #[test]
    fn test_admin_header_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer from-bearer".parse().unwrap());
        headers.insert(ADMIN_SECRET_HEADER, "from-header".parse().unwrap());

        assert_eq!(
            extract_admin_credential(&headers),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn test_missing_credential() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_admin_credential(&headers), None);

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(extract_admin_credential(&headers), None);
    }
}
