//! Per-client rate limiting for unauthenticated routes

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::api::types::ApiError;
use crate::infrastructure::rate_limiter::RateLimiter;

/// Reject requests from clients that exceeded their per-minute budget
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_id(&request, limiter.config().trust_forwarded_headers);
    let result = limiter.check_and_record(&client).await;

    if !result.allowed {
        warn!(client = %client, limit = result.limit, "Rate limit exceeded");
        return ApiError::rate_limited(
            format!(
                "Rate limit exceeded: {} requests per minute",
                result.limit
            ),
            result.reset_in_seconds,
        )
        .into_response();
    }

    next.run(request).await
}

/// Identify the caller by peer address.
///
/// Forwarding headers are client-controlled, so `X-Forwarded-For` (first hop)
/// and `X-Real-IP` are consulted only when `trust_forwarded` is set.
fn client_id(request: &Request<Body>, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(ip) = forwarded_client(request.headers()) {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/validate");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        request
    }

    #[test]
    fn test_client_id_ignores_forwarding_headers_by_default() {
        let request = request_with(&[
            ("x-forwarded-for", "203.0.113.7"),
            ("x-real-ip", "198.51.100.2"),
        ]);

        assert_eq!(client_id(&request, false), "192.0.2.1");
    }

    #[test]
    fn test_client_id_from_trusted_forwarded_for() {
        let request = request_with(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(client_id(&request, true), "203.0.113.7");
    }

    #[test]
    fn test_client_id_from_trusted_real_ip() {
        let request = request_with(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_id(&request, true), "198.51.100.2");
    }

    #[test]
    fn test_trusted_without_headers_falls_back_to_peer() {
        assert_eq!(client_id(&request_with(&[]), true), "192.0.2.1");
    }

    #[test]
    fn test_client_id_unknown() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_id(&request, false), "unknown");
    }
}
