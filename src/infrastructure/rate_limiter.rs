//! Rate limiter implementation
//!
//! Sliding one-minute window per client, used to throttle the unauthenticated
//! validation endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(60);

/// Rate limit configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Maximum requests per client per minute
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Key clients by `X-Forwarded-For`/`X-Real-IP` instead of the peer
    /// address. Only safe behind a proxy that overwrites those headers.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_requests_per_minute() -> u32 {
    60
}

impl RateLimitConfig {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            enabled: true,
            requests_per_minute,
            trust_forwarded_headers: false,
        }
    }

    /// Trust proxy-supplied client addresses
    pub fn with_trusted_forwarded_headers(mut self) -> Self {
        self.trust_forwarded_headers = true;
        self
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            requests_per_minute: default_requests_per_minute(),
            trust_forwarded_headers: false,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(default_requests_per_minute())
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Total limit for the window
    pub limit: u32,
    /// Time until the limit resets (in seconds)
    pub reset_in_seconds: u64,
}

/// Per-client rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    /// Request timestamps per client
    records: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    /// Cleanup interval
    cleanup_interval: Duration,
    /// Last cleanup time
    last_cleanup: Arc<RwLock<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            records: Arc::new(RwLock::new(HashMap::new())),
            cleanup_interval: Duration::from_secs(300),
            last_cleanup: Arc::new(RwLock::new(Instant::now())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check whether `client` may make another request, recording it if so
    pub async fn check_and_record(&self, client: &str) -> RateLimitResult {
        let limit = self.config.requests_per_minute;

        if !self.config.enabled {
            return RateLimitResult {
                allowed: true,
                remaining: limit,
                limit,
                reset_in_seconds: 0,
            };
        }

        self.maybe_cleanup().await;

        let now = Instant::now();
        let window_start = now.checked_sub(WINDOW).unwrap_or(now);

        let mut records = self.records.write().await;
        let timestamps = records.entry(client.to_string()).or_default();
        timestamps.retain(|t| *t > window_start);

        let in_window = timestamps.len() as u32;

        if in_window >= limit {
            let reset_in = timestamps
                .iter()
                .min()
                .map(|oldest| {
                    let elapsed = now.duration_since(*oldest);
                    WINDOW.as_secs().saturating_sub(elapsed.as_secs())
                })
                .unwrap_or(WINDOW.as_secs());

            return RateLimitResult {
                allowed: false,
                remaining: 0,
                limit,
                reset_in_seconds: reset_in,
            };
        }

        timestamps.push(now);

        RateLimitResult {
            allowed: true,
            remaining: limit.saturating_sub(in_window + 1),
            limit,
            reset_in_seconds: WINDOW.as_secs(),
        }
    }

    async fn maybe_cleanup(&self) {
        let should_cleanup = {
            let last = self.last_cleanup.read().await;
            last.elapsed() >= self.cleanup_interval
        };

        if should_cleanup {
            let mut last = self.last_cleanup.write().await;
            *last = Instant::now();

            let now = Instant::now();
            let cutoff = now.checked_sub(WINDOW).unwrap_or(now);

            let mut records = self.records.write().await;

            for timestamps in records.values_mut() {
                timestamps.retain(|t| *t > cutoff);
            }

            records.retain(|_, v| !v.is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_allows_first_request() {
        let limiter = RateLimiter::new(RateLimitConfig::new(10));

        let result = limiter.check_and_record("10.0.0.1").await;

        assert!(result.allowed);
        assert_eq!(result.remaining, 9);
        assert_eq!(result.limit, 10);
    }

    #[tokio::test]
    async fn test_rate_limiter_blocks_over_limit() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2));

        limiter.check_and_record("10.0.0.1").await;
        limiter.check_and_record("10.0.0.1").await;

        let result = limiter.check_and_record("10.0.0.1").await;

        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
        assert!(result.reset_in_seconds <= 60);
    }

    #[tokio::test]
    async fn test_rate_limiter_different_clients() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1));

        limiter.check_and_record("10.0.0.1").await;

        // Different client should still be allowed
        let result = limiter.check_and_record("10.0.0.2").await;
        assert!(result.allowed);

        // Same client should be blocked
        let result = limiter.check_and_record("10.0.0.1").await;
        assert!(!result.allowed);
    }


    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_window_slides() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1));

        assert!(limiter.check_and_record("10.0.0.1").await.allowed);
        assert!(!limiter.check_and_record("10.0.0.1").await.allowed);

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(limiter.check_and_record("10.0.0.1").await.allowed);
    }

    #[tokio::test]
    async fn test_rate_limiter_disabled() {
        let limiter = RateLimiter::new(RateLimitConfig::disabled());

        for _ in 0..1000 {
            let result = limiter.check_and_record("10.0.0.1").await;
            assert!(result.allowed);
        }
    }
}
