use moka::sync::Cache;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::models::error::ApiError;

/// Fixed-window per-principal rate limiter for the mutation surface.
///
/// Counters live in a TTL cache, so each principal's window resets a minute
/// after its first request in the window.
pub struct RateLimiter {
    hits: Cache<String, Arc<AtomicU32>>,
    max_per_window: u32,
}

impl RateLimiter {
    pub fn new(max_per_window: u32) -> Self {
        Self {
            hits: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(Duration::from_secs(60))
                .build(),
            max_per_window,
        }
    }

    /// Count one request against `key`, failing once the window is spent.
    pub fn check(&self, key: &str) -> Result<(), ApiError> {
        let counter = self
            .hits
            .get_with(key.to_string(), || Arc::new(AtomicU32::new(0)));
        let used = counter.fetch_add(1, Ordering::Relaxed);
        if used >= self.max_per_window {
            warn!("Rate limit exceeded for principal {}", key);
            return Err(ApiError::too_many_requests(
                "too many change requests, slow down",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_window_budget() {
        let limiter = RateLimiter::new(3);
        assert!(limiter.check("alice").is_ok());
        assert!(limiter.check("alice").is_ok());
        assert!(limiter.check("alice").is_ok());
        assert!(limiter.check("alice").is_err());
    }

    #[test]
    fn principals_are_counted_separately() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.check("alice").is_ok());
        assert!(limiter.check("bob").is_ok());
        assert!(limiter.check("alice").is_err());
    }
}
