// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Rate limiting for login attempts.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::config::RateLimitSettings;

/// How long an idle failure record is kept
const ENTRY_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Entry in the rate limit map
#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Number of failed attempts
    failed_attempts: u32,
    /// Time of the last failed attempt
    last_failure: Instant,
    /// When the lockout expires
    lockout_expiry: Option<Instant>,
}

/// Rate limiter for login attempts, keyed by client address
#[derive(Debug, Clone)]
pub struct AuthRateLimiter {
    attempts: Arc<DashMap<String, RateLimitEntry>>,
    /// Maximum number of failed attempts before lockout
    max_attempts: u32,
    /// Duration of lockout period
    lockout_duration: Duration,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout_duration,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_secs(settings.lockout_secs),
        )
    }

    /// Reserve a login attempt for `client` before its credentials are checked.
    ///
    /// Every reserved attempt counts as a failure until `record_success`
    /// clears it, so concurrent guesses cannot all slip past the limit.
    /// Returns `false` while the client is locked out.
    pub fn try_begin_attempt(&self, client: &str) -> bool {
        let now = Instant::now();

        let mut entry = self
            .attempts
            .entry(client.to_string())
            .or_insert_with(|| RateLimitEntry {
                failed_attempts: 0,
                last_failure: now,
                lockout_expiry: None,
            });

        if let Some(expiry) = entry.lockout_expiry {
            if now < expiry {
                return false;
            }
            // A finished lockout starts a fresh count
            entry.failed_attempts = 0;
            entry.lockout_expiry = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts {
            entry.lockout_expiry = Some(now + self.lockout_duration);
            warn!(
                client = %client,
                attempts = entry.failed_attempts,
                "login attempt limit reached, client locked out"
            );
        }
        true
    }

    /// Record a successful login
    pub fn record_success(&self, client: &str) {
        self.attempts.remove(client);
    }

    /// Check if a client is allowed to attempt a login
    pub fn check_rate_limit(&self, client: &str) -> bool {
        match self.attempts.get(client) {
            Some(entry) => !entry
                .lockout_expiry
                .is_some_and(|expiry| Instant::now() < expiry),
            None => true,
        }
    }

    /// Clean up expired lockouts and stale failure records
    pub fn cleanup(&self) {
        let now = Instant::now();

        self.attempts.retain(|_, entry| {
            if let Some(expiry) = entry.lockout_expiry {
                return now < expiry;
            }
            now.duration_since(entry.last_failure) < ENTRY_RETENTION
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.attempts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lockout_after_max_attempts() {
        let limiter = AuthRateLimiter::new(3, Duration::from_secs(60));

        for _ in 0..3 {
            assert!(limiter.try_begin_attempt("10.0.0.1"));
        }
        assert!(!limiter.check_rate_limit("10.0.0.1"));
        assert!(!limiter.try_begin_attempt("10.0.0.1"));

        // Other clients are unaffected
        assert!(limiter.check_rate_limit("10.0.0.2"));
        assert!(limiter.try_begin_attempt("10.0.0.2"));
    }

    #[test]
    fn test_success_clears_failures() {
        let limiter = AuthRateLimiter::new(3, Duration::from_secs(60));

        assert!(limiter.try_begin_attempt("10.0.0.1"));
        assert!(limiter.try_begin_attempt("10.0.0.1"));
        assert!(limiter.try_begin_attempt("10.0.0.1"));
        limiter.record_success("10.0.0.1");

        assert!(limiter.check_rate_limit("10.0.0.1"));
        assert!(limiter.try_begin_attempt("10.0.0.1"));
        assert!(limiter.check_rate_limit("10.0.0.1"));
    }

    #[test]
    fn test_lockout_expires() {
        let limiter = AuthRateLimiter::new(1, Duration::ZERO);

        assert!(limiter.try_begin_attempt("10.0.0.1"));
        assert!(limiter.check_rate_limit("10.0.0.1"));
        assert!(limiter.try_begin_attempt("10.0.0.1"));

        limiter.cleanup();
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_concurrent_attempts_respect_limit() {
        let limiter = AuthRateLimiter::new(3, Duration::from_secs(60));

        let granted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| scope.spawn(|| limiter.try_begin_attempt("10.0.0.1")))
                .collect();
            handles
                .into_iter()
                .map(|h| usize::from(h.join().unwrap()))
                .sum()
        });

        assert_eq!(granted, 3);
    }
}
