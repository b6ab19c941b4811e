//! Exact per-key rate limiter.
//!
//! This module wraps the per-key window table with the admission policy and
//! the result type returned to callers.

use std::time::{Duration, Instant};

use super::table::{WindowTable, SHARDS};
use super::window::{Admission, WindowEntry};
use crate::config::RateLimitAlgorithm;

/// Result of a rate limit check.
///
/// Being limited is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed to proceed.
    Allowed {
        /// Maximum number of requests allowed in the window
        limit: u32,
        /// Number of requests remaining in the current window
        remaining: u32,
    },
    /// Request is rate limited and should be rejected.
    Limited {
        /// Maximum number of requests allowed in the window
        limit: u32,
        /// Number of requests remaining (always 0)
        remaining: u32,
        /// Time until a new request would be admitted
        reset_after: Duration,
    },
}

impl RateLimitResult {
    /// Returns true if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Returns true if the request is limited.
    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitResult::Limited { .. })
    }

    /// Get the limit value.
    pub fn limit(&self) -> u32 {
        match self {
            RateLimitResult::Allowed { limit, .. } => *limit,
            RateLimitResult::Limited { limit, .. } => *limit,
        }
    }

    /// Get the remaining count.
    pub fn remaining(&self) -> u32 {
        match self {
            RateLimitResult::Allowed { remaining, .. } => *remaining,
            RateLimitResult::Limited { remaining, .. } => *remaining,
        }
    }

    /// Get the reset duration if limited.
    pub fn reset_after(&self) -> Option<Duration> {
        match self {
            RateLimitResult::Limited { reset_after, .. } => Some(*reset_after),
            _ => None,
        }
    }

    /// Whole seconds a client should wait before retrying, rounded up and never
    /// below one second. `None` when allowed.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.reset_after().map(|d| {
            let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
            secs.max(1)
        })
    }
}

/// A rate limiter that enforces an exact request limit per key over a time window.
///
/// The check and the update for one key happen under a single shard lock, so
/// concurrent requests bearing the same key can never both take the last slot.
///
/// # Example
/// ```ignore
/// use std::time::{Duration, Instant};
/// use smartdocs_lib::security::rate_limit::{RateLimiter, RateLimitResult};
///
/// let limiter = RateLimiter::new(10, Duration::from_secs(60));
///
/// match limiter.admit("client-fingerprint", Instant::now()) {
///     RateLimitResult::Allowed { remaining, .. } => {
///         println!("Request allowed, {} remaining", remaining);
///     }
///     RateLimitResult::Limited { reset_after, .. } => {
///         println!("Rate limited, retry after {:?}", reset_after);
///     }
/// }
/// ```
pub struct RateLimiter {
    table: WindowTable,
    algorithm: RateLimitAlgorithm,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    /// Create a fixed-window rate limiter.
    ///
    /// # Parameters
    /// - `limit`: Maximum number of requests per key in one window
    /// - `window`: Window length
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_algorithm(RateLimitAlgorithm::Fixed, limit, window)
    }

    /// Create a rate limiter using the given counting algorithm.
    pub fn with_algorithm(algorithm: RateLimitAlgorithm, limit: u32, window: Duration) -> Self {
        Self { table: WindowTable::new(SHARDS), algorithm, limit, window }
    }

    /// Check if a request at `now` should be allowed, recording it when it is.
    ///
    /// Any string is a valid key, including the empty string.
    pub fn admit(&self, key: &str, now: Instant) -> RateLimitResult {
        let algorithm = self.algorithm;
        let admission = self.table.with_entry(
            key,
            || WindowEntry::new(algorithm, now),
            |entry| entry.admit(now, self.limit, self.window),
        );
        self.result(admission)
    }

    /// Same as [`admit`](Self::admit) at the current instant.
    pub fn check(&self, key: &str) -> RateLimitResult {
        self.admit(key, Instant::now())
    }

    /// Check rate limit without recording the request.
    ///
    /// Useful for read-only checks, e.g. reporting the remaining budget.
    pub fn peek(&self, key: &str, now: Instant) -> RateLimitResult {
        let admission = self.table.inspect(key, |entry| match entry {
            Some(entry) => entry.peek(now, self.limit, self.window),
            None => Admission::Admitted { used: 0 },
        });
        self.result(admission)
    }

    /// Evict entries whose window elapsed with no traffic.
    ///
    /// Returns the number of evicted keys.
    pub fn sweep(&self, now: Instant) -> usize {
        let window = self.window;
        self.table
            .retain_live(now, |entry, now| entry.is_expired(now, window))
    }

    /// Number of keys currently holding state.
    pub fn tracked_keys(&self) -> usize {
        self.table.len()
    }

    /// Get the configured maximum requests per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Get the configured window duration.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Get the configured counting algorithm.
    pub fn algorithm(&self) -> RateLimitAlgorithm {
        self.algorithm
    }

    fn result(&self, admission: Admission) -> RateLimitResult {
        match admission {
            Admission::Admitted { used } => RateLimitResult::Allowed {
                limit: self.limit,
                remaining: self.limit.saturating_sub(used),
            },
            Admission::Rejected { retry_after } => {
                RateLimitResult::Limited { limit: self.limit, remaining: 0, reset_after: retry_after }
            }
        }
    }
}
