use ahash::AHashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{RateLimitResult, RateLimiter};
use crate::config::RateLimitConfig;

/// Manager for rate limiters (global and per-endpoint)
///
/// This struct holds rate limiters for:
/// - Global rate limiting (applies to every limited endpoint unless overridden)
/// - Per-endpoint rate limiting (specific limits for individual request paths)
///
/// Health checks never reach the manager and never count against any budget.
pub struct RateLimitManager {
    /// Global rate limiter (optional)
    global: Option<Arc<RateLimiter>>,
    /// Per-endpoint rate limiters. `None` marks an endpoint explicitly exempted
    /// from a globally enabled limit.
    endpoint_limiters: AHashMap<String, Option<Arc<RateLimiter>>>,
}

impl RateLimitManager {
    /// Create a new rate limit manager from configuration
    pub fn new(config: &RateLimitConfig) -> Self {
        let global = if config.enabled {
            Some(Arc::new(RateLimiter::with_algorithm(
                config.algorithm,
                config.limit,
                Duration::from_secs(config.window_seconds),
            )))
        } else {
            None
        };

        let mut endpoint_limiters = AHashMap::new();
        for endpoint in &config.endpoints {
            let enabled = endpoint.enabled.unwrap_or(config.enabled);
            let limiter = if enabled {
                let algorithm = endpoint.algorithm.unwrap_or(config.algorithm);
                let limit = endpoint.limit.unwrap_or(config.limit);
                let window =
                    Duration::from_secs(endpoint.window_seconds.unwrap_or(config.window_seconds));
                Some(Arc::new(RateLimiter::with_algorithm(algorithm, limit, window)))
            } else {
                None
            };
            endpoint_limiters.insert(endpoint.path.clone(), limiter);
        }

        Self { global, endpoint_limiters }
    }

    /// Limiter that governs `endpoint`, if any
    pub fn limiter_for(&self, endpoint: &str) -> Option<&Arc<RateLimiter>> {
        match self.endpoint_limiters.get(endpoint) {
            Some(limiter) => limiter.as_ref(),
            None => self.global.as_ref(),
        }
    }

    /// Check (and record) a request for `key` on `endpoint` at `now`
    ///
    /// # Returns
    /// * `RateLimitResult::Allowed` if request is permitted
    /// * `RateLimitResult::Limited` if request exceeds rate limit
    pub fn check_at(&self, key: &str, endpoint: &str, now: Instant) -> RateLimitResult {
        match self.limiter_for(endpoint) {
            Some(limiter) => limiter.admit(key, now),
            None => RateLimitResult::Allowed { remaining: u32::MAX, limit: u32::MAX },
        }
    }

    /// Check (and record) a request for `key` on `endpoint` now
    pub fn check(&self, key: &str, endpoint: &str) -> RateLimitResult {
        self.check_at(key, endpoint, Instant::now())
    }

    pub fn is_enabled(&self) -> bool {
        self.global.is_some() || self.endpoint_limiters.values().any(Option::is_some)
    }

    /// Evict expired entries from every limiter. Returns the total evicted.
    pub fn sweep(&self, now: Instant) -> usize {
        self.limiters().map(|limiter| limiter.sweep(now)).sum()
    }

    /// Total keys holding state across every limiter
    pub fn tracked_keys(&self) -> usize {
        self.limiters().map(|limiter| limiter.tracked_keys()).sum()
    }

    fn limiters(&self) -> impl Iterator<Item = &Arc<RateLimiter>> {
        self.global
            .iter()
            .chain(self.endpoint_limiters.values().flatten())
    }

    /// Periodically evict expired entries until `shutdown` is cancelled.
    pub async fn run_sweeper(self: Arc<Self>, every: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = self.sweep(Instant::now());
                    if evicted > 0 {
                        debug!(evicted, tracked = self.tracked_keys(), "rate limit sweep");
                    }
                }
            }
        }
    }
}
