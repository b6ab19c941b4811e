//! Per-key window state.
//!
//! Absence of an entry in the table is the `Empty` state. An entry is created
//! on the first request for a key and is only ever touched under its shard lock.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::RateLimitAlgorithm;

/// Outcome of one admission attempt against a single entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Admission {
    /// Admitted; `used` is the number of requests counted in the window,
    /// including this one
    Admitted { used: u32 },
    /// Rejected; the caller may retry once `retry_after` has elapsed
    Rejected { retry_after: Duration },
}

#[derive(Debug)]
pub(super) enum WindowEntry {
    Fixed { count: u32, window_start: Instant },
    Sliding { timestamps: VecDeque<Instant> },
}

impl WindowEntry {
    pub(super) fn new(algorithm: RateLimitAlgorithm, now: Instant) -> Self {
        match algorithm {
            RateLimitAlgorithm::Fixed => WindowEntry::Fixed { count: 0, window_start: now },
            RateLimitAlgorithm::Sliding => WindowEntry::Sliding { timestamps: VecDeque::new() },
        }
    }

    /// Try to admit one request at `now`, recording it when admitted.
    pub(super) fn admit(&mut self, now: Instant, limit: u32, window: Duration) -> Admission {
        match self {
            WindowEntry::Fixed { count, window_start } => {
                let elapsed = now.saturating_duration_since(*window_start);
                if elapsed >= window {
                    *count = 0;
                    *window_start = now;
                }
                if *count < limit {
                    *count = count.saturating_add(1);
                    Admission::Admitted { used: *count }
                } else {
                    let elapsed = now.saturating_duration_since(*window_start);
                    Admission::Rejected { retry_after: window.saturating_sub(elapsed) }
                }
            }
            WindowEntry::Sliding { timestamps } => {
                discard_expired(timestamps, now, window);
                if (timestamps.len() as u64) < u64::from(limit) {
                    // Callers may observe `now` slightly out of order under contention.
                    let at = timestamps.partition_point(|t| *t <= now);
                    timestamps.insert(at, now);
                    Admission::Admitted { used: timestamps.len() as u32 }
                } else {
                    Admission::Rejected { retry_after: sliding_retry_after(timestamps, now, window) }
                }
            }
        }
    }

    /// Report what `admit` would decide at `now` without recording anything.
    pub(super) fn peek(&self, now: Instant, limit: u32, window: Duration) -> Admission {
        match self {
            WindowEntry::Fixed { count, window_start } => {
                let elapsed = now.saturating_duration_since(*window_start);
                if elapsed >= window {
                    Admission::Admitted { used: 0 }
                } else if *count < limit {
                    Admission::Admitted { used: *count }
                } else {
                    Admission::Rejected { retry_after: window.saturating_sub(elapsed) }
                }
            }
            WindowEntry::Sliding { timestamps } => {
                let live: VecDeque<Instant> = timestamps
                    .iter()
                    .copied()
                    .filter(|t| now.saturating_duration_since(*t) < window)
                    .collect();
                if (live.len() as u64) < u64::from(limit) {
                    Admission::Admitted { used: live.len() as u32 }
                } else {
                    Admission::Rejected { retry_after: sliding_retry_after(&live, now, window) }
                }
            }
        }
    }

    /// True once the window has elapsed with no traffic; the entry is then
    /// equivalent to `Empty` and may be evicted.
    pub(super) fn is_expired(&self, now: Instant, window: Duration) -> bool {
        match self {
            WindowEntry::Fixed { window_start, .. } => {
                now.saturating_duration_since(*window_start) >= window
            }
            WindowEntry::Sliding { timestamps } => timestamps
                .back()
                .is_none_or(|newest| now.saturating_duration_since(*newest) >= window),
        }
    }
}

fn discard_expired(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = timestamps.front() {
        if now.saturating_duration_since(*oldest) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

fn sliding_retry_after(timestamps: &VecDeque<Instant>, now: Instant, window: Duration) -> Duration {
    timestamps
        .front()
        .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn fixed_rejects_with_time_left_in_window() {
        let t0 = Instant::now();
        let mut entry = WindowEntry::new(RateLimitAlgorithm::Fixed, t0);
        assert_eq!(entry.admit(t0, 1, WINDOW), Admission::Admitted { used: 1 });
        assert_eq!(
            entry.admit(t0 + Duration::from_secs(20), 1, WINDOW),
            Admission::Rejected { retry_after: Duration::from_secs(40) }
        );
    }

    #[test]
    fn sliding_keeps_timestamps_ordered() {
        let t0 = Instant::now();
        let mut entry = WindowEntry::new(RateLimitAlgorithm::Sliding, t0);
        entry.admit(t0 + Duration::from_secs(2), 5, WINDOW);
        entry.admit(t0, 5, WINDOW);
        entry.admit(t0 + Duration::from_secs(1), 5, WINDOW);
        match entry {
            WindowEntry::Sliding { timestamps } => {
                let ordered: Vec<_> = timestamps.iter().copied().collect();
                let mut sorted = ordered.clone();
                sorted.sort();
                assert_eq!(ordered, sorted);
            }
            WindowEntry::Fixed { .. } => panic!("expected sliding entry"),
        }
    }

    #[test]
    fn peek_does_not_record() {
        let t0 = Instant::now();
        let entry = WindowEntry::new(RateLimitAlgorithm::Sliding, t0);
        for _ in 0..5 {
            assert_eq!(entry.peek(t0, 1, WINDOW), Admission::Admitted { used: 0 });
        }
    }
}
