//! Rate limiting for the chat endpoint.
//!
//! Limits are exact per client fingerprint. Two counting algorithms are
//! available:
//!
//! - **Fixed window** (default): a counter and a window start per key. The
//!   window starts at the first request and resets once it has fully elapsed.
//!   A client can fit `limit` requests at the end of one window and `limit`
//!   more at the start of the next, so up to `2 * limit` requests may land in
//!   a short span around a boundary. This is accepted; choose the sliding
//!   window when a strict bound matters.
//! - **Sliding window**: one timestamp per admitted request; a request is
//!   admitted while fewer than `limit` timestamps fall inside the trailing
//!   window.
//!
//! # Architecture
//!
//! 1. **WindowEntry** (`window.rs`): the per-key state machine for both
//!    algorithms.
//! 2. **WindowTable** (`table.rs`): sharded map of entries; the shard lock
//!    makes check-and-update atomic per key.
//! 3. **RateLimiter** (`limiter.rs`): admission policy and result type.
//! 4. **RateLimitManager** (`manager.rs`): global and per-endpoint limiters,
//!    plus the background sweeper that evicts idle keys.
//!
//! # Configuration
//!
//! ```toml
//! [security.rate_limit]
//! enabled = true
//! algorithm = "fixed"
//! limit = 10
//! window_seconds = 60
//!
//! [[security.rate_limit.endpoints]]
//! path = "/chat"
//! limit = 5
//! ```

mod limiter;
mod manager;
mod table;
mod window;

pub use limiter::{RateLimitResult, RateLimiter};
pub use manager::RateLimitManager;
