pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::{allowed_origin, apply_cors_headers, apply_preflight_headers};
pub use headers::{InvalidHeader, ResponseHeaders};
pub use rate_limit::{RateLimitManager, RateLimitResult, RateLimiter};
