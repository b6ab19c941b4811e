mod chat;
mod loader;
mod security;
mod telemetry;
mod timeout;
mod types;

pub use chat::{ChatConfig, GeminiConfig, LocalModelConfig, ModelsConfig, RetrieverConfig};
pub use loader::{load_from_path, load_from_str, validate_config};
pub use security::{
    CorsConfig, CspConfig, CustomHeader, EndpointRateLimitConfig, RateLimitAlgorithm,
    RateLimitConfig, SecurityConfig, SecurityHeaders,
};
pub use telemetry::{LogFormat, LoggingConfig, TelemetryConfig};
pub use timeout::TimeoutConfig;
pub use types::Config;
