use serde::Deserialize;

/// Timeout configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    /// Upper bound for one retriever search, in milliseconds
    /// Default: 5000 (5 seconds)
    #[serde(default = "default_retrieval_timeout")]
    pub retrieval_ms: u64,
    /// Upper bound for a whole generation, from the request to the provider
    /// until the last token, in seconds
    /// Default: 120
    #[serde(default = "default_generation_timeout")]
    pub generation_secs: u64,
    /// Connect timeout for outbound HTTP clients (retriever, model providers),
    /// in milliseconds
    /// Default: 5000 (5 seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,
    /// Graceful shutdown timeout in seconds
    /// Default: 30
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_secs: u64,
    /// How long a keep-alive connection may sit with no request in flight
    /// before it is closed, in seconds. Also bounds reading one request body.
    /// The clock restarts whenever a response finishes, so it never cuts a
    /// streaming answer.
    /// Default: 60
    #[serde(default = "default_idle_connection_timeout", alias = "connection_handling_secs")]
    pub idle_connection_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            retrieval_ms: default_retrieval_timeout(),
            generation_secs: default_generation_timeout(),
            connect_ms: default_connect_timeout(),
            shutdown_secs: default_shutdown_timeout(),
            idle_connection_secs: default_idle_connection_timeout(),
        }
    }
}

fn default_retrieval_timeout() -> u64 {
    5000
}

fn default_generation_timeout() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_idle_connection_timeout() -> u64 {
    60
}
