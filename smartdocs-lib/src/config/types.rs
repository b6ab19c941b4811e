use serde::Deserialize;
use std::net::SocketAddr;

use super::chat::{ChatConfig, ModelsConfig, RetrieverConfig};
use super::security::SecurityConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};
use super::timeout::TimeoutConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Example: "0.0.0.0:7860" or "127.0.0.1:8080"
    pub listen: SocketAddr,
    /// Chat endpoint behavior (history trimming, retrieval depth)
    #[serde(default)]
    pub chat: ChatConfig,
    /// External retriever
    #[serde(default)]
    pub retriever: RetrieverConfig,
    /// Model backends
    #[serde(default)]
    pub models: ModelsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Timeout configuration
    #[serde(default)]
    pub timeout: TimeoutConfig,
    /// Security configuration
    #[serde(default)]
    pub security: SecurityConfig,
    /// Telemetry configuration
    /// Controls metrics and observability features
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
