use serde::Deserialize;

/// `[telemetry]`: the optional observability listener
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelemetryConfig {
    /// Port for the Prometheus `/metrics` and `/health`, `/ready`, `/live` checks.
    /// The listener is not started when unset.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

/// Output encoding for log lines
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, one event per line
    #[default]
    Text,
    /// One JSON object per line, for log shippers
    Json,
}

/// `[logging]`
///
/// `RUST_LOG`, when set, replaces both `level` and `dependency_level`.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Level for SmartDocs itself ("trace" through "error"). Default "info".
    #[serde(default = "default_level")]
    pub level: String,
    /// Level for the HTTP and telemetry libraries underneath. Default "warn".
    #[serde(default = "default_dependency_level")]
    pub dependency_level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Include the emitting module in each line
    #[serde(default)]
    pub show_target: bool,
}

impl LoggingConfig {
    /// `EnvFilter` directive built from the configured levels
    pub fn directive(&self) -> String {
        let deps = &self.dependency_level;
        format!(
            "{},hyper={deps},hyper_util={deps},reqwest={deps},opentelemetry={deps}",
            self.level
        )
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dependency_level: default_dependency_level(),
            format: LogFormat::Text,
            show_target: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_dependency_level() -> String {
    "warn".to_string()
}
