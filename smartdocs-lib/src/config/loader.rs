use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{Result, SmartDocsError};
use crate::security::ResponseHeaders;

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| SmartDocsError::Config(format!("Failed to read config file: {e}")))?;
    load_from_str(&txt)
}

pub fn load_from_str(txt: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(txt)
        .map_err(|e| SmartDocsError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.chat.max_history_turns == 0 {
        return Err(SmartDocsError::Config(
            "chat.max_history_turns must be greater than 0".to_string(),
        ));
    }
    if cfg.chat.top_k == 0 {
        return Err(SmartDocsError::Config("chat.top_k must be greater than 0".to_string()));
    }
    if cfg.chat.channel_capacity == 0 {
        return Err(SmartDocsError::Config(
            "chat.channel_capacity must be greater than 0".to_string(),
        ));
    }

    if cfg.chat.max_request_bytes == 0 {
        return Err(SmartDocsError::Config(
            "chat.max_request_bytes must be greater than 0".to_string(),
        ));
    }

    if cfg.retriever.url.trim().is_empty() {
        return Err(SmartDocsError::Config("retriever.url must not be empty".to_string()));
    }

    let rate_limit = &cfg.security.rate_limit;
    if rate_limit.limit == 0 {
        return Err(SmartDocsError::Config(
            "security.rate_limit.limit must be greater than 0".to_string(),
        ));
    }
    if rate_limit.window_seconds == 0 {
        return Err(SmartDocsError::Config(
            "security.rate_limit.window_seconds must be greater than 0".to_string(),
        ));
    }
    if rate_limit.sweep_interval_secs == 0 {
        return Err(SmartDocsError::Config(
            "security.rate_limit.sweep_interval_secs must be greater than 0".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for endpoint in &rate_limit.endpoints {
        if !endpoint.path.starts_with('/') {
            return Err(SmartDocsError::Config(format!(
                "Rate limit endpoint path must start with '/': {}",
                endpoint.path
            )));
        }
        if !seen.insert(endpoint.path.as_str()) {
            return Err(SmartDocsError::Config(format!(
                "Duplicate rate limit endpoint: {}",
                endpoint.path
            )));
        }
        if endpoint.limit == Some(0) {
            return Err(SmartDocsError::Config(format!(
                "Rate limit for {} must be greater than 0",
                endpoint.path
            )));
        }
        if endpoint.window_seconds == Some(0) {
            return Err(SmartDocsError::Config(format!(
                "Rate limit window for {} must be greater than 0",
                endpoint.path
            )));
        }
    }

    ResponseHeaders::from_config(&cfg.security.headers)
        .map_err(|e| SmartDocsError::Config(format!("security.headers: {e}")))?;

    if cfg.timeout.retrieval_ms == 0 || cfg.timeout.generation_secs == 0 {
        return Err(SmartDocsError::Config(
            "timeout.retrieval_ms and timeout.generation_secs must be greater than 0".to_string(),
        ));
    }
    if cfg.timeout.idle_connection_secs == 0 {
        return Err(SmartDocsError::Config(
            "timeout.idle_connection_secs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}
