//! Public HTTP surface: `POST /chat` streaming NDJSON and `GET /health`.
//!
//! One hyper connection task per client, bounded by [`ConnectionManager`],
//! with CORS and security headers applied to every response.

pub mod connection;
mod http_result;
mod listener;
mod response;
mod routes;
mod synthetic_response;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub use connection::{
    ConnectionActivity, ConnectionError, ConnectionManager, ConnectionSlot, InFlight,
};
pub use http_result::HttpError;
pub use listener::{run, serve, shutdown_on_signal};
pub use response::{status_for, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
pub use routes::HEALTH_ENDPOINT;

use crate::chat::{ChatHandler, ChatSettings};
use crate::config::{Config, SecurityConfig};
use crate::error::{Result, SmartDocsError};
use crate::llm::ModelRegistry;
use crate::retrieval::{HttpRetriever, Retriever};
use crate::security::{RateLimitManager, ResponseHeaders};
use crate::telemetry::Metrics;
use tracing::warn;

/// Everything a connection task needs to answer requests
pub struct ServerContext {
    pub listen: SocketAddr,
    pub handler: ChatHandler,
    pub security: SecurityConfig,
    pub response_headers: ResponseHeaders,
    pub max_connections: usize,
    pub max_request_bytes: usize,
    pub sweep_interval: Duration,
    /// Idle keep-alive limit; also bounds reading one request body
    pub idle_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub metrics: Option<Arc<Metrics>>,
}

impl ServerContext {
    /// Context around an already-built handler; limits and timeouts come from `config`
    pub fn new(config: &Config, handler: ChatHandler, metrics: Option<Arc<Metrics>>) -> Self {
        Self {
            listen: config.listen,
            handler: handler.with_metrics(metrics.clone()),
            security: config.security.clone(),
            response_headers: ResponseHeaders::from_config(&config.security.headers)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "ignoring security headers");
                    ResponseHeaders::default()
                }),
            max_connections: config.security.max_connections,
            max_request_bytes: config.chat.max_request_bytes,
            sweep_interval: Duration::from_secs(config.security.rate_limit.sweep_interval_secs),
            idle_timeout: Duration::from_secs(config.timeout.idle_connection_secs),
            shutdown_timeout: Duration::from_secs(config.timeout.shutdown_secs),
            metrics,
        }
    }

    /// Build the retriever client, model backends and rate limiter from `config`
    pub fn from_config(config: &Config, metrics: Option<Arc<Metrics>>) -> Result<Self> {
        let retriever: Arc<dyn Retriever> = Arc::new(
            HttpRetriever::new(
                config.retriever.url.clone(),
                Duration::from_millis(config.timeout.connect_ms),
            )
            .map_err(|e| SmartDocsError::Config(format!("retriever: {e}")))?,
        );
        let models = ModelRegistry::from_config(&config.models, &config.timeout)
            .map_err(|e| SmartDocsError::Config(format!("models: {e}")))?;
        let limiter = Arc::new(RateLimitManager::new(&config.security.rate_limit));
        let settings = ChatSettings::from_config(&config.chat, &config.timeout);

        let handler = ChatHandler::new(limiter, retriever, models, settings);
        Ok(Self::new(config, handler, metrics))
    }
}
