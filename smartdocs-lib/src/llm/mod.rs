//! Language model backends.
//!
//! The set of backends is closed: a request names one [`ModelType`] and the
//! [`ModelRegistry`] holds exactly one [`LanguageModel`] per variant.

mod gemini;
mod lines;
mod ollama;

pub use gemini::GeminiModel;
pub use ollama::OllamaModel;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::config::{ModelsConfig, TimeoutConfig};

/// Lazily produced text fragments, in generation order
pub type TokenStream = BoxStream<'static, Result<String, LlmError>>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key not set (environment variable {0})")]
    MissingApiKey(String),
    #[error("model request failed: {0}")]
    Request(String),
    #[error("model returned HTTP {0}")]
    Status(u16),
    #[error("model stream failed: {0}")]
    Stream(String),
    #[error("model reported an error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Start generating an answer for `prompt`.
    ///
    /// Failures before the first fragment are returned directly; failures
    /// mid-generation arrive as an `Err` item on the stream.
    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream, LlmError>;

    /// Backend name used in logs
    fn name(&self) -> &str;

    /// Model identifier sent to the backend
    fn model(&self) -> &str;
}

/// Model backend requested by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    Gemini,
    Local,
}

impl ModelType {
    pub const ALL: [ModelType; 2] = [ModelType::Gemini, ModelType::Local];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Gemini => "gemini",
            ModelType::Local => "local",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid model_type {0:?}, expected \"gemini\" or \"local\"")]
pub struct UnknownModelType(pub String);

impl FromStr for ModelType {
    type Err = UnknownModelType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gemini" => Ok(ModelType::Gemini),
            "local" => Ok(ModelType::Local),
            other => Err(UnknownModelType(other.to_string())),
        }
    }
}

/// One backend per [`ModelType`]
#[derive(Clone)]
pub struct ModelRegistry {
    gemini: Arc<dyn LanguageModel>,
    local: Arc<dyn LanguageModel>,
}

impl ModelRegistry {
    pub fn new(gemini: Arc<dyn LanguageModel>, local: Arc<dyn LanguageModel>) -> Self {
        Self { gemini, local }
    }

    /// Build the HTTP backends from configuration. The Gemini API key is read
    /// per request, so a missing key fails requests, not startup.
    pub fn from_config(models: &ModelsConfig, timeouts: &TimeoutConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(timeouts.connect_ms))
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            gemini: Arc::new(GeminiModel::new(client.clone(), &models.gemini)),
            local: Arc::new(OllamaModel::new(client, &models.local)),
        })
    }

    pub fn select(&self, model: ModelType) -> Arc<dyn LanguageModel> {
        match model {
            ModelType::Gemini => Arc::clone(&self.gemini),
            ModelType::Local => Arc::clone(&self.local),
        }
    }
}
