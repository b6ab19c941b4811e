use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::lines::{ensure_success, line_stream, Fragment};
use super::{LanguageModel, LlmError, TokenStream};
use crate::config::LocalModelConfig;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Local model served by Ollama (`POST /api/generate`, NDJSON stream)
pub struct OllamaModel {
    client: Client,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OllamaModel {
    pub fn new(client: Client, config: &LocalModelConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }
}

/// Parse one line of an Ollama generate stream
pub(crate) fn parse_line(line: &str) -> Result<Fragment, LlmError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Fragment::skip());
    }
    let chunk: GenerateChunk = serde_json::from_str(line)
        .map_err(|e| LlmError::Stream(format!("invalid ollama chunk: {e}")))?;
    if let Some(error) = chunk.error {
        return Err(LlmError::Provider(error));
    }
    Ok(Fragment {
        text: (!chunk.response.is_empty()).then_some(chunk.response),
        finished: chunk.done,
    })
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(model = %self.model, %url, "starting ollama generation");

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
            options: GenerateOptions { temperature: self.temperature },
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;
        let response = ensure_success("ollama", response).await?;

        Ok(line_stream("ollama", response, parse_line))
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
