use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::lines::{ensure_success, line_stream, Fragment};
use super::{LanguageModel, LlmError, TokenStream};
use crate::config::GeminiConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
}

/// Google Gemini via `streamGenerateContent` with server-sent events
pub struct GeminiModel {
    client: Client,
    base_url: String,
    model: String,
    api_key_env: String,
    temperature: f64,
}

impl GeminiModel {
    pub fn new(client: Client, config: &GeminiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
        }
    }

    fn api_key(&self) -> Result<String, LlmError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(self.api_key_env.clone()))
    }
}

/// Parse one SSE line of a Gemini stream
///
/// Only `data:` lines carry payloads; comments, `event:` lines and blank
/// separators are skipped.
pub(crate) fn parse_line(line: &str) -> Result<Fragment, LlmError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(Fragment::skip());
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(Fragment::skip());
    }
    if data == "[DONE]" {
        return Ok(Fragment { text: None, finished: true });
    }

    let payload: Value = serde_json::from_str(data)
        .map_err(|e| LlmError::Stream(format!("invalid gemini event: {e}")))?;

    if let Some(error) = payload.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(LlmError::Provider(message.to_string()));
    }
    if let Some(reason) = payload
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(Value::as_str)
    {
        return Err(LlmError::Provider(format!("prompt blocked: {reason}")));
    }

    let Some(candidate) = payload
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    else {
        return Ok(Fragment::skip());
    };

    let text: String = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    let finished = match candidate.get("finishReason").and_then(Value::as_str) {
        None | Some("FINISH_REASON_UNSPECIFIED") => false,
        Some("STOP") | Some("MAX_TOKENS") => true,
        Some(other) => return Err(LlmError::Provider(format!("generation stopped: {other}"))),
    };

    Ok(Fragment { text: (!text.is_empty()).then_some(text), finished })
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream, LlmError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models/{}:streamGenerateContent?alt=sse", self.base_url, self.model);
        debug!(model = %self.model, "starting gemini generation");

        let body = GenerateContentRequest {
            contents: [Content { role: "user", parts: [Part { text: prompt }] }],
            generation_config: GenerationConfig { temperature: self.temperature },
        };
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.without_url().to_string()))?;
        let response = ensure_success("gemini", response).await?;

        Ok(line_stream("gemini", response, parse_line))
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_parts() -> Result<(), LlmError> {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"Hello"},{"text":" there"}],"role":"model"}}]}"#;
        assert_eq!(
            parse_line(line)?,
            Fragment { text: Some("Hello there".to_string()), finished: false }
        );
        Ok(())
    }

    #[test]
    fn stop_reason_finishes() -> Result<(), LlmError> {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"."}]},"finishReason":"STOP"}]}"#;
        assert_eq!(parse_line(line)?, Fragment { text: Some(".".to_string()), finished: true });
        Ok(())
    }

    #[test]
    fn skips_non_data_lines() -> Result<(), LlmError> {
        assert_eq!(parse_line("")?, Fragment::skip());
        assert_eq!(parse_line(": keep-alive")?, Fragment::skip());
        assert_eq!(parse_line("event: message")?, Fragment::skip());
        Ok(())
    }

    #[test]
    fn safety_stop_is_an_error() {
        let line = r#"data: {"candidates":[{"finishReason":"SAFETY"}]}"#;
        assert!(matches!(parse_line(line), Err(LlmError::Provider(_))));
    }

    #[test]
    fn error_payload_is_an_error() {
        let line = r#"data: {"error":{"code":429,"message":"quota exceeded"}}"#;
        match parse_line(line) {
            Err(LlmError::Provider(message)) => assert_eq!(message, "quota exceeded"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
