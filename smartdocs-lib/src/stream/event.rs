use serde::{Deserialize, Serialize};

/// One event of a chat response stream
///
/// Serialized with a `"type"` tag, one JSON object per NDJSON line:
///
/// ```text
/// {"type":"sources","sources":["guide.pdf"]}
/// {"type":"token","text":"Hello"}
/// {"type":"done"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Deduplicated source identifiers, in first-seen order
    Sources { sources: Vec<String> },
    /// One generated text fragment
    Token { text: String },
    /// Generation completed successfully
    Done,
    /// Generation did not complete
    Error {
        message: String,
        kind: ErrorKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rate_limit: Option<RateLimitInfo>,
    },
}

impl StreamEvent {
    pub fn sources(sources: Vec<String>) -> Self {
        Self::Sources { sources }
    }

    pub fn token(text: impl Into<String>) -> Self {
        Self::Token { text: text.into() }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error { message: message.into(), kind, rate_limit: None }
    }

    pub fn rate_limited(info: RateLimitInfo) -> Self {
        Self::Error {
            message: format!(
                "Too many requests. Please retry in {} seconds.",
                info.retry_after_secs
            ),
            kind: ErrorKind::RateLimited,
            rate_limit: Some(info),
        }
    }

    /// `Done` and `Error` end a stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }

    /// Short name used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sources { .. } => "sources",
            Self::Token { .. } => "token",
            Self::Done => "done",
            Self::Error { .. } => "error",
        }
    }
}

/// Failure category carried by an `Error` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    InvalidRequest,
    Retrieval,
    Generation,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Retrieval => "retrieval",
            ErrorKind::Generation => "generation",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Rate-limit details attached to a `rate_limited` error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub retry_after_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tags() -> Result<(), serde_json::Error> {
        assert_eq!(
            serde_json::to_string(&StreamEvent::token("hi"))?,
            r#"{"type":"token","text":"hi"}"#
        );
        assert_eq!(serde_json::to_string(&StreamEvent::Done)?, r#"{"type":"done"}"#);
        assert_eq!(
            serde_json::to_string(&StreamEvent::error(ErrorKind::Timeout, "slow"))?,
            r#"{"type":"error","message":"slow","kind":"timeout"}"#
        );
        Ok(())
    }

    #[test]
    fn rate_limited_message_names_wait() {
        let event =
            StreamEvent::rate_limited(RateLimitInfo { limit: 10, remaining: 0, retry_after_secs: 42 });
        match event {
            StreamEvent::Error { message, kind, rate_limit } => {
                assert_eq!(kind, ErrorKind::RateLimited);
                assert!(message.contains("42"));
                assert_eq!(rate_limit.map(|r| r.retry_after_secs), Some(42));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
