use std::time::Duration;

use thiserror::Error;

use crate::llm::LlmError;
use crate::retrieval::RetrievalError;
use crate::stream::{ErrorKind, StreamEvent};

/// Failures while answering a chat request
///
/// The `Display` text is for logs. Clients only ever see
/// [`ChatError::public_message`], which never includes provider responses,
/// credentials or internal detail.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("retrieval timed out after {0:?}")]
    RetrievalTimeout(Duration),

    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("generation timed out after {0:?}")]
    GenerationTimeout(Duration),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ChatError::Retrieval(_) => ErrorKind::Retrieval,
            ChatError::RetrievalTimeout(_) | ChatError::GenerationTimeout(_) => ErrorKind::Timeout,
            ChatError::Generation(_) => ErrorKind::Generation,
            ChatError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show to the client
    pub fn public_message(&self) -> String {
        match self {
            ChatError::InvalidRequest(reason) => reason.clone(),
            ChatError::Retrieval(_) => {
                "The document search service is unavailable. Please try again later.".to_string()
            }
            ChatError::RetrievalTimeout(_) => {
                "The document search took too long. Please try again.".to_string()
            }
            ChatError::Generation(LlmError::MissingApiKey(_)) => {
                "The selected model is not configured on this server.".to_string()
            }
            ChatError::Generation(_) => {
                "The model failed to answer. Please try again.".to_string()
            }
            ChatError::GenerationTimeout(_) => {
                "The answer took too long to generate. Please try again.".to_string()
            }
            ChatError::Internal(_) => "Something went wrong while answering.".to_string(),
        }
    }

    pub fn to_event(&self) -> StreamEvent {
        StreamEvent::error(self.kind(), self.public_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_detail_never_reaches_client() {
        let err = ChatError::Generation(LlmError::Provider(
            "API key AIza-secret is invalid".to_string(),
        ));
        assert_eq!(err.kind(), ErrorKind::Generation);
        assert!(!err.public_message().contains("AIza"));
        assert!(err.to_string().contains("AIza"));
    }

    #[test]
    fn timeouts_share_a_kind() {
        assert_eq!(ChatError::RetrievalTimeout(Duration::from_secs(1)).kind(), ErrorKind::Timeout);
        assert_eq!(ChatError::GenerationTimeout(Duration::from_secs(1)).kind(), ErrorKind::Timeout);
    }
}
