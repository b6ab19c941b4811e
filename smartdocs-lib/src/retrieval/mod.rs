//! Document retrieval collaborator.
//!
//! Vector search lives outside this service. A [`Retriever`] maps a query to
//! an ordered list of chunks, best match first.

mod remote;

pub use remote::HttpRetriever;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One retrieved chunk of a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub source_id: String,
}

impl RetrievedChunk {
    pub fn new(text: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self { text: text.into(), source_id: source_id.into() }
    }
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retriever request failed: {0}")]
    Request(String),
    #[error("retriever returned HTTP {0}")]
    Status(u16),
    #[error("invalid retriever response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `top_k` chunks relevant to `query`, most relevant first
    async fn search(&self, query: &str, top_k: usize)
        -> Result<Vec<RetrievedChunk>, RetrievalError>;

    /// Whether the backing store is reachable
    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str;
}

/// Source ids of `chunks`, deduplicated, in first-seen order
pub fn dedupe_sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut seen = ahash::AHashSet::with_capacity(chunks.len());
    chunks
        .iter()
        .filter(|chunk| seen.insert(chunk.source_id.as_str()))
        .map(|chunk| chunk.source_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_seen_order() {
        let chunks = vec![
            RetrievedChunk::new("a", "manual.pdf"),
            RetrievedChunk::new("b", "faq.md"),
            RetrievedChunk::new("c", "manual.pdf"),
            RetrievedChunk::new("d", "notes.txt"),
        ];
        assert_eq!(dedupe_sources(&chunks), vec!["manual.pdf", "faq.md", "notes.txt"]);
    }

    #[test]
    fn dedupe_empty() {
        assert!(dedupe_sources(&[]).is_empty());
    }
}
