use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RetrievalError, RetrievedChunk, Retriever};

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<RetrievedChunk>,
}

/// Retriever backed by an HTTP search sidecar
///
/// Posts `{"query", "top_k"}` to the configured URL and expects
/// `{"results": [{"text", "source_id"}]}` back.
pub struct HttpRetriever {
    client: Client,
    url: String,
}

impl HttpRetriever {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| RetrievalError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let response = self
            .client
            .post(&self.url)
            .json(&SearchRequest { query, top_k })
            .send()
            .await
            .map_err(|e| RetrievalError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status(status.as_u16()));
        }

        let body: SearchResponse =
            response.json().await.map_err(|e| RetrievalError::Decode(e.to_string()))?;
        debug!(results = body.results.len(), top_k, "retriever search complete");

        let mut results = body.results;
        results.truncate(top_k);
        Ok(results)
    }

    /// Any HTTP answer, even an error status, means the sidecar is up
    async fn health_check(&self) -> bool {
        self.client
            .get(&self.url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .is_ok()
    }

    fn name(&self) -> &str {
        "http"
    }
}
