use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tracing::{debug, info, info_span, warn, Instrument};

use super::error::ChatError;
use super::history::trim;
use super::prompt::build_prompt;
use super::{ChatRequest, ConversationTurn};
use crate::config::{ChatConfig, TimeoutConfig};
use crate::llm::{LanguageModel, ModelRegistry, ModelType};
use crate::retrieval::{dedupe_sources, Retriever};
use crate::security::{RateLimitManager, RateLimitResult};
use crate::stream::{self, EventSink, EventStream, RateLimitInfo, SinkError, StreamEvent};
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

/// Endpoint name used for rate-limit lookups
pub const CHAT_ENDPOINT: &str = "/chat";

/// How long a failed answer waits for room to deliver its error event
const ERROR_DELIVERY_GRACE: Duration = Duration::from_secs(5);

/// How the HTTP layer should present a [`ChatStream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Admitted; events follow as they are produced (200)
    Streaming,
    /// Rejected by the rate limiter (429); the stream holds one `Error`
    RateLimited(RateLimitInfo),
    /// Failed validation (400); the stream holds one `Error`
    InvalidRequest,
}

/// Result of [`ChatHandler::handle`]
#[derive(Debug)]
pub struct ChatStream {
    pub disposition: Disposition,
    pub events: EventStream,
}

impl ChatStream {
    fn single(disposition: Disposition, event: StreamEvent) -> Self {
        Self { disposition, events: EventStream::single(event) }
    }
}

/// Per-request limits
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub max_history_turns: usize,
    pub top_k: usize,
    pub channel_capacity: usize,
    pub retrieval_timeout: Duration,
    /// Deadline for the whole generation, first fragment to last
    pub generation_timeout: Duration,
}

impl ChatSettings {
    pub fn from_config(chat: &ChatConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            max_history_turns: chat.max_history_turns,
            top_k: chat.top_k,
            channel_capacity: chat.channel_capacity,
            retrieval_timeout: Duration::from_millis(timeouts.retrieval_ms),
            generation_timeout: Duration::from_secs(timeouts.generation_secs),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default(), &TimeoutConfig::default())
    }
}

/// Validate a request, returning the selected backend
pub fn validate(request: &ChatRequest) -> Result<ModelType, ChatError> {
    if request.question.trim().is_empty() {
        return Err(ChatError::InvalidRequest("question must not be empty".to_string()));
    }
    request
        .model_type
        .parse()
        .map_err(|e: crate::llm::UnknownModelType| ChatError::InvalidRequest(e.to_string()))
}

/// Orchestrates one chat request: validation, rate limiting, retrieval and
/// streamed generation.
///
/// Admitted requests are answered by a spawned producer task that writes
/// into the returned stream; dropping the stream stops generation.
#[derive(Clone)]
pub struct ChatHandler {
    limiter: Arc<RateLimitManager>,
    retriever: Arc<dyn Retriever>,
    models: ModelRegistry,
    settings: ChatSettings,
    metrics: Option<Arc<Metrics>>,
}

impl ChatHandler {
    pub fn new(
        limiter: Arc<RateLimitManager>,
        retriever: Arc<dyn Retriever>,
        models: ModelRegistry,
        settings: ChatSettings,
    ) -> Self {
        Self { limiter, retriever, models, settings, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimitManager> {
        &self.limiter
    }

    pub fn retriever(&self) -> &Arc<dyn Retriever> {
        &self.retriever
    }

    /// Handle one request from the client identified by `client_key`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn handle(&self, request: ChatRequest, client_key: &str) -> ChatStream {
        let model_type = match validate(&request) {
            Ok(model_type) => model_type,
            Err(e) => {
                debug!(error = %e, "rejecting invalid chat request");
                if let Some(m) = &self.metrics {
                    m.record_error(values::ERROR_INVALID_REQUEST);
                }
                return ChatStream::single(Disposition::InvalidRequest, e.to_event());
            }
        };

        if let Some(info) = self.check_rate_limit(client_key) {
            info!(retry_after_secs = info.retry_after_secs, "chat request rate limited");
            return ChatStream::single(
                Disposition::RateLimited(info),
                StreamEvent::rate_limited(info),
            );
        }

        let (sink, events) = stream::channel(self.settings.channel_capacity);
        let job = ChatJob {
            question: request.question,
            history: trim(request.history, self.settings.max_history_turns),
            model_type,
            model: self.models.select(model_type),
            retriever: Arc::clone(&self.retriever),
            settings: self.settings.clone(),
            metrics: self.metrics.clone(),
        };
        let span = info_span!("chat", model = %model_type);
        tokio::spawn(job.run(sink).instrument(span));

        ChatStream { disposition: Disposition::Streaming, events }
    }

    /// Consult the limiter; `Some` when the request must be rejected
    fn check_rate_limit(&self, client_key: &str) -> Option<RateLimitInfo> {
        let algorithm = self
            .limiter
            .limiter_for(CHAT_ENDPOINT)
            .map(|limiter| limiter.algorithm().as_str());
        let metrics = self.metrics.as_ref().zip(algorithm);
        if let Some((m, algorithm)) = metrics {
            m.record_rate_limit_request(algorithm, CHAT_ENDPOINT);
        }

        let decision = self.limiter.check(client_key, CHAT_ENDPOINT);
        match decision {
            RateLimitResult::Allowed { limit, remaining } => {
                debug!(limit, remaining, "rate limit check passed");
                if let Some((m, algorithm)) = metrics {
                    m.record_rate_limit_allowed(algorithm, CHAT_ENDPOINT);
                }
                None
            }
            RateLimitResult::Limited { limit, .. } => {
                if let Some((m, algorithm)) = metrics {
                    m.record_rate_limit_rejection(algorithm, CHAT_ENDPOINT);
                }
                Some(RateLimitInfo {
                    limit,
                    remaining: 0,
                    retry_after_secs: decision.retry_after_secs().unwrap_or(1),
                })
            }
        }
    }
}

/// Why the producer stopped early
enum Stop {
    /// The consumer went away
    Cancelled,
    Failed(ChatError),
}

impl From<ChatError> for Stop {
    fn from(e: ChatError) -> Self {
        Stop::Failed(e)
    }
}

impl From<SinkError> for Stop {
    fn from(e: SinkError) -> Self {
        match e {
            SinkError::Closed => Stop::Cancelled,
            SinkError::OutOfOrder { .. } => Stop::Failed(ChatError::Internal(e.to_string())),
        }
    }
}

/// Producer for one admitted request
struct ChatJob {
    question: String,
    history: Vec<ConversationTurn>,
    model_type: ModelType,
    model: Arc<dyn LanguageModel>,
    retriever: Arc<dyn Retriever>,
    settings: ChatSettings,
    metrics: Option<Arc<Metrics>>,
}

impl ChatJob {
    async fn run(self, mut sink: EventSink) {
        let started = Instant::now();
        let mut tokens = 0u64;

        let outcome = match self.produce(&mut sink, &mut tokens).await {
            Ok(()) => {
                let elapsed = started.elapsed();
                info!(tokens, ?elapsed, "answer complete");
                values::OUTCOME_DONE
            }
            Err(Stop::Cancelled) => {
                info!(tokens, "client disconnected, generation stopped");
                values::OUTCOME_CANCELLED
            }
            Err(Stop::Failed(error)) => {
                warn!(error = %error, kind = error.kind().as_str(), tokens, "answer failed");
                match error {
                    ChatError::RetrievalTimeout(_) => self.record_timeout(values::TIMEOUT_RETRIEVAL),
                    ChatError::GenerationTimeout(_) => {
                        self.record_timeout(values::TIMEOUT_GENERATION)
                    }
                    _ => {}
                }
                let delivery = tokio::time::timeout(ERROR_DELIVERY_GRACE, sink.send(error.to_event()));
                if !matches!(delivery.await, Ok(Ok(()))) {
                    debug!("error event not delivered, client gone or not reading");
                }
                error.kind().as_str()
            }
        };

        if let Some(m) = &self.metrics {
            m.record_stream(
                self.model_type.as_str(),
                outcome,
                tokens,
                started.elapsed().as_secs_f64(),
            );
        }
    }

    fn record_timeout(&self, timeout_type: &str) {
        if let Some(m) = &self.metrics {
            m.record_timeout(timeout_type);
        }
    }

    async fn produce(&self, sink: &mut EventSink, tokens: &mut u64) -> Result<(), Stop> {
        let retrieval_started = Instant::now();
        let search = tokio::time::timeout(
            self.settings.retrieval_timeout,
            self.retriever.search(&self.question, self.settings.top_k),
        );
        let chunks = tokio::select! {
            biased;
            _ = sink.closed() => return Err(Stop::Cancelled),
            result = search => match result {
                Ok(chunks) => chunks.map_err(ChatError::from)?,
                Err(_) => {
                    return Err(ChatError::RetrievalTimeout(self.settings.retrieval_timeout).into())
                }
            },
        };
        if let Some(m) = &self.metrics {
            m.record_retrieval(retrieval_started.elapsed().as_secs_f64());
        }
        debug!(chunks = chunks.len(), retriever = self.retriever.name(), "retrieved context");

        sink.send(StreamEvent::sources(dedupe_sources(&chunks))).await?;

        let prompt = build_prompt(&self.question, &chunks, &self.history);
        let deadline = tokio::time::Instant::now() + self.settings.generation_timeout;
        let timed_out = || ChatError::GenerationTimeout(self.settings.generation_timeout);

        debug!(backend = self.model.name(), model = self.model.model(), "starting generation");
        let mut fragments = tokio::select! {
            biased;
            _ = sink.closed() => return Err(Stop::Cancelled),
            result = tokio::time::timeout_at(deadline, self.model.generate_stream(&prompt)) => {
                result.map_err(|_| timed_out())?.map_err(ChatError::from)?
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = sink.closed() => return Err(Stop::Cancelled),
                next = tokio::time::timeout_at(deadline, fragments.next()) => {
                    next.map_err(|_| timed_out())?
                }
            };
            // A client that stays connected but stops reading fills the
            // channel; waiting on it counts against the same deadline.
            match next {
                None => {
                    tokio::time::timeout_at(deadline, sink.send(StreamEvent::Done))
                        .await
                        .map_err(|_| timed_out())??;
                    return Ok(());
                }
                Some(Ok(text)) if text.is_empty() => continue,
                Some(Ok(text)) => {
                    tokio::time::timeout_at(deadline, sink.send(StreamEvent::token(text)))
                        .await
                        .map_err(|_| timed_out())??;
                    *tokens += 1;
                }
                Some(Err(e)) => return Err(ChatError::from(e).into()),
            }
        }
    }
}
