use super::{ErrorKind, RateLimitInfo, StreamEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// No token received yet
    Pending,
    /// At least one token rendered
    Streaming,
    Complete,
    Failed,
}

/// Client-side view of an answer being streamed
///
/// Tokens are appended to the display text as they arrive. An `Error` marks
/// the answer failed but keeps whatever was already rendered.
#[derive(Debug)]
pub struct AnswerRenderer {
    state: RenderState,
    text: String,
    sources: Vec<String>,
    error: Option<(ErrorKind, String)>,
    rate_limit: Option<RateLimitInfo>,
}

impl Default for AnswerRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerRenderer {
    pub fn new() -> Self {
        Self {
            state: RenderState::Pending,
            text: String::new(),
            sources: Vec::new(),
            error: None,
            rate_limit: None,
        }
    }

    /// Apply one event. Returns false if the answer had already finished and
    /// the event was ignored.
    pub fn apply(&mut self, event: StreamEvent) -> bool {
        if self.is_finished() {
            return false;
        }
        match event {
            StreamEvent::Sources { sources } => self.sources = sources,
            StreamEvent::Token { text } => {
                self.text.push_str(&text);
                self.state = RenderState::Streaming;
            }
            StreamEvent::Done => self.state = RenderState::Complete,
            StreamEvent::Error { message, kind, rate_limit } => {
                self.error = Some((kind, message));
                self.rate_limit = rate_limit;
                self.state = RenderState::Failed;
            }
        }
        true
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, RenderState::Complete | RenderState::Failed)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn error(&self) -> Option<(ErrorKind, &str)> {
        self.error.as_ref().map(|(kind, message)| (*kind, message.as_str()))
    }

    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        self.rate_limit.as_ref()
    }
}
