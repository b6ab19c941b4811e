use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::StreamEvent;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("{event} event not allowed in state {state:?}")]
    OutOfOrder { event: &'static str, state: SinkState },
    #[error("consumer closed the stream")]
    Closed,
}

/// Position of a sink in the event ordering state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Nothing sent yet; `Sources` or a terminal event may follow
    Open,
    /// `Sources` sent; tokens and a terminal event may follow
    SourcesSent,
    /// `Done` or `Error` sent; nothing may follow
    Terminated,
}

/// Create a bounded event channel
pub fn channel(capacity: usize) -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSink { tx, state: SinkState::Open }, EventStream { inner: ReceiverStream::new(rx) })
}

/// Producer end of a response stream
///
/// Refuses events that would break the stream shape: a second `Sources`,
/// a `Token` before `Sources`, or anything after `Done`/`Error`.
#[derive(Debug)]
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    state: SinkState,
}

impl EventSink {
    pub fn state(&self) -> SinkState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SinkState::Terminated
    }

    /// True once the consumer has been dropped or closed
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves when the consumer goes away
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    fn next_state(&self, event: &StreamEvent) -> Result<SinkState, SinkError> {
        let next = match (self.state, event) {
            (SinkState::Terminated, _) => None,
            (SinkState::Open, StreamEvent::Sources { .. }) => Some(SinkState::SourcesSent),
            (SinkState::Open, StreamEvent::Token { .. }) => None,
            (SinkState::SourcesSent, StreamEvent::Sources { .. }) => None,
            (SinkState::SourcesSent, StreamEvent::Token { .. }) => Some(SinkState::SourcesSent),
            (_, StreamEvent::Done | StreamEvent::Error { .. }) => Some(SinkState::Terminated),
        };
        next.ok_or(SinkError::OutOfOrder { event: event.name(), state: self.state })
    }

    /// Send one event, waiting for channel capacity
    pub async fn send(&mut self, event: StreamEvent) -> Result<(), SinkError> {
        let next = self.next_state(&event)?;
        let result = self.tx.send(event).await.map_err(|_| SinkError::Closed);
        self.state = if result.is_ok() { next } else { SinkState::Terminated };
        result
    }
}

/// Consumer end of a response stream
///
/// Dropping it, or calling [`EventStream::close`], cancels the producer.
#[derive(Debug)]
pub struct EventStream {
    inner: ReceiverStream<StreamEvent>,
}

impl EventStream {
    /// Stop accepting events. Already buffered events can still be read.
    pub fn close(&mut self) {
        self.inner.close();
    }

    /// Stream holding exactly `event`, already terminated
    pub fn single(event: StreamEvent) -> Self {
        let (tx, rx) = mpsc::channel(1);
        // Capacity 1 and a live receiver: cannot fail.
        let _ = tx.try_send(event);
        Self { inner: ReceiverStream::new(rx) }
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ErrorKind;
    use futures::StreamExt;

    #[tokio::test]
    async fn refuses_out_of_order_events() -> Result<(), SinkError> {
        let (mut sink, _stream) = channel(8);
        assert_eq!(
            sink.send(StreamEvent::token("x")).await,
            Err(SinkError::OutOfOrder { event: "token", state: SinkState::Open })
        );
        sink.send(StreamEvent::sources(vec![])).await?;
        assert!(sink.send(StreamEvent::sources(vec![])).await.is_err());
        sink.send(StreamEvent::token("x")).await?;
        sink.send(StreamEvent::Done).await?;
        assert!(sink.is_terminated());
        assert!(sink.send(StreamEvent::error(ErrorKind::Internal, "late")).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn error_allowed_without_sources() -> Result<(), SinkError> {
        let (mut sink, stream) = channel(2);
        sink.send(StreamEvent::error(ErrorKind::Retrieval, "down")).await?;
        drop(sink);
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn dropped_consumer_closes_sink() {
        let (mut sink, stream) = channel(2);
        drop(stream);
        assert!(sink.is_closed());
        assert_eq!(sink.send(StreamEvent::sources(vec![])).await, Err(SinkError::Closed));
        assert!(sink.is_terminated());
    }

    #[tokio::test]
    async fn single_yields_one_event() {
        let events: Vec<_> = EventStream::single(StreamEvent::Done).collect().await;
        assert_eq!(events, vec![StreamEvent::Done]);
    }
}
