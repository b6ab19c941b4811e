//! Connection admission, idle tracking and graceful drain.
//!
//! Each accepted TCP connection holds one permit of a semaphore sized to
//! `security.max_connections`. Draining on shutdown means waiting until every
//! permit is back.

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use http_body_util::BodyExt;
use hyper::body::{Body, Bytes, Frame, SizeHint};
use hyper::Response;
use thiserror::Error;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::synthetic_response::RespBody;

use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Server is shutting down")]
    Shutdown,
    #[error("Connection limit of {limit} reached")]
    LimitExceeded { limit: usize },
}

/// One admitted connection. Releases its slot when dropped.
pub struct ConnectionSlot {
    _permit: OwnedSemaphorePermit,
    metrics: Option<Arc<Metrics>>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        if let Some(m) = &self.metrics {
            m.connections_active.add(-1, &[]);
        }
    }
}

/// Bounds concurrent connections and tracks them for shutdown
pub struct ConnectionManager {
    slots: Arc<Semaphore>,
    max_connections: usize,
    shutdown: CancellationToken,
}

impl ConnectionManager {
    pub fn new(max_connections: usize, shutdown: CancellationToken) -> Self {
        let max_connections = max_connections.clamp(1, Semaphore::MAX_PERMITS);
        Self { slots: Arc::new(Semaphore::new(max_connections)), max_connections, shutdown }
    }

    /// Connections currently holding a slot
    pub fn active(&self) -> usize {
        self.max_connections.saturating_sub(self.slots.available_permits())
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Admit a connection from `peer`, or refuse it when shutting down or full
    pub fn try_accept(
        &self,
        peer: SocketAddr,
        metrics: Option<&Arc<Metrics>>,
    ) -> Result<ConnectionSlot, ConnectionError> {
        if self.is_shutdown() {
            return Err(ConnectionError::Shutdown);
        }

        let permit = match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::NoPermits) => {
                if let Some(m) = metrics {
                    m.connections_rejected_total.add(1, &[]);
                }
                warn!(%peer, limit = self.max_connections, "connection limit reached, rejecting");
                return Err(ConnectionError::LimitExceeded { limit: self.max_connections });
            }
            Err(TryAcquireError::Closed) => return Err(ConnectionError::Shutdown),
        };

        if let Some(m) = metrics {
            m.connections_total.add(1, &[]);
            m.connections_active.add(1, &[]);
        }
        Ok(ConnectionSlot { _permit: permit, metrics: metrics.cloned() })
    }

    /// Wait until every connection has released its slot or `timeout` elapses.
    /// Returns the number of connections still open.
    pub async fn drain(&self, timeout: Duration) -> usize {
        let all = u32::try_from(self.max_connections).unwrap_or(u32::MAX);
        let active = self.active();
        if active > 0 {
            info!(active_connections = active, "Waiting for connections to close");
        }
        match tokio::time::timeout(timeout, self.slots.acquire_many(all)).await {
            Ok(_) => 0,
            Err(_) => {
                let remaining = self.active();
                warn!(active_connections = remaining, "Shutdown timeout reached, connections still active");
                remaining
            }
        }
    }
}

/// Requests in flight on one connection.
///
/// A request counts from the moment hyper hands it to the service until its
/// response body has been fully written or dropped, so a streaming answer keeps
/// the connection busy for its whole length.
#[derive(Clone)]
pub struct ConnectionActivity {
    in_flight: Arc<watch::Sender<usize>>,
}

impl Default for ConnectionActivity {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionActivity {
    pub fn new() -> Self {
        let (in_flight, _) = watch::channel(0);
        Self { in_flight: Arc::new(in_flight) }
    }

    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Mark one request as started. It ends when the returned guard drops.
    pub fn begin(&self) -> InFlight {
        self.in_flight.send_modify(|n| *n += 1);
        InFlight { in_flight: Arc::clone(&self.in_flight) }
    }

    /// Resolves once no request has been in flight for `limit` in a row.
    /// Every request start or finish restarts the clock.
    pub async fn idle_for(&self, limit: Duration) {
        let mut changes = self.in_flight.subscribe();
        loop {
            let busy = *changes.borrow_and_update() > 0;
            if busy {
                // The sender lives in `self`, so this only returns on a change.
                let _ = changes.changed().await;
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(limit) => return,
                _ = changes.changed() => {}
            }
        }
    }
}

/// One request counted by [`ConnectionActivity`]
pub struct InFlight {
    in_flight: Arc<watch::Sender<usize>>,
}

impl InFlight {
    /// Keep the request counted until `response`'s body is finished
    pub(crate) fn attach(self, response: Response<RespBody>) -> Response<RespBody> {
        response.map(|inner| TrackedBody { inner, _guard: self }.boxed())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

struct TrackedBody {
    inner: RespBody,
    _guard: InFlight,
}

impl Body for TrackedBody {
    type Data = Bytes;
    type Error = hyper::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, hyper::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Log how a connection ended and count idle closes
pub fn record_connection_end<E: std::fmt::Display>(
    outcome: Result<(), E>,
    idle_closed: bool,
    metrics: Option<&Metrics>,
    peer: SocketAddr,
) {
    if let Err(e) = outcome {
        warn!(%peer, error = %e, "connection error");
    }
    if idle_closed {
        debug!(%peer, "closed idle keep-alive connection");
        if let Some(m) = metrics {
            m.record_timeout(values::TIMEOUT_IDLE_CONNECTION);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::synthetic_response::empty_body;

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    #[test]
    fn refuses_beyond_limit_and_frees_on_drop() {
        let manager = ConnectionManager::new(2, CancellationToken::new());
        let first = manager.try_accept(peer(), None);
        let second = manager.try_accept(peer(), None);
        assert!(first.is_ok() && second.is_ok());
        assert_eq!(manager.active(), 2);

        match manager.try_accept(peer(), None) {
            Err(ConnectionError::LimitExceeded { limit }) => assert_eq!(limit, 2),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("third connection admitted"),
        }

        drop(first);
        assert_eq!(manager.active(), 1);
        assert!(manager.try_accept(peer(), None).is_ok());
    }

    #[test]
    fn refuses_after_shutdown() {
        let shutdown = CancellationToken::new();
        let manager = ConnectionManager::new(4, shutdown.clone());
        shutdown.cancel();
        assert!(matches!(manager.try_accept(peer(), None), Err(ConnectionError::Shutdown)));
    }

    #[tokio::test]
    async fn idle_clock_waits_for_responses_to_finish() {
        let activity = ConnectionActivity::new();
        let request = activity.begin();
        assert_eq!(activity.in_flight(), 1);

        let busy = tokio::time::timeout(
            Duration::from_millis(100),
            activity.idle_for(Duration::from_millis(10)),
        )
        .await;
        assert!(busy.is_err(), "idle while a request was in flight");

        drop(request);
        assert_eq!(activity.in_flight(), 0);
        let idle = tokio::time::timeout(
            Duration::from_secs(2),
            activity.idle_for(Duration::from_millis(10)),
        )
        .await;
        assert!(idle.is_ok());
    }

    #[test]
    fn attached_response_counts_until_body_dropped() {
        let activity = ConnectionActivity::new();
        let response = activity.begin().attach(Response::new(empty_body()));
        assert_eq!(activity.in_flight(), 1);
        drop(response);
        assert_eq!(activity.in_flight(), 0);
    }

    #[tokio::test]
    async fn drain_waits_for_open_slots() {
        let manager = ConnectionManager::new(4, CancellationToken::new());
        let slot = match manager.try_accept(peer(), None) {
            Ok(slot) => slot,
            Err(e) => panic!("connection refused: {e}"),
        };

        assert_eq!(manager.drain(Duration::from_millis(20)).await, 1);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(slot);
        });
        assert_eq!(manager.drain(Duration::from_secs(2)).await, 0);
    }
}
