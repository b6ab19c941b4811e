use std::sync::Arc;

use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connection::{record_connection_end, ConnectionActivity, ConnectionManager};
use super::routes::handle_request;
use super::ServerContext;
use crate::error::{Result, SmartDocsError};

/// Cancel `shutdown` on SIGTERM or SIGINT
pub async fn shutdown_on_signal(shutdown: CancellationToken) -> Result<()> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
        SmartDocsError::Io(std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))
    })?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).map_err(|e| {
        SmartDocsError::Io(std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))
    })?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        _ = shutdown.cancelled() => return Ok(()),
    }
    shutdown.cancel();
    Ok(())
}

/// Serve HTTP on `listener` until `shutdown` is cancelled, then wait for open
/// connections to finish (bounded by the shutdown timeout).
///
/// Also runs the rate-limit sweeper for the lifetime of the server.
pub async fn serve(
    listener: TcpListener,
    ctx: Arc<ServerContext>,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr().map_err(SmartDocsError::Io)?;
    let builder = ConnBuilder::new(TokioExecutor::new());
    let connections = ConnectionManager::new(ctx.max_connections, shutdown.clone());

    let limiter = Arc::clone(ctx.handler.limiter());
    if limiter.is_enabled() {
        tokio::spawn(limiter.run_sweeper(ctx.sweep_interval, shutdown.child_token()));
    }

    info!(?addr, "SmartDocs server listening");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };

                let slot = match connections.try_accept(peer, ctx.metrics.as_ref()) {
                    Ok(slot) => slot,
                    Err(e) => {
                        debug!(?peer, error = %e, "connection rejected");
                        continue;
                    }
                };

                let builder = builder.clone();
                let ctx = Arc::clone(&ctx);
                let stop = shutdown.clone();
                tokio::spawn(async move {
                    let _slot = slot;
                    let idle_limit = ctx.idle_timeout;
                    let metrics = ctx.metrics.clone();
                    let activity = ConnectionActivity::new();
                    let requests = activity.clone();
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let ctx = Arc::clone(&ctx);
                        let in_flight = requests.begin();
                        async move {
                            let response = handle_request(req, peer, ctx).await;
                            Ok::<_, hyper::Error>(in_flight.attach(response))
                        }
                    });

                    // Shutdown and the idle limit both close the connection
                    // gracefully: a response being written, including a
                    // streaming answer, always finishes first.
                    let connection = builder.serve_connection(TokioIo::new(stream), svc);
                    let mut connection = std::pin::pin!(connection);
                    let mut closing = false;
                    let mut idle_closed = false;
                    let outcome = loop {
                        tokio::select! {
                            result = connection.as_mut() => break result,
                            _ = stop.cancelled(), if !closing => {
                                closing = true;
                                connection.as_mut().graceful_shutdown();
                            }
                            _ = activity.idle_for(idle_limit), if !closing => {
                                closing = true;
                                idle_closed = true;
                                connection.as_mut().graceful_shutdown();
                            }
                        }
                    };
                    record_connection_end(outcome, idle_closed, metrics.as_deref(), peer);
                });
            }
        }
    }

    info!(
        "Waiting for active connections to finish (timeout: {}s)",
        ctx.shutdown_timeout.as_secs()
    );
    let remaining = connections.drain(ctx.shutdown_timeout).await;
    if remaining == 0 {
        info!("All connections closed, shutdown complete");
    }

    info!("SmartDocs server stopped");
    Ok(())
}

/// Bind `ctx.listen` and serve until SIGTERM/SIGINT
pub async fn run(ctx: Arc<ServerContext>, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(ctx.listen)
        .await
        .map_err(SmartDocsError::Io)?;

    let signals = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown_on_signal(signals).await {
            warn!(error = %e, "signal handling unavailable");
        }
    });

    serve(listener, ctx, shutdown).await
}
