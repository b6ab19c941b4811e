use crate::retrieval::Retriever;
use crate::error::{Result, SmartDocsError};
use crate::telemetry::{
    health_check_response, health_report, live_check_response, ready_check_response,
};
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::{Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type RespBody = BoxBody<Bytes, hyper::Error>;

fn plain_response(status: StatusCode, text: impl Into<Bytes>) -> Response<RespBody> {
    let body = Full::new(text.into())
        .map_err(|never| match never {})
        .boxed();
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    resp
}

/// Prometheus text exposition of everything in `registry`
pub fn metrics_response(registry: &Registry) -> Result<Response<RespBody>> {
    let encoder = TextEncoder::new();
    let exposition = encoder
        .encode_to_string(&registry.gather())
        .map_err(|e| SmartDocsError::Telemetry(format!("Failed to encode metrics: {e}")))?;

    let mut resp = plain_response(StatusCode::OK, exposition);
    let content_type = hyper::header::HeaderValue::from_static(prometheus::TEXT_FORMAT);
    resp.headers_mut().insert(hyper::header::CONTENT_TYPE, content_type);
    Ok(resp)
}

async fn route(
    path: &str,
    registry: &Registry,
    retriever: &dyn Retriever,
) -> Response<RespBody> {
    let result = match path {
        "/health" => health_check_response(&health_report(retriever).await),
        "/ready" => ready_check_response(retriever.health_check().await),
        "/live" => live_check_response(),
        "/metrics" => metrics_response(registry),
        _ => return plain_response(StatusCode::NOT_FOUND, "Not Found"),
    };
    match result {
        Ok(resp) => resp,
        Err(e) => {
            warn!(error = %e, path, "Observability server: failed to build response");
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// Start the observability server that handles metrics and health checks
/// This server runs on a dedicated port and serves:
/// - `/metrics` - Prometheus metrics
/// - `/health` - Health check endpoint
/// - `/ready` - Readiness check endpoint (retriever reachable)
/// - `/live` - Liveness check endpoint
///
/// Runs until `shutdown` is cancelled.
pub async fn start_observability_server(
    port: u16,
    registry: Registry,
    retriever: Arc<dyn Retriever>,
    shutdown: CancellationToken,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = Arc::new(registry);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(?addr, "Observability server started (metrics + health checks)");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Observability server: shutting down");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "Observability server: accept error");
                        continue;
                    }
                };

                let registry = registry.clone();
                let retriever = retriever.clone();
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let registry = registry.clone();
                        let retriever = retriever.clone();
                        async move {
                            Ok::<_, hyper::Error>(
                                route(req.uri().path(), &registry, retriever.as_ref()).await,
                            )
                        }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "Observability server: serve_connection error");
                    }
                });
            }
        }
    }

    info!("Observability server stopped");
    Ok(())
}
