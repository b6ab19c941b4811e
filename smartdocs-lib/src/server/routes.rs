use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};
use http_body_util::{BodyExt, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};
use tokio::time::Instant;
use tracing::{debug, error};

use super::http_result::{HttpError, HttpResult};
use super::response::{chat_response, ndjson_response};
use super::synthetic_response::{
    empty_body, internal_error_response, synthetic_error_response, RespBody,
};
use super::ServerContext;
use crate::chat::{ChatRequest, CHAT_ENDPOINT};
use crate::fingerprinting;
use crate::security::{allowed_origin, apply_cors_headers, apply_preflight_headers};
use crate::stream::{ErrorKind, EventStream, StreamEvent};
use crate::telemetry::metrics::values;
use crate::telemetry::{health_check_response, health_report};

pub const HEALTH_ENDPOINT: &str = "/health";

/// Route label for metrics; unknown paths share one label
fn route_label(path: &str) -> &'static str {
    match path {
        CHAT_ENDPOINT => CHAT_ENDPOINT,
        HEALTH_ENDPOINT => HEALTH_ENDPOINT,
        _ => "other",
    }
}

/// Handle one request: route it, then decorate the response with security
/// and CORS headers and record metrics.
pub(crate) async fn handle_request(
    req: Request<Incoming>,
    peer: SocketAddr,
    ctx: Arc<ServerContext>,
) -> Response<RespBody> {
    let start = Instant::now();
    let method = req.method().clone();
    let route = route_label(req.uri().path());
    let origin = allowed_origin(req.headers(), &ctx.security.cors).map(str::to_owned);

    let mut response = match dispatch(req, peer, &ctx).await {
        Ok(response) => response,
        Err(e) => {
            debug!(?peer, error = %e, "request failed");
            if let Some(m) = &ctx.metrics {
                m.record_error(e.error_type());
            }
            let message = e.to_string();
            synthetic_error_response(StatusCode::from(e), &message).unwrap_or_else(|e| {
                error!(error = %e, "failed to build error response");
                internal_error_response()
            })
        }
    };

    ctx.response_headers.apply(&mut response);
    apply_cors_headers(&mut response, origin.as_deref(), &ctx.security.cors);

    if let Some(m) = &ctx.metrics {
        m.record_request(
            method.as_str(),
            response.status().as_u16(),
            route,
            start.elapsed().as_secs_f64(),
        );
    }
    response
}

async fn dispatch(
    req: Request<Incoming>,
    peer: SocketAddr,
    ctx: &ServerContext,
) -> HttpResult<Response<RespBody>> {
    if req.method() == Method::OPTIONS {
        return preflight(ctx);
    }
    match (req.method(), req.uri().path()) {
        (&Method::POST, CHAT_ENDPOINT) => chat(req, peer, ctx).await,
        (&Method::GET, HEALTH_ENDPOINT) => health(ctx).await,
        (_, CHAT_ENDPOINT | HEALTH_ENDPOINT) => Err(HttpError::MethodNotAllowed),
        _ => Err(HttpError::NotFound),
    }
}

fn preflight(ctx: &ServerContext) -> HttpResult<Response<RespBody>> {
    let mut response = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(empty_body())
        .map_err(|e| HttpError::FailedToGenerateResponse(e.to_string()))?;
    apply_preflight_headers(&mut response, &ctx.security.cors);
    Ok(response)
}

async fn read_body(req: Request<Incoming>, limit: usize, within: Duration) -> HttpResult<Bytes> {
    let collected = tokio::time::timeout(within, Limited::new(req.into_body(), limit).collect())
        .await
        .map_err(|_| HttpError::RequestTimeout(within))?;
    match collected {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<http_body_util::LengthLimitError>() => {
            Err(HttpError::PayloadTooLarge(limit))
        }
        Err(e) => Err(HttpError::BodyRead(e.to_string())),
    }
}

async fn chat(
    req: Request<Incoming>,
    peer: SocketAddr,
    ctx: &ServerContext,
) -> HttpResult<Response<RespBody>> {
    let client = fingerprinting::from_request(peer, req.headers());
    let body = match read_body(req, ctx.max_request_bytes, ctx.idle_timeout).await {
        Err(e @ HttpError::RequestTimeout(_)) => {
            if let Some(m) = &ctx.metrics {
                m.record_timeout(values::TIMEOUT_REQUEST_BODY);
            }
            return Err(e);
        }
        other => other?,
    };

    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(?peer, error = %e, "malformed chat request body");
            let event =
                StreamEvent::error(ErrorKind::InvalidRequest, format!("malformed request body: {e}"));
            return ndjson_response(StatusCode::BAD_REQUEST, EventStream::single(event));
        }
    };

    chat_response(ctx.handler.handle(request, client.as_str()))
}

async fn health(ctx: &ServerContext) -> HttpResult<Response<RespBody>> {
    let report = health_report(ctx.handler.retriever().as_ref()).await;
    health_check_response(&report).map_err(|e| HttpError::FailedToGenerateResponse(e.to_string()))
}
