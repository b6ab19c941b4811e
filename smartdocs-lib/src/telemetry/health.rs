use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use hyper::StatusCode;
use serde::Serialize;
use serde_json::json;

use crate::error::{Result, SmartDocsError};
use crate::retrieval::Retriever;

type RespBody = BoxBody<Bytes, hyper::Error>;

/// Environment variable selecting the reported environment
pub const ENV_VAR: &str = "SMARTDOCS_ENV";
/// Set by the hosting platform on Hugging Face Spaces
pub const HF_SPACE_VAR: &str = "HF_SPACE";

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub retriever: &'static str,
    pub environment: &'static str,
}

/// `"production"` when `SMARTDOCS_ENV=production` or `HF_SPACE` is set
pub fn environment() -> &'static str {
    let production = std::env::var(ENV_VAR).is_ok_and(|v| v.eq_ignore_ascii_case("production"))
        || std::env::var_os(HF_SPACE_VAR).is_some();
    if production {
        "production"
    } else {
        "development"
    }
}

pub async fn health_report(retriever: &dyn Retriever) -> HealthReport {
    let retriever = if retriever.health_check().await { "connected" } else { "unreachable" };
    HealthReport {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        retriever,
        environment: environment(),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<RespBody>> {
    let body_bytes = serde_json::to_vec(body)?;
    let body = Full::new(Bytes::from(body_bytes))
        .map_err(|never| match never {})
        .boxed();

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body)
        .map_err(|e| SmartDocsError::Http(format!("Failed to build health response: {e}")))
}

/// Health check response - 200 while the process is running; the retriever
/// state is reported in the body
pub fn health_check_response(report: &HealthReport) -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, report)
}

/// Readiness check - 200 when the retriever answers, 503 otherwise
pub fn ready_check_response(retriever_reachable: bool) -> Result<Response<RespBody>> {
    if retriever_reachable {
        json_response(StatusCode::OK, &json!({"status": "ready"}))
    } else {
        json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &json!({"status": "not_ready", "reason": "retriever_unreachable"}),
        )
    }
}

/// Liveness check - always returns 200 if process is running
pub fn live_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &json!({"status": "alive"}))
}
