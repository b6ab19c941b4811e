use http::StatusCode;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use serde_json::json;

use crate::error::{Result, SmartDocsError};

pub(crate) type RespBody = BoxBody<Bytes, hyper::Error>;

pub(crate) fn full_body(bytes: impl Into<Bytes>) -> RespBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}

pub(crate) fn empty_body() -> RespBody {
    full_body(Bytes::new())
}

/// Build an HTTP response with a 4xx or 5xx status and a JSON `{"error": ...}` body
pub(crate) fn synthetic_error_response(
    status_code: StatusCode,
    message: &str,
) -> Result<Response<RespBody>> {
    let body = serde_json::to_vec(&json!({ "error": message }))?;
    Response::builder()
        .status(status_code)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(full_body(body))
        .map_err(|e| SmartDocsError::Http(format!("Failed to build error response: {e}")))
}

/// Last-resort response when even the synthetic one cannot be built
pub(crate) fn internal_error_response() -> Response<RespBody> {
    let mut resp = Response::new(full_body("Internal Server Error"));
    *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    resp
}
