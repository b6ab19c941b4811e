use futures::StreamExt;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderName, HeaderValue, StatusCode};
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::Response;
use tracing::error;

use super::http_result::{HttpError, HttpResult};
use super::synthetic_response::RespBody;
use crate::chat::{ChatStream, Disposition};
use crate::stream::{encode, EventStream, RateLimitInfo, StreamEvent, CONTENT_TYPE as NDJSON};

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

const ENCODE_FAILURE_LINE: &[u8] =
    b"{\"type\":\"error\",\"message\":\"Something went wrong while answering.\",\"kind\":\"internal\"}\n";

fn event_frame(event: StreamEvent) -> Result<Frame<Bytes>, hyper::Error> {
    let line = encode(&event).unwrap_or_else(|e| {
        error!(error = %e, event = event.name(), "failed to encode stream event");
        Bytes::from_static(ENCODE_FAILURE_LINE)
    });
    Ok(Frame::data(line))
}

/// Response body writing one NDJSON line per event as it arrives
pub(crate) fn ndjson_body(events: EventStream) -> RespBody {
    BodyExt::boxed(StreamBody::new(events.map(event_frame)))
}

/// Status code for a chat stream's disposition
pub fn status_for(disposition: &Disposition) -> StatusCode {
    match disposition {
        Disposition::Streaming => StatusCode::OK,
        Disposition::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        Disposition::InvalidRequest => StatusCode::BAD_REQUEST,
    }
}

fn insert_number(response: &mut Response<RespBody>, name: &'static str, value: u64) {
    response
        .headers_mut()
        .insert(HeaderName::from_static(name), HeaderValue::from(value));
}

fn apply_rate_limit_headers(response: &mut Response<RespBody>, info: &RateLimitInfo) {
    insert_number(response, X_RATELIMIT_LIMIT, u64::from(info.limit));
    insert_number(response, X_RATELIMIT_REMAINING, u64::from(info.remaining));
    insert_number(response, X_RATELIMIT_RESET, info.retry_after_secs);
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(info.retry_after_secs));
}

/// Streaming NDJSON response with an explicit status
pub(crate) fn ndjson_response(status: StatusCode, events: EventStream) -> HttpResult<Response<RespBody>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, NDJSON)
        .header(CACHE_CONTROL, "no-cache")
        .header(HeaderName::from_static("x-accel-buffering"), "no")
        .body(ndjson_body(events))
        .map_err(|e| HttpError::FailedToGenerateResponse(e.to_string()))
}

/// HTTP response for a chat stream: status from the disposition, rate-limit
/// headers when limited, NDJSON body in every case
pub(crate) fn chat_response(stream: ChatStream) -> HttpResult<Response<RespBody>> {
    let mut response = ndjson_response(status_for(&stream.disposition), stream.events)?;
    if let Disposition::RateLimited(info) = &stream.disposition {
        apply_rate_limit_headers(&mut response, info);
    }
    Ok(response)
}
