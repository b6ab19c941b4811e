use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ORIGIN, VARY,
};
use http::{HeaderMap, HeaderValue, Response};

use crate::config::CorsConfig;

/// Match an origin against one configured pattern.
///
/// A pattern without `*` must equal the origin. A single `*` matches any
/// non-empty run of characters, so `https://*.hf.space` admits
/// `https://team-app.hf.space` but not `https://hf.space`.
pub fn origin_matches(pattern: &str, origin: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern.eq_ignore_ascii_case(origin),
        Some((prefix, suffix)) => {
            origin.len() > prefix.len() + suffix.len()
                && origin
                    .get(..prefix.len())
                    .is_some_and(|p| p.eq_ignore_ascii_case(prefix))
                && origin
                    .get(origin.len() - suffix.len()..)
                    .is_some_and(|s| s.eq_ignore_ascii_case(suffix))
        }
    }
}

/// The request's `Origin` when it is allowed by `config`
pub fn allowed_origin<'a>(headers: &'a HeaderMap, config: &CorsConfig) -> Option<&'a str> {
    let origin = headers.get(ORIGIN)?.to_str().ok()?;
    config
        .allowed_origins
        .iter()
        .any(|pattern| origin_matches(pattern, origin))
        .then_some(origin)
}

/// Add CORS headers for an allowed origin to a regular response
pub fn apply_cors_headers<T>(response: &mut Response<T>, origin: Option<&str>, config: &CorsConfig) {
    let headers = response.headers_mut();
    headers.append(VARY, HeaderValue::from_static("origin"));

    let Some(origin) = origin else {
        return;
    };
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    if config.allow_credentials {
        headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    }
}

/// Add the preflight-only CORS headers (methods, headers, max age)
pub fn apply_preflight_headers<T>(response: &mut Response<T>, config: &CorsConfig) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&config.allowed_methods.join(", ")) {
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    if let Ok(value) = HeaderValue::from_str(&config.allowed_headers.join(", ")) {
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, value);
    }
    if let Ok(value) = HeaderValue::from_str(&config.max_age_secs.to_string()) {
        headers.insert(ACCESS_CONTROL_MAX_AGE, value);
    }
}
