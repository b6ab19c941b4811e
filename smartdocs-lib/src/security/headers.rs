//! Static headers stamped on every public response.

use http::header::CONTENT_SECURITY_POLICY;
use http::{HeaderName, HeaderValue, Response};
use thiserror::Error;

use crate::config::SecurityHeaders;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid response header {name:?}: {reason}")]
pub struct InvalidHeader {
    pub name: String,
    pub reason: String,
}

/// Parsed `[security.headers]`: custom headers first, then the CSP when enabled.
/// A later entry with the same name replaces an earlier one.
#[derive(Debug, Clone, Default)]
pub struct ResponseHeaders {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl ResponseHeaders {
    pub fn from_config(config: &SecurityHeaders) -> Result<Self, InvalidHeader> {
        let mut entries = Vec::with_capacity(config.custom.len() + 1);
        for header in &config.custom {
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(|e| InvalidHeader {
                name: header.name.clone(),
                reason: e.to_string(),
            })?;
            let value = HeaderValue::from_str(&header.value).map_err(|e| InvalidHeader {
                name: header.name.clone(),
                reason: e.to_string(),
            })?;
            entries.push((name, value));
        }

        if config.csp.enabled {
            let policy = HeaderValue::from_str(&config.csp.policy).map_err(|e| InvalidHeader {
                name: CONTENT_SECURITY_POLICY.to_string(),
                reason: e.to_string(),
            })?;
            entries.push((CONTENT_SECURITY_POLICY, policy));
        }

        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn apply<T>(&self, response: &mut Response<T>) {
        let headers = response.headers_mut();
        for (name, value) in &self.entries {
            headers.insert(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CspConfig, CustomHeader};

    fn custom(name: &str, value: &str) -> CustomHeader {
        CustomHeader { name: name.to_string(), value: value.to_string() }
    }

    #[test]
    fn custom_headers_and_csp_are_applied() {
        let config = SecurityHeaders {
            custom: vec![custom("X-Frame-Options", "DENY")],
            csp: CspConfig { enabled: true, policy: "default-src 'none'".to_string() },
        };
        let headers = match ResponseHeaders::from_config(&config) {
            Ok(headers) => headers,
            Err(e) => panic!("valid headers rejected: {e}"),
        };

        let mut response = Response::new(());
        headers.apply(&mut response);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(response.headers()["content-security-policy"], "default-src 'none'");
    }

    #[test]
    fn disabled_csp_adds_nothing() {
        let headers = match ResponseHeaders::from_config(&SecurityHeaders::default()) {
            Ok(headers) => headers,
            Err(e) => panic!("default headers rejected: {e}"),
        };
        assert!(headers.is_empty());

        let mut response = Response::new(());
        headers.apply(&mut response);
        assert!(response.headers().is_empty());
    }

    #[test]
    fn later_duplicate_wins_over_handler_header() {
        let config = SecurityHeaders {
            custom: vec![custom("Cache-Control", "no-store"), custom("cache-control", "private")],
            csp: CspConfig::default(),
        };
        let headers = match ResponseHeaders::from_config(&config) {
            Ok(headers) => headers,
            Err(e) => panic!("valid headers rejected: {e}"),
        };

        let mut response = Response::new(());
        response.headers_mut().insert("cache-control", HeaderValue::from_static("no-cache"));
        headers.apply(&mut response);
        assert_eq!(response.headers()["cache-control"], "private");
    }

    #[test]
    fn malformed_name_is_rejected() {
        let config = SecurityHeaders { custom: vec![custom("bad header", "x")], csp: CspConfig::default() };
        match ResponseHeaders::from_config(&config) {
            Err(e) => assert_eq!(e.name, "bad header"),
            Ok(_) => panic!("expected the header to be rejected"),
        }
    }
}
