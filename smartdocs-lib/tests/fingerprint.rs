use http::{HeaderMap, HeaderValue};
use smartdocs_lib::fingerprinting::{fingerprint, forwarded, from_request, names};
use std::net::SocketAddr;

const UA: &str = "Mozilla/5.0 X";

fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(*name, HeaderValue::from_static(value));
    }
    map
}

#[test]
fn identical_inputs_give_identical_keys() {
    let first = fingerprint("1.2.3.4", Some("fwd=1.2.3.4"), Some(UA));
    let second = fingerprint("1.2.3.4", Some("fwd=1.2.3.4"), Some(UA));
    assert_eq!(first, second);
}

#[test]
fn malformed_forwarded_for_uses_connection_address() {
    let malformed = fingerprint("1.2.3.4", Some("fwd=1.2.3.4"), Some(UA));
    let plain = fingerprint("1.2.3.4", None, Some(UA));
    assert_eq!(malformed, plain);
}

#[test]
fn address_or_user_agent_change_the_key() {
    let base = fingerprint("1.2.3.4", None, Some(UA));
    assert_ne!(base, fingerprint("1.2.3.5", None, Some(UA)));
    assert_ne!(base, fingerprint("1.2.3.4", None, Some("Mozilla/5.0 Y")));
    assert_ne!(base, fingerprint("1.2.3.4", None, None));
}

#[test]
fn forwarded_client_overrides_connection_address() {
    let via_proxy = fingerprint("10.0.0.1", Some("203.0.113.9, 10.0.0.1"), Some(UA));
    let direct = fingerprint("203.0.113.9", None, Some(UA));
    assert_eq!(via_proxy, direct);
}

#[test]
fn component_boundary_is_unambiguous() {
    let a = fingerprint("client\nA", None, Some("B"));
    let b = fingerprint("client", None, Some("A\nB"));
    assert_ne!(a, b);
    assert_ne!(fingerprint("ab", None, Some("c")), fingerprint("a", None, Some("bc")));
}

#[test]
fn missing_user_agent_is_empty_user_agent() {
    assert_eq!(fingerprint("1.2.3.4", None, None), fingerprint("1.2.3.4", None, Some("")));
}

#[test]
fn key_does_not_contain_raw_metadata() {
    let fp = fingerprint("198.51.100.23", None, Some(UA));
    assert_eq!(fp.as_str().len(), 64);
    assert!(!fp.as_str().contains("198.51.100.23"));
    assert!(!fp.as_str().contains("Mozilla"));
}

#[test]
fn request_headers_feed_the_fingerprint() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let peer: SocketAddr = "10.0.0.1:51234".parse()?;
    let map = headers(&[(forwarded::FOR, "203.0.113.9"), (names::USER_AGENT, UA)]);
    assert_eq!(from_request(peer, &map), fingerprint("203.0.113.9", None, Some(UA)));

    // Source port does not matter.
    let other_port: SocketAddr = "10.0.0.1:40000".parse()?;
    let bare = headers(&[(names::USER_AGENT, UA)]);
    assert_eq!(from_request(peer, &bare), from_request(other_port, &bare));
    assert_eq!(from_request(peer, &bare), fingerprint("10.0.0.1", None, Some(UA)));
    Ok(())
}
