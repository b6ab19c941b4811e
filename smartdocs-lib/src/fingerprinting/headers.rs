/// Request header names read when deriving a client fingerprint
pub mod names {
    /// Header name for the client's declared user agent
    ///
    /// Combined with the resolved client address to tell apart browsers that
    /// share one public IP (same NAT or corporate proxy).
    pub const USER_AGENT: &str = "user-agent";
}

/// HTTP header names for X-Forwarded-* headers
///
/// These headers are set by the reverse proxy (or hosting platform) in front of
/// SmartDocs and carry the original client connection details.
pub mod forwarded {
    /// Header name for X-Forwarded-For
    ///
    /// Contains the client IP address(es) in a comma-separated list.
    /// Each proxy in the chain appends the address it received the request from,
    /// so the left-most entry is the originating client.
    pub const FOR: &str = "x-forwarded-for";
}
