use serde::Deserialize;

/// Security configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    /// Maximum number of concurrent connections allowed
    /// Default: 512
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Security headers configuration
    #[serde(default)]
    pub headers: SecurityHeaders,
    /// Cross-origin resource sharing configuration
    #[serde(default)]
    pub cors: CorsConfig,
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            headers: SecurityHeaders::default(),
            cors: CorsConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

fn default_max_connections() -> usize {
    512
}

/// A custom header added to every response
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CustomHeader {
    /// Header name (e.g. "X-Frame-Options")
    pub name: String,
    /// Header value (e.g. "DENY")
    pub value: String,
}

/// Security headers configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct SecurityHeaders {
    /// Custom headers to add to all responses
    #[serde(default)]
    pub custom: Vec<CustomHeader>,
    /// CSP (Content Security Policy) configuration
    #[serde(default)]
    pub csp: CspConfig,
}

/// CSP (Content Security Policy) configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CspConfig {
    /// Enable CSP
    #[serde(default)]
    pub enabled: bool,
    /// CSP policy string
    #[serde(default = "default_csp_policy")]
    pub policy: String,
}

impl Default for CspConfig {
    fn default() -> Self {
        Self { enabled: false, policy: default_csp_policy() }
    }
}

fn default_csp_policy() -> String {
    "default-src 'self'".to_string()
}

/// CORS configuration for browser front-ends
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CorsConfig {
    /// Origins allowed to call the API.
    /// A single `*` inside an entry matches any run of characters, so
    /// `"https://*.hf.space"` admits every Hugging Face Space.
    /// Default: local dev front-end, local Space testing, all `*.hf.space` origins
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Methods advertised on preflight responses
    /// Default: ["GET", "POST", "OPTIONS"]
    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: Vec<String>,
    /// Request headers advertised on preflight responses
    /// Default: ["content-type"]
    #[serde(default = "default_allowed_headers")]
    pub allowed_headers: Vec<String>,
    /// Emit `Access-Control-Allow-Credentials: true`
    /// Default: true
    #[serde(default = "default_true")]
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds
    /// Default: 600
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            allowed_methods: default_allowed_methods(),
            allowed_headers: default_allowed_headers(),
            allow_credentials: true,
            max_age_secs: default_max_age(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:7860".to_string(),
        "https://*.hf.space".to_string(),
    ]
}

fn default_allowed_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()]
}

fn default_allowed_headers() -> Vec<String> {
    vec!["content-type".to_string()]
}

fn default_max_age() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

/// Window counting algorithm
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitAlgorithm {
    /// Count requests in consecutive fixed windows that start at the first
    /// request of each window.
    /// Tolerates up to `2 * limit` requests straddling a window boundary.
    #[default]
    Fixed,
    /// Keep one timestamp per admitted request and count the ones inside the
    /// trailing window. Strict bound, more memory per key.
    Sliding,
}

impl RateLimitAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitAlgorithm::Fixed => "fixed",
            RateLimitAlgorithm::Sliding => "sliding",
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    /// Default: true
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Counting algorithm: "fixed" or "sliding"
    /// Default: "fixed"
    #[serde(default)]
    pub algorithm: RateLimitAlgorithm,
    /// Maximum requests per client fingerprint in one window
    /// Default: 10
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Window length in seconds
    /// Default: 60
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// How often expired per-client entries are swept from memory, in seconds
    /// Default: 60
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Per-endpoint overrides, matched on the exact request path
    /// Endpoints without an override use the global settings above
    #[serde(default)]
    pub endpoints: Vec<EndpointRateLimitConfig>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: RateLimitAlgorithm::default(),
            limit: default_limit(),
            window_seconds: default_window_seconds(),
            sweep_interval_secs: default_sweep_interval(),
            endpoints: Vec::new(),
        }
    }
}

/// Per-endpoint rate limiting configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EndpointRateLimitConfig {
    /// Request path this override applies to (e.g. "/chat")
    pub path: String,
    /// Enable rate limiting for this endpoint
    /// If not specified, inherits from global config
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Counting algorithm for this endpoint
    /// If not specified, uses global config
    #[serde(default)]
    pub algorithm: Option<RateLimitAlgorithm>,
    /// Request limit for this endpoint
    /// If not specified, uses global config
    pub limit: Option<u32>,
    /// Window length for this endpoint
    /// If not specified, uses global config
    pub window_seconds: Option<u64>,
}

fn default_limit() -> u32 {
    10
}

fn default_window_seconds() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    60
}
