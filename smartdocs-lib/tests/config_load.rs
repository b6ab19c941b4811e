use smartdocs_lib::config::{load_from_path, load_from_str, LogFormat, RateLimitAlgorithm};
use std::io::Write;
use tempfile::NamedTempFile;

type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

fn write_config(contents: &str) -> TestResult<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    write!(file, "{contents}")?;
    Ok(file)
}

#[test]
fn loads_minimal_config_with_defaults() -> TestResult<()> {
    let file = write_config(r#"listen = "127.0.0.1:0""#)?;
    let cfg = load_from_path(file.path())?;

    assert_eq!(cfg.listen.to_string(), "127.0.0.1:0");
    assert_eq!(cfg.chat.max_history_turns, 10);
    assert_eq!(cfg.chat.top_k, 3);
    assert_eq!(cfg.chat.max_request_bytes, 64 * 1024);
    assert_eq!(cfg.models.gemini.model, "gemini-2.5-flash");
    assert_eq!(cfg.models.gemini.api_key_env, "GOOGLE_API_KEY");
    assert_eq!(cfg.models.local.model, "gemma:2b");
    assert_eq!(cfg.security.rate_limit.algorithm, RateLimitAlgorithm::Fixed);
    assert_eq!(cfg.security.rate_limit.limit, 10);
    assert_eq!(cfg.security.rate_limit.window_seconds, 60);
    assert!(cfg.security.rate_limit.enabled);
    assert!(cfg
        .security
        .cors
        .allowed_origins
        .iter()
        .any(|origin| origin == "https://*.hf.space"));
    assert_eq!(cfg.telemetry.metrics_port, None);
    assert_eq!(cfg.logging.format, LogFormat::Text);
    Ok(())
}

#[test]
fn loads_full_config() -> TestResult<()> {
    let file = write_config(
        r#"
listen = "0.0.0.0:7860"

[chat]
max_history_turns = 6
top_k = 5

[retriever]
url = "http://vector-db:8001/search"

[models.gemini]
model = "gemini-2.0-pro"
api_key_env = "MY_GEMINI_KEY"

[models.local]
base_url = "http://ollama:11434"
model = "llama3:8b"

[logging]
level = "debug"
format = "json"

[timeout]
retrieval_ms = 1500
generation_secs = 30

[security.rate_limit]
algorithm = "sliding"
limit = 20
window_seconds = 120

[[security.rate_limit.endpoints]]
path = "/chat"
limit = 5

[security.cors]
allowed_origins = ["https://docs.example.com"]
allow_credentials = false

[[security.headers.custom]]
name = "X-Frame-Options"
value = "DENY"

[telemetry]
metrics_port = 9090
"#,
    )?;
    let cfg = load_from_path(file.path())?;

    assert_eq!(cfg.chat.max_history_turns, 6);
    assert_eq!(cfg.chat.top_k, 5);
    assert_eq!(cfg.retriever.url, "http://vector-db:8001/search");
    assert_eq!(cfg.models.gemini.api_key_env, "MY_GEMINI_KEY");
    assert_eq!(cfg.models.local.base_url, "http://ollama:11434");
    assert_eq!(cfg.logging.format, LogFormat::Json);
    assert!(cfg.logging.directive().starts_with("debug,hyper=warn"));
    assert_eq!(cfg.timeout.retrieval_ms, 1500);
    assert_eq!(cfg.timeout.generation_secs, 30);
    assert_eq!(cfg.security.rate_limit.algorithm, RateLimitAlgorithm::Sliding);
    assert_eq!(cfg.security.rate_limit.endpoints.len(), 1);
    assert_eq!(cfg.security.rate_limit.endpoints[0].limit, Some(5));
    assert_eq!(cfg.security.cors.allowed_origins, vec!["https://docs.example.com"]);
    assert!(!cfg.security.cors.allow_credentials);
    assert_eq!(cfg.security.headers.custom.len(), 1);
    assert_eq!(cfg.telemetry.metrics_port, Some(9090));
    Ok(())
}

#[test]
fn shipped_config_is_valid() -> TestResult<()> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/smartdocs.toml");
    let cfg = load_from_path(path)?;
    assert_eq!(cfg.listen.port(), 7860);
    Ok(())
}

#[test]
fn rejects_invalid_values() {
    let cases = [
        ("[chat]\nmax_history_turns = 0", "max_history_turns"),
        ("[chat]\ntop_k = 0", "top_k"),
        ("[chat]\nmax_request_bytes = 0", "max_request_bytes"),
        ("[retriever]\nurl = \" \"", "retriever.url"),
        ("[security.rate_limit]\nlimit = 0", "limit"),
        ("[security.rate_limit]\nwindow_seconds = 0", "window_seconds"),
        ("[[security.rate_limit.endpoints]]\npath = \"chat\"", "must start with '/'"),
        (
            "[[security.rate_limit.endpoints]]\npath = \"/chat\"\n[[security.rate_limit.endpoints]]\npath = \"/chat\"",
            "Duplicate",
        ),
        ("[timeout]\nretrieval_ms = 0", "timeout"),
        ("[timeout]\nidle_connection_secs = 0", "idle_connection_secs"),
        ("[[security.headers.custom]]\nname = \"bad header\"\nvalue = \"x\"", "security.headers"),
    ];

    for (section, needle) in cases {
        let toml = format!("listen = \"127.0.0.1:0\"\n{section}\n");
        match load_from_str(&toml) {
            Ok(_) => panic!("expected {section:?} to be rejected"),
            Err(e) => assert!(e.to_string().contains(needle), "{section:?}: {e}"),
        }
    }
}

#[test]
fn idle_limit_accepts_former_key() -> TestResult<()> {
    let cfg = load_from_str("listen = \"127.0.0.1:0\"\n[timeout]\nconnection_handling_secs = 45\n")?;
    assert_eq!(cfg.timeout.idle_connection_secs, 45);

    let cfg = load_from_str("listen = \"127.0.0.1:0\"\n")?;
    assert_eq!(cfg.timeout.idle_connection_secs, 60);
    Ok(())
}

#[test]
fn rejects_unknown_algorithm_and_missing_listen() {
    let bad_algorithm = "listen = \"127.0.0.1:0\"\n[security.rate_limit]\nalgorithm = \"token_bucket\"\n";
    assert!(load_from_str(bad_algorithm).is_err());
    assert!(load_from_str("[chat]\ntop_k = 3\n").is_err());
}

#[test]
fn missing_file_is_a_config_error() {
    match load_from_path("/definitely/not/here/smartdocs.toml") {
        Ok(_) => panic!("expected an error"),
        Err(e) => assert!(e.to_string().contains("Failed to read config file")),
    }
}
