use serde::Deserialize;

/// Chat endpoint behavior
#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Number of most recent conversation turns forwarded to the model
    /// (one turn is one user or assistant message)
    /// Default: 10 (five exchanges)
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
    /// Number of chunks requested from the retriever
    /// Default: 3
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Capacity of the per-request event channel between the generation task
    /// and the HTTP response body
    /// Default: 32
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Largest accepted `POST /chat` body in bytes
    /// Default: 65536
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history_turns: default_max_history_turns(),
            top_k: default_top_k(),
            channel_capacity: default_channel_capacity(),
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

fn default_max_history_turns() -> usize {
    10
}

fn default_top_k() -> usize {
    3
}

fn default_channel_capacity() -> usize {
    32
}

fn default_max_request_bytes() -> usize {
    64 * 1024
}

/// External retriever (vector search sidecar)
#[derive(Debug, Deserialize, Clone)]
pub struct RetrieverConfig {
    /// Search endpoint, receives `{"query", "top_k"}` as JSON
    /// Default: "http://127.0.0.1:8001/search"
    #[serde(default = "default_retriever_url")]
    pub url: String,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self { url: default_retriever_url() }
    }
}

fn default_retriever_url() -> String {
    "http://127.0.0.1:8001/search".to_string()
}

/// Model backends, one section per supported `model_type`
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ModelsConfig {
    /// Cloud backend (`model_type = "gemini"`)
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Local backend (`model_type = "local"`)
    #[serde(default)]
    pub local: LocalModelConfig,
}

/// Google Gemini configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    /// Model name
    /// Default: "gemini-2.5-flash"
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Environment variable holding the API key.
    /// The key itself never appears in the configuration file.
    /// Default: "GOOGLE_API_KEY"
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// API base URL
    /// Default: "https://generativelanguage.googleapis.com/v1beta"
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// Sampling temperature
    /// Default: 0.2
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            api_key_env: default_api_key_env(),
            base_url: default_gemini_base_url(),
            temperature: default_temperature(),
        }
    }
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

/// Local Ollama configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LocalModelConfig {
    /// Ollama server base URL
    /// Default: "http://localhost:11434"
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// Model tag, must already be pulled on the Ollama server
    /// Default: "gemma:2b"
    #[serde(default = "default_ollama_model")]
    pub model: String,
    /// Sampling temperature
    /// Default: 0.2
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
            temperature: default_temperature(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "gemma:2b".to_string()
}
