#![forbid(unsafe_code)]

pub mod chat;
pub mod config;
pub mod error;
pub mod fingerprinting;
pub mod llm;
pub mod retrieval;
pub mod security;
pub mod server;
pub mod stream;
pub mod telemetry;

pub use chat::{ChatHandler, ChatRequest, ConversationTurn, Role};
pub use config::{load_from_path, Config};
pub use error::{Result, SmartDocsError};
pub use llm::{LanguageModel, ModelRegistry, ModelType};
pub use retrieval::{RetrievedChunk, Retriever};
pub use server::{run, serve, ServerContext};
pub use stream::{AnswerRenderer, NdjsonDecoder, StreamEvent};
