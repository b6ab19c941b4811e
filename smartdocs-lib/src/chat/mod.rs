pub mod error;
pub mod handler;
pub mod history;
pub mod prompt;
pub mod types;

pub use error::ChatError;
pub use handler::{validate, ChatHandler, ChatSettings, ChatStream, Disposition, CHAT_ENDPOINT};
pub use history::trim;
pub use prompt::{build_prompt, FALLBACK_ANSWER};
pub use types::{ChatRequest, ConversationTurn, Role};
