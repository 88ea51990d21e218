pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiCompatProvider;
pub use provider::{CompletionStream, LlmProvider};
pub use types::{ChatMessage, ChatRole};
