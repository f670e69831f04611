//! LLM capability: provider trait, provider implementations, and prompt
//! templates used by the relevance ranker and the reading engine.

mod prompts;
pub mod providers;
mod traits;

pub use prompts::Prompts;
pub use providers::{AnthropicProvider, OllamaProvider, OpenAiProvider};
pub use traits::{LlmConfig, LlmProvider, Message, MessageRole, complete_json, parse_json_response};
