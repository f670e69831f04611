//! Anthropic Claude provider, using the `anthropic-tools` crate.

use async_trait::async_trait;
use anthropic_tools::Messages;

use crate::error::{AppError, AppResult};
use crate::llm::traits::{LlmConfig, LlmProvider, Message, MessageRole};

const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

pub struct AnthropicProvider {
    default_model: String,
}

impl AnthropicProvider {
    pub fn new() -> Self {
        Self { default_model: DEFAULT_ANTHROPIC_MODEL.to_string() }
    }

    pub fn with_model(model: impl Into<String>) -> Self {
        Self { default_model: model.into() }
    }

    pub fn from_env() -> AppResult<Self> {
        std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| AppError::Config("ANTHROPIC_API_KEY environment variable not set".to_string()))?;
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_ANTHROPIC_MODEL.to_string());
        Ok(Self { default_model: model })
    }
}

impl Default for AnthropicProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, messages: Vec<Message>, config: &LlmConfig) -> AppResult<String> {
        let model = if config.model.is_empty() { self.default_model.clone() } else { config.model.clone() };

        let mut client = Messages::new();
        client.model(model.as_str()).max_tokens(config.max_tokens.unwrap_or(4096) as usize).temperature(config.temperature);

        for msg in messages {
            match msg.role {
                MessageRole::System => {
                    client.system(&msg.content);
                }
                MessageRole::User => {
                    client.user(&msg.content);
                }
                MessageRole::Assistant => {
                    client.assistant(&msg.content);
                }
            }
        }

        let response = client.post().await.map_err(|e| AppError::Llm(format!("Anthropic API error: {e}")))?;

        let text = response.get_text();
        if text.is_empty() {
            Err(AppError::Llm("no text response from Anthropic".to_string()))
        } else {
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_contains_claude() {
        let provider = AnthropicProvider::new();
        assert!(provider.default_model().contains("claude"));

        let provider = AnthropicProvider::with_model("claude-3-opus-20240229");
        assert_eq!(provider.default_model(), "claude-3-opus-20240229");
    }
}
