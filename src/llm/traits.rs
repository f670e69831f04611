//! Core traits for LLM providers: one capability, model-selector parameters
//! per call, no process-wide client singleton.

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{AppError, AppResult};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Per-call configuration for an LLM request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub model: String,
    pub top_p: Option<f32>,
    pub stop_sequences: Vec<String>,
    /// Request the provider return a JSON object (OpenAI-style `response_format`).
    pub json_mode: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: Some(4096),
            model: String::new(),
            top_p: None,
            stop_sequences: Vec::new(),
            json_mode: false,
        }
    }
}

impl LlmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

/// An LLM capability: chat completion, optional JSON decoding, optional
/// file-upload-mediated extraction (used by the PDF content fetcher).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    fn default_model(&self) -> &str;

    async fn complete(&self, messages: Vec<Message>, config: &LlmConfig) -> AppResult<String>;

    /// Uploads `file_bytes` (a PDF) to the provider's file API and asks for a
    /// structured textual extraction of its content. Providers that expose no
    /// file API return `AppError::LlmUnsupported`.
    async fn extract_file_text(
        &self,
        _file_bytes: &[u8],
        _file_name: &str,
        _config: &LlmConfig,
    ) -> AppResult<String> {
        Err(AppError::LlmUnsupported {
            provider: "unknown",
            capability: "file extraction",
        })
    }

}

/// Runs a completion and decodes the response as JSON, tolerating markdown
/// code fences. A free function (rather than a trait method) so `LlmProvider`
/// stays object-safe and callers can hold `Arc<dyn LlmProvider>`.
pub async fn complete_json<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    messages: Vec<Message>,
    config: &LlmConfig,
) -> AppResult<T> {
    let response = provider.complete(messages, config).await?;
    parse_json_response(&response)
}

/// Extracts a JSON payload from a response, tolerating markdown code fences.
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> AppResult<T> {
    let json_str = if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .unwrap_or(response)
    } else if response.contains("```") {
        response.split("```").nth(1).map(|s| s.trim()).unwrap_or(response)
    } else {
        response.trim()
    };

    serde_json::from_str(json_str).map_err(|e| {
        let preview: String = response.chars().take(500).collect();
        AppError::Llm(format!("failed to parse JSON response: {e}. response: {preview}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        let msg = Message::system("be terse");
        assert_eq!(msg.role, MessageRole::System);
        assert_eq!(msg.content, "be terse");
    }

    #[test]
    fn llm_config_builder() {
        let config = LlmConfig::new().with_temperature(0.7).with_max_tokens(2048).with_model("gpt-4o");
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.max_tokens, Some(2048));
        assert_eq!(config.model, "gpt-4o");
    }

    #[test]
    fn malformed_json_error_does_not_panic_on_multibyte_boundary() {
        let mut response = "not json ".to_string();
        response.push_str(&"\u{00e9}".repeat(600));
        let result: AppResult<serde_json::Value> = parse_json_response(&response);
        assert!(result.is_err());
    }
}
