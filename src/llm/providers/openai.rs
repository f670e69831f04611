//! OpenAI-compatible chat-completions provider, using the `openai-tools` crate.
//!
//! The `base_url` override also covers the OpenAI-compatible third-party
//! endpoints the original pipeline supported (e.g. DeepSeek), since
//! `openai.base_url` in the pipeline config is passed straight through.

use async_trait::async_trait;
use openai_tools::chat::request::ChatCompletion;
use openai_tools::common::message::Message as OpenAiMessage;
use openai_tools::common::role::Role as OpenAiRole;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::llm::traits::{LlmConfig, LlmProvider, Message, MessageRole};

pub struct OpenAiProvider {
    default_model: String,
    base_url: String,
}

impl OpenAiProvider {
    /// The API key is read by the underlying `openai-tools` crate from
    /// `OPENAI_API_KEY`; the pipeline's config loader is responsible for
    /// exporting it before construction.
    pub fn new(default_model: impl Into<String>) -> Self {
        Self { default_model: default_model.into(), base_url: "https://api.openai.com/v1".to_string() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn from_env() -> AppResult<Self> {
        std::env::var("OPENAI_API_KEY")
            .map_err(|_| AppError::Config("OPENAI_API_KEY environment variable not set".to_string()))?;
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        Ok(Self::new(model).with_base_url(base_url))
    }

    fn convert_message(msg: Message) -> OpenAiMessage {
        let role = match msg.role {
            MessageRole::System => OpenAiRole::System,
            MessageRole::User => OpenAiRole::User,
            MessageRole::Assistant => OpenAiRole::Assistant,
        };
        OpenAiMessage::from_string(role, msg.content)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, messages: Vec<Message>, config: &LlmConfig) -> AppResult<String> {
        let model = if config.model.is_empty() { self.default_model.clone() } else { config.model.clone() };
        let openai_messages: Vec<OpenAiMessage> = messages.into_iter().map(Self::convert_message).collect();

        let mut chat = ChatCompletion::new();
        chat.model_id(&model).messages(openai_messages).temperature(config.temperature);
        if let Some(max_tokens) = config.max_tokens {
            chat.max_completion_tokens(max_tokens as u64);
        }

        let response = chat.chat().await.map_err(|e| AppError::Llm(format!("OpenAI API error: {e}")))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .and_then(|c| c.text)
            .ok_or_else(|| AppError::Llm("no response from OpenAI".to_string()))
    }

    /// Uploads the PDF to the files endpoint, then asks a chat completion to
    /// transcribe/extract its content via `file_id` input. Raw `reqwest` is
    /// used here because `openai-tools` exposes no file-upload capability.
    async fn extract_file_text(&self, file_bytes: &[u8], file_name: &str, config: &LlmConfig) -> AppResult<String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AppError::Config("OPENAI_API_KEY environment variable not set".to_string()))?;
        let client = reqwest::Client::new();

        let part = Part::bytes(file_bytes.to_vec()).file_name(file_name.to_string());
        let form = Form::new().text("purpose", "assistants").part("file", part);

        let upload: UploadResponse = client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("OpenAI file upload failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("OpenAI file upload response parse failed: {e}")))?;

        let model = if config.model.is_empty() { self.default_model.clone() } else { config.model.clone() };
        let body = serde_json::json!({
            "model": model,
            "input": [{
                "role": "user",
                "content": [
                    {"type": "input_file", "file_id": upload.id},
                    {"type": "input_text", "text": "Extract the full readable text content of this paper, preserving section structure."},
                ],
            }],
        });

        let resp = client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("OpenAI file extraction request failed: {e}")));

        let delete_result = client.delete(format!("{}/files/{}", self.base_url, upload.id)).bearer_auth(&api_key).send().await;
        if let Err(e) = delete_result {
            tracing::warn!("failed to delete uploaded OpenAI file {}: {e}", upload.id);
        }

        let resp = resp?;
        let extraction: ExtractionResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("OpenAI file extraction response parse failed: {e}")))?;

        extraction
            .output_text()
            .ok_or_else(|| AppError::Llm("OpenAI file extraction returned no text".to_string()))
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Deserialize)]
struct ExtractionResponse {
    output: Vec<ExtractionOutputItem>,
}

#[derive(Deserialize)]
struct ExtractionOutputItem {
    content: Vec<ExtractionContent>,
}

#[derive(Deserialize)]
struct ExtractionContent {
    text: Option<String>,
}

impl ExtractionResponse {
    fn output_text(&self) -> Option<String> {
        let joined: String = self
            .output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter_map(|c| c.text.clone())
            .collect::<Vec<_>>()
            .join("\n");
        if joined.trim().is_empty() { None } else { Some(joined) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name_and_model() {
        let provider = OpenAiProvider::new("gpt-4o-mini");
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.default_model(), "gpt-4o-mini");
    }
}
