//! Chat-completion backends.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::message::{ChatReply, ChatRequest, Usage};
use crate::result::AssistantError;

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatReply, AssistantError>;

    fn model_name(&self) -> &str;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: reqwest::Client,
    chat_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChatClient {
    /// `base_url` ends before `/chat/completions`, e.g. `https://api.openai.com/v1`.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AssistantError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            chat_url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            max_tokens,
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatReply, AssistantError> {
        if request.messages.is_empty() {
            return Err(AssistantError::InvalidInput("no messages".into()));
        }

        let body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        tracing::debug!(model = %self.model, messages = request.messages.len(), "chat completion request");

        let resp = self
            .client
            .post(&self.chat_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AssistantError::Upstream(status.as_u16(), text));
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| AssistantError::Decode(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AssistantError::Decode("response has no choices".into()))?;

        Ok(ChatReply {
            content,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            usage: parsed.usage,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
