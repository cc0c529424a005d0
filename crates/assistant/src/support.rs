//! Customer-support persona on top of a [`ChatModel`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use paksa_core::UserId;

use crate::client::ChatModel;
use crate::message::{ChatMessage, ChatReply, ChatRequest};
use crate::result::AssistantError;

/// Messages kept per user (user and assistant turns, system prompt excluded).
pub const HISTORY_LIMIT: usize = 20;

pub const MAX_MESSAGE_CHARS: usize = 4000;

pub const SYSTEM_PROMPT: &str = "You are Paksa, a friendly and professional customer-support \
assistant for an online store. Help customers with orders, shipping, returns, payments and \
product questions. Answer concisely, ask for an order number when one is needed, and never \
invent order details or policies you were not given. If a request needs a human, say that \
a support agent will follow up.";

type Histories = HashMap<UserId, VecDeque<ChatMessage>>;

pub struct SupportAssistant {
    model: Arc<dyn ChatModel>,
    histories: Mutex<Histories>,
}

impl std::fmt::Debug for SupportAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupportAssistant")
            .field("model", &self.model.model_name())
            .finish_non_exhaustive()
    }
}

impl SupportAssistant {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            histories: Mutex::new(HashMap::new()),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    fn histories(&self) -> Result<MutexGuard<'_, Histories>, AssistantError> {
        self.histories
            .lock()
            .map_err(|_| AssistantError::Internal("conversation history lock poisoned".into()))
    }

    pub fn history(&self, user: UserId) -> Vec<ChatMessage> {
        self.histories()
            .ok()
            .and_then(|h| h.get(&user).map(|q| q.iter().cloned().collect()))
            .unwrap_or_default()
    }

    pub fn clear_history(&self, user: UserId) -> Result<(), AssistantError> {
        self.histories()?.remove(&user);
        Ok(())
    }

    /// Send `message` on behalf of `user` and record the exchange.
    ///
    /// The exchange is only recorded when the model answers.
    pub async fn chat(&self, user: UserId, message: &str) -> Result<ChatReply, AssistantError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AssistantError::InvalidInput("message must not be empty".into()));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AssistantError::InvalidInput(format!(
                "message must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }

        let mut messages = Vec::with_capacity(HISTORY_LIMIT + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        if let Some(history) = self.histories()?.get(&user) {
            messages.extend(history.iter().cloned());
        }
        messages.push(ChatMessage::user(message));

        let reply = self.model.complete(ChatRequest { messages }).await?;

        let mut histories = self.histories()?;
        let history = histories.entry(user).or_default();
        history.push_back(ChatMessage::user(message));
        history.push_back(ChatMessage::assistant(reply.content.clone()));
        while history.len() > HISTORY_LIMIT {
            history.pop_front();
        }

        tracing::debug!(user = %user, turns = history.len(), "support chat exchange recorded");
        Ok(reply)
    }
}
