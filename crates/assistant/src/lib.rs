//! `paksa-assistant`
//!
//! **Responsibility:** AI chat boundary for customer support.
//!
//! - [`ChatModel`] is the seam to any chat-completion backend.
//! - [`OpenAiChatClient`] speaks the OpenAI-compatible `/chat/completions` API.
//! - [`SupportAssistant`] owns the support persona and per-user history.
//!
//! Nothing here touches user storage or licensing; callers decide who may chat.

pub mod client;
pub mod message;
pub mod result;
pub mod support;

pub use client::{ChatModel, OpenAiChatClient};
pub use message::{ChatMessage, ChatReply, ChatRequest, ChatRole, Usage};
pub use result::AssistantError;
pub use support::{HISTORY_LIMIT, MAX_MESSAGE_CHARS, SYSTEM_PROMPT, SupportAssistant};
