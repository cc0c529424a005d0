use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssistantError {
    #[error("invalid chat input: {0}")]
    InvalidInput(String),

    #[error("chat model request failed: {0}")]
    Transport(String),

    /// Non-2xx response from the model endpoint.
    #[error("chat model returned HTTP {0}: {1}")]
    Upstream(u16, String),

    #[error("unexpected chat model response: {0}")]
    Decode(String),

    #[error("assistant state unavailable: {0}")]
    Internal(String),
}
