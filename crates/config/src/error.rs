use thiserror::Error;

/// Configuration failure. Always names the offending key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: invalid value '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key}: {reason}")]
    Insecure { key: &'static str, reason: String },

    #[error("failed to load .env file: {0}")]
    DotEnv(String),
}

impl ConfigError {
    pub fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn key(&self) -> Option<&'static str> {
        match self {
            ConfigError::Invalid { key, .. } | ConfigError::Insecure { key, .. } => Some(key),
            ConfigError::DotEnv(_) => None,
        }
    }
}
