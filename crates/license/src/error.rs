use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LicenseError {
    #[error("Invalid license key format")]
    InvalidKey(String),

    #[error("expiry must be between 1 and {max} days, got {days}")]
    InvalidExpiry { days: i64, max: i64 },

    #[error("failed to serialize license: {0}")]
    Serialize(String),

    #[error("license server unreachable: {0}")]
    Remote(String),

    #[error("license server returned {status}: {body}")]
    RemoteStatus { status: u16, body: String },
}
