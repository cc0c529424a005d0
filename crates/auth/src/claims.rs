use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use paksa_core::UserId;

use crate::jwt::TokenError;
use crate::{UserRole, permissions_for};

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    PasswordReset,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::PasswordReset => "password_reset",
        }
    }
}

/// JWT claims carried by every token the service issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Username of the subject.
    pub sub: String,

    pub uid: UserId,

    pub role: UserRole,

    /// Permissions granted by the role at issue time.
    #[serde(default)]
    pub scopes: Vec<String>,

    pub token_type: TokenKind,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,

    /// Expiry, seconds since the epoch.
    pub exp: i64,

    /// Fingerprint of the password hash; binds reset tokens to one password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pwd: Option<String>,
}

impl TokenClaims {
    /// Claims for `username` valid from `now` for `ttl`.
    ///
    /// Fails when `now + ttl` is not a representable instant.
    pub fn new(
        kind: TokenKind,
        username: impl Into<String>,
        uid: UserId,
        role: UserRole,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, TokenError> {
        let exp = now
            .checked_add_signed(ttl)
            .ok_or(TokenError::LifetimeOutOfRange)?;
        Ok(Self {
            sub: username.into(),
            uid,
            role,
            scopes: permissions_for(role)
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
            token_type: kind,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            pwd: None,
        })
    }

    pub fn with_password_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.pwd = Some(fingerprint.into());
        self
    }

    /// Seconds between issue and expiry.
    pub fn lifetime_secs(&self) -> i64 {
        self.exp - self.iat
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Allowed clock skew when checking `iat`.
pub const CLOCK_SKEW_SECS: i64 = 30;

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens before this, in [`crate::JwtCodec`].
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now + CLOCK_SKEW_SECS < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
