//! User account models.
//!
//! `UserRecord` is what storage holds; `UserView` is what the API returns.
//! The request models (`UserCreate`, `UserUpdate`, ...) carry their own
//! validation so every entry point enforces the same rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paksa_core::{DomainError, UserId};

use crate::password::validate_password_strength;
use crate::{TokenClaims, UserRole};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 50;

/// Basic structural email check: `local@domain.tld`, no whitespace.
pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let email = email.trim();
    let invalid = || DomainError::validation("invalid email format");

    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), DomainError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(DomainError::validation(format!(
            "username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(DomainError::validation(
            "username may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    Ok(())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// -------------------------
// Requests
// -------------------------

/// Account creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub role: UserRole,
    pub password: String,
}

impl UserCreate {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_email(&self.email)?;
        validate_username(&self.username)?;
        validate_password_strength(&self.password)
            .map_err(|e| DomainError::validation(e.to_string()))?;
        Ok(())
    }
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub disabled: Option<bool>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.full_name.is_none() && self.disabled.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserLogin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordReset {
    pub token: String,
    pub new_password: String,
}

// -------------------------
// Stored record
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub disabled: bool,
    pub role: UserRole,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Build a new record from a validated request and an already-hashed password.
    pub fn from_create(req: &UserCreate, hashed_password: String, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            email: normalize_email(&req.email),
            username: req.username.trim().to_string(),
            full_name: req
                .full_name
                .as_ref()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            disabled: req.disabled,
            role: req.role,
            hashed_password,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    /// Apply a validated update. Returns whether anything changed.
    pub fn apply_update(&mut self, update: &UserUpdate, now: DateTime<Utc>) -> bool {
        let mut changed = false;
        if let Some(email) = &update.email {
            let email = normalize_email(email);
            if email != self.email {
                self.email = email;
                changed = true;
            }
        }
        if let Some(name) = &update.full_name {
            let name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
            if name != self.full_name {
                self.full_name = name;
                changed = true;
            }
        }
        if let Some(disabled) = update.disabled {
            if disabled != self.disabled {
                self.disabled = disabled;
                changed = true;
            }
        }
        if changed {
            self.updated_at = now;
        }
        changed
    }

    pub fn is_active(&self) -> bool {
        !self.disabled
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            disabled: self.disabled,
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_login: self.last_login,
        }
    }
}

// -------------------------
// Responses
// -------------------------

/// Public representation of an account (no password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub disabled: bool,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// OAuth2-style token response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

impl Token {
    pub fn bearer(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            refresh_token,
            expires_in,
        }
    }
}

/// The parts of a verified token that handlers care about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub username: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl From<&TokenClaims> for TokenData {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            username: Some(claims.sub.clone()),
            scopes: claims.scopes.clone(),
        }
    }
}
