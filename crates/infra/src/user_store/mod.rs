//! Account storage abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use paksa_auth::UserRecord;
use paksa_core::{DomainError, UserId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryUserStore;
pub use postgres::{PostgresUserStore, run_migrations};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Username or email already taken.
    #[error("{0}")]
    Conflict(String),

    #[error("user not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => DomainError::conflict(msg),
            StoreError::NotFound => DomainError::not_found(),
            StoreError::Backend(msg) => DomainError::invariant(msg),
        }
    }
}

/// Persistent account store.
///
/// Usernames and emails are unique, compared case-insensitively.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: UserRecord) -> Result<UserRecord, StoreError>;

    async fn get(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Replace profile fields (email, full name, disabled, role, updated_at).
    async fn update(&self, user: UserRecord) -> Result<UserRecord, StoreError>;

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn set_password(
        &self,
        id: UserId,
        hashed_password: String,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
