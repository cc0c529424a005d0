//! Infrastructure layer: user storage, caching, outgoing mail.
//!
//! Every adapter has an in-memory implementation for dev/test and a
//! production backend (Postgres via `sqlx`, Redis behind the `redis` feature,
//! SMTP via `lettre`).

pub mod cache;
pub mod mailer;
pub mod user_store;

#[cfg(feature = "redis")]
pub use cache::RedisCache;
pub use cache::{Cache, CacheError, InMemoryCache, get_json, invalidate, set_json};
pub use mailer::{Email, LogMailer, MailError, Mailer, SmtpMailer};
pub use user_store::{
    InMemoryUserStore, PostgresUserStore, StoreError, UserStore, run_migrations,
};
