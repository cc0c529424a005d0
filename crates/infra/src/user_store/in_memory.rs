use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use paksa_auth::UserRecord;
use paksa_core::UserId;

use super::{StoreError, UserStore};

/// In-memory account store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("user store lock poisoned".to_string())
    }

    fn find<F>(&self, pred: F) -> Result<Option<UserRecord>, StoreError>
    where
        F: Fn(&UserRecord) -> bool,
    {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.values().find(|u| pred(u)).cloned())
    }

    fn modify<F>(&self, id: UserId, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut UserRecord),
    {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        let user = map.get_mut(&id).ok_or(StoreError::NotFound)?;
        f(user);
        Ok(())
    }
}

fn ensure_unique<'a>(
    mut others: impl Iterator<Item = &'a UserRecord>,
    user: &UserRecord,
) -> Result<(), StoreError> {
    others.try_for_each(|other| {
        if other.id == user.id {
            return Ok(());
        }
        if other.username.eq_ignore_ascii_case(&user.username) {
            return Err(StoreError::Conflict("Username already registered".to_string()));
        }
        if other.email.eq_ignore_ascii_case(&user.email) {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }
        Ok(())
    })
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        if map.contains_key(&user.id) {
            return Err(StoreError::Conflict("user id already exists".to_string()));
        }
        ensure_unique(map.values(), &user)?;
        map.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let username = username.trim();
        self.find(|u| u.username.eq_ignore_ascii_case(username))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let email = email.trim();
        self.find(|u| u.email.eq_ignore_ascii_case(email))
    }

    async fn update(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        if !map.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        ensure_unique(map.values(), &user)?;

        let stored = map.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        stored.email = user.email;
        stored.full_name = user.full_name;
        stored.disabled = user.disabled;
        stored.role = user.role;
        stored.updated_at = user.updated_at;
        Ok(stored.clone())
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.modify(id, |u| u.last_login = Some(at))
    }

    async fn set_password(
        &self,
        id: UserId,
        hashed_password: String,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.modify(id, |u| {
            u.hashed_password = hashed_password;
            u.updated_at = at;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paksa_auth::{UserCreate, UserRole};

    fn record(username: &str, email: &str) -> UserRecord {
        let req = UserCreate {
            email: email.to_string(),
            username: username.to_string(),
            full_name: None,
            disabled: false,
            role: UserRole::Customer,
            password: "Secret123".to_string(),
        };
        UserRecord::from_create(&req, "hash".to_string(), Utc::now())
    }

    #[tokio::test]
    async fn insert_and_lookup() {
        let store = InMemoryUserStore::new();
        let user = store.insert(record("alice", "alice@example.com")).await.unwrap();

        assert_eq!(store.get(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(store.get_by_username("ALICE").await.unwrap(), Some(user.clone()));
        assert_eq!(store.get_by_email("Alice@Example.com").await.unwrap(), Some(user));
        assert_eq!(store.get_by_username("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicates_conflict() {
        let store = InMemoryUserStore::new();
        store.insert(record("alice", "alice@example.com")).await.unwrap();

        let err = store.insert(record("Alice", "other@example.com")).await.unwrap_err();
        assert_eq!(err, StoreError::Conflict("Username already registered".into()));

        let err = store.insert(record("bob", "alice@example.com")).await.unwrap_err();
        assert_eq!(err, StoreError::Conflict("Email already registered".into()));
    }

    #[tokio::test]
    async fn update_keeps_email_unique() {
        let store = InMemoryUserStore::new();
        store.insert(record("alice", "alice@example.com")).await.unwrap();
        let mut bob = store.insert(record("bob", "bob@example.com")).await.unwrap();

        bob.email = "alice@example.com".into();
        assert!(matches!(store.update(bob.clone()).await, Err(StoreError::Conflict(_))));

        bob.email = "robert@example.com".into();
        bob.full_name = Some("Robert".into());
        let updated = store.update(bob.clone()).await.unwrap();
        assert_eq!(updated.email, "robert@example.com");
        assert_eq!(updated.hashed_password, "hash");
    }

    #[tokio::test]
    async fn login_and_password_changes() {
        let store = InMemoryUserStore::new();
        let user = store.insert(record("alice", "alice@example.com")).await.unwrap();
        let at = Utc::now();

        store.record_login(user.id, at).await.unwrap();
        store.set_password(user.id, "new-hash".into(), at).await.unwrap();

        let stored = store.get(user.id).await.unwrap().unwrap();
        assert_eq!(stored.last_login, Some(at));
        assert_eq!(stored.hashed_password, "new-hash");

        let missing = store.record_login(UserId::new(), at).await.unwrap_err();
        assert_eq!(missing, StoreError::NotFound);
    }
}
