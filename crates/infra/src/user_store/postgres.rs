//! Postgres-backed account store.
//!
//! Schema lives in `migrations/` at the workspace root and is applied by
//! [`run_migrations`] (`paksa-api migrate`). Uniqueness is enforced by the
//! database (`users_username_key`, `users_email_key` on lower-cased columns).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use paksa_auth::{UserRecord, UserRole};
use paksa_core::UserId;

use super::{StoreError, UserStore};

const USER_COLUMNS: &str = "id, email, username, full_name, disabled, role, hashed_password, \
                            created_at, updated_at, last_login";

/// Apply pending schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        value: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause} = lower($1)");
        let row = sqlx::query(&sql)
            .bind(value.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        row.map(|r| row_to_user(&r)).transpose()
    }
}

fn map_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let msg = match db.constraint() {
                Some(c) if c.contains("email") => "Email already registered",
                Some(c) if c.contains("username") => "Username already registered",
                _ => "user already exists",
            };
            return StoreError::Conflict(msg.to_string());
        }
    }
    StoreError::Backend(e.to_string())
}

fn row_to_user(row: &PgRow) -> Result<UserRecord, StoreError> {
    let role: String = row.try_get("role").map_err(map_err)?;
    let role = role
        .parse::<UserRole>()
        .map_err(StoreError::Backend)?;
    let id: uuid::Uuid = row.try_get("id").map_err(map_err)?;

    Ok(UserRecord {
        id: UserId::from_uuid(id),
        email: row.try_get("email").map_err(map_err)?,
        username: row.try_get("username").map_err(map_err)?,
        full_name: row.try_get("full_name").map_err(map_err)?,
        disabled: row.try_get("disabled").map_err(map_err)?,
        role,
        hashed_password: row.try_get("hashed_password").map_err(map_err)?,
        created_at: row.try_get("created_at").map_err(map_err)?,
        updated_at: row.try_get("updated_at").map_err(map_err)?,
        last_login: row.try_get("last_login").map_err(map_err)?,
    })
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn insert(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        sqlx::query(
            "INSERT INTO users (id, email, username, full_name, disabled, role, hashed_password, \
             created_at, updated_at, last_login) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(user.disabled)
        .bind(user.role.as_str())
        .bind(&user.hashed_password)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.fetch_one_where("lower(username)", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.fetch_one_where("lower(email)", email).await
    }

    async fn update(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        let sql = format!(
            "UPDATE users SET email = $2, full_name = $3, disabled = $4, role = $5, updated_at = $6 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user.id.as_uuid())
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(user.disabled)
            .bind(user.role.as_str())
            .bind(user.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .ok_or(StoreError::NotFound)?;
        row_to_user(&row)
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_password(
        &self,
        id: UserId,
        hashed_password: String,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE users SET hashed_password = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(hashed_password)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
