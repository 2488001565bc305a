//! User record lookup and creation.
//!
//! The auth manager only reads user records (password login, session
//! verification) or finds-or-creates them (OAuth2 login).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::PgPool;

use super::AuthError;
use crate::models::auth::{NewUser, UserRecord};
use crate::uuid::uuidv7;

/// Collaborator owning user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;

    /// Find the user linked to `external_id` at `provider`.
    async fn find_by_oauth_id(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<UserRecord>, AuthError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, AuthError>;

    async fn create(&self, user: NewUser) -> Result<UserRecord, AuthError>;
}

// =============================================================================
// PostgreSQL repository
// =============================================================================

type UserRow = (
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
);

const USER_COLUMNS: &str =
    "id::text, email, name, password_hash, oauth_id, oauth_provider, created_at";

fn from_row(row: UserRow) -> UserRecord {
    let (id, email, name, password_hash, oauth_id, oauth_provider, created_at) = row;
    UserRecord {
        id,
        email,
        name,
        password_hash,
        oauth_id,
        oauth_provider,
        created_at,
    }
}

/// User repository backed by the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }

    async fn find_by_oauth_id(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE oauth_provider = $1 AND oauth_id = $2"
        ))
        .bind(provider)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, AuthError> {
        let Ok(uuid) = id.parse::<uuid::Uuid>() else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, email, name, password_hash, oauth_id, oauth_provider) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(uuidv7())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.oauth_id)
        .bind(&user.oauth_provider)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AuthError::Conflict(format!("user already exists: {}", db.message()))
            }
            other => AuthError::DbError(other),
        })?;
        Ok(from_row(row))
    }
}

// =============================================================================
// In-memory repository
// =============================================================================

/// In-process user repository, keyed by user id.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: DashMap<String, UserRecord>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn find(&self, pred: impl Fn(&UserRecord) -> bool) -> Option<UserRecord> {
        self.users
            .iter()
            .find(|entry| pred(entry.value()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.find(|u| u.email.as_deref() == Some(email)))
    }

    async fn find_by_oauth_id(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.find(|u| {
            u.oauth_provider.as_deref() == Some(provider)
                && u.oauth_id.as_deref() == Some(external_id)
        }))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, AuthError> {
        if let Some(email) = user.email.as_deref()
            && self.find(|u| u.email.as_deref() == Some(email)).is_some()
        {
            return Err(AuthError::Conflict(format!(
                "email already registered: {email}"
            )));
        }
        let record = UserRecord {
            id: uuidv7().to_string(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            oauth_id: user.oauth_id,
            oauth_provider: user.oauth_provider,
            created_at: Utc::now(),
        };
        self.users.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}
