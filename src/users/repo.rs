use async_trait::async_trait;
use sqlx::PgPool;

use crate::users::repo_types::Account;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already taken")]
    DuplicateKey,
    #[error(transparent)]
    Backend(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKey,
            _ => StoreError::Backend(e),
        }
    }
}

/// Persistent storage of accounts. Sole owner of account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Exact-match lookup, no side effects.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    /// Insert a new account; the store assigns `id` and `created_at`.
    async fn create(&self, email: &str, password_hash: &str) -> Result<Account, StoreError>;
    async fn list_all(&self) -> Result<Vec<Account>, StoreError>;
}

#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(account)
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<Account, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(account)
    }

    async fn list_all(&self) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
