use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::users::repo::{AccountStore, StoreError};
use crate::users::repo_types::Account;

/// Vec-backed store for tests. Uniqueness is checked under the same lock as the insert.
#[derive(Default)]
pub struct InMemoryAccountStore {
    rows: Mutex<Vec<Account>>,
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.iter().find(|a| a.email == email).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<Account, StoreError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        if rows.iter().any(|a| a.email == email) {
            return Err(StoreError::DuplicateKey);
        }
        let account = Account {
            id: rows.len() as i64 + 1,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(account.clone());
        Ok(account)
    }

    async fn list_all(&self) -> Result<Vec<Account>, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn assigns_sequential_ids_and_rejects_duplicates() {
        let store = InMemoryAccountStore::default();
        let a = store.create("a@example.com", "h1").await.unwrap();
        let b = store.create("b@example.com", "h2").await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        let err = store.create("a@example.com", "h3").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey));
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn lookup_is_exact_match() {
        let store = InMemoryAccountStore::default();
        store.create("User@example.com", "h").await.unwrap();
        assert!(store.find_by_email("User@example.com").await.unwrap().is_some());
        assert!(store.find_by_email("user@example.com").await.unwrap().is_none());
    }
}
