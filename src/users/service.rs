use std::sync::{Arc, OnceLock};

use anyhow::Context;
use tracing::{debug, info, instrument, warn};

use crate::config::HashingConfig;
use crate::users::{
    password::{hash_password, verify_password},
    repo::{AccountStore, StoreError},
    repo_types::AccountView,
};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("email already exists")]
    EmailAlreadyExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("internal failure: {0:#}")]
    Internal(anyhow::Error),
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        AccountError::Internal(e.into())
    }
}

const DUMMY_PASSWORD: &str = "dummy-password-for-unknown-accounts";

/// Register/login/list rules on top of an [`AccountStore`]. Holds no per-call state.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    hashing: HashingConfig,
    // Hashed with the live work factor on first use; unknown-email logins verify against it.
    dummy_hash: Arc<OnceLock<String>>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>, hashing: HashingConfig) -> Self {
        Self {
            store,
            hashing,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<AccountView, AccountError> {
        if self.store.find_by_email(email).await?.is_some() {
            warn!("email already registered");
            return Err(AccountError::EmailAlreadyExists);
        }

        let hash = self.hash(password).await?;

        // The UNIQUE constraint catches a concurrent register that passed the check above.
        let account = match self.store.create(email, &hash).await {
            Ok(a) => a,
            Err(StoreError::DuplicateKey) => {
                warn!("email taken by concurrent registration");
                return Err(AccountError::EmailAlreadyExists);
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = account.id, "user registered");
        Ok(account.into())
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AccountView, AccountError> {
        let Some(account) = self.store.find_by_email(email).await? else {
            self.burn_verify(password).await;
            warn!("login unknown email");
            return Err(AccountError::InvalidCredentials);
        };

        if !self.verify(password, &account.password_hash).await? {
            warn!(user_id = account.id, "login invalid password");
            return Err(AccountError::InvalidCredentials);
        }

        info!(user_id = account.id, "user logged in");
        Ok(account.into())
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<AccountView>, AccountError> {
        let accounts = self.store.list_all().await?;
        Ok(accounts.into_iter().map(AccountView::from).collect())
    }

    async fn hash(&self, password: &str) -> Result<String, AccountError> {
        let plain = password.to_owned();
        let cfg = self.hashing;
        tokio::task::spawn_blocking(move || hash_password(&plain, &cfg))
            .await
            .context("hashing task")
            .and_then(|r| r)
            .map_err(AccountError::Internal)
    }

    /// Same Argon2 work as a real verify; the outcome is discarded.
    async fn burn_verify(&self, password: &str) {
        let plain = password.to_owned();
        let cfg = self.hashing;
        let cell = Arc::clone(&self.dummy_hash);
        let res = tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
            let hash = match cell.get() {
                Some(h) => h,
                None => {
                    let h = hash_password(DUMMY_PASSWORD, &cfg)?;
                    cell.get_or_init(|| h)
                }
            };
            verify_password(&plain, hash)
        })
        .await
        .context("dummy verify task")
        .and_then(|r| r);
        if let Err(e) = res {
            debug!(error = %e, "dummy verify failed");
        }
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AccountError> {
        let plain = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
            .await
            .context("verify task")
            .and_then(|r| r)
            .map_err(AccountError::Internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{memory::InMemoryAccountStore, password::cheap_config, repo_types::Account};
    use async_trait::async_trait;

    fn service() -> AccountService {
        AccountService::new(Arc::new(InMemoryAccountStore::default()), cheap_config())
    }

    #[tokio::test]
    async fn register_then_login_succeeds() {
        let svc = service();
        let created = svc.register("user@example.com", "SecurePass123!").await.unwrap();
        assert_eq!(created.email, "user@example.com");

        let logged_in = svc.login("user@example.com", "SecurePass123!").await.unwrap();
        assert_eq!(logged_in, created);
    }

    #[tokio::test]
    async fn duplicate_register_fails_and_count_is_unchanged() {
        let svc = service();
        svc.register("user@example.com", "SecurePass123!").await.unwrap();

        let err = svc.register("user@example.com", "OtherPass456!").await.unwrap_err();
        assert!(matches!(err, AccountError::EmailAlreadyExists));
        assert_eq!(svc.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let svc = service();
        svc.register("user@example.com", "SecurePass123!").await.unwrap();

        let unknown = svc.login("ghost@example.com", "SecurePass123!").await.unwrap_err();
        let wrong = svc.login("user@example.com", "wrong").await.unwrap_err();
        assert!(matches!(unknown, AccountError::InvalidCredentials));
        assert!(matches!(wrong, AccountError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn unknown_email_still_pays_for_a_verify() {
        let svc = service();
        assert!(svc.dummy_hash.get().is_none());

        let err = svc.login("ghost@example.com", "SecurePass123!").await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials));

        let dummy = svc.dummy_hash.get().expect("dummy hash computed on the unknown-email path");
        assert!(dummy.contains("m=256,t=1,p=1"), "dummy must use the live work factor: {dummy}");
    }

    #[tokio::test]
    async fn email_match_is_case_sensitive() {
        let svc = service();
        svc.register("user@example.com", "SecurePass123!").await.unwrap();
        let err = svc.login("USER@example.com", "SecurePass123!").await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn list_all_returns_every_account_in_store_order() {
        let svc = service();
        svc.register("a@example.com", "SecurePass123!").await.unwrap();
        svc.register("b@example.com", "SecurePass123!").await.unwrap();

        let emails: Vec<_> = svc.list_all().await.unwrap().into_iter().map(|v| v.email).collect();
        assert_eq!(emails, vec!["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn concurrent_duplicate_registrations_yield_one_account() {
        let svc = service();
        let (a, b) = tokio::join!(
            svc.register("race@example.com", "SecurePass123!"),
            svc.register("race@example.com", "SecurePass123!"),
        );
        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(AccountError::EmailAlreadyExists))));
        assert_eq!(svc.list_all().await.unwrap().len(), 1);
    }

    /// Lookup never sees the row, so the insert is the one that hits the constraint.
    struct LateConflictStore;

    #[async_trait]
    impl AccountStore for LateConflictStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, StoreError> {
            Ok(None)
        }
        async fn create(&self, _email: &str, _hash: &str) -> Result<Account, StoreError> {
            Err(StoreError::DuplicateKey)
        }
        async fn list_all(&self) -> Result<Vec<Account>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn duplicate_key_on_insert_is_email_already_exists() {
        let svc = AccountService::new(Arc::new(LateConflictStore), cheap_config());
        let err = svc.register("late@example.com", "SecurePass123!").await.unwrap_err();
        assert!(matches!(err, AccountError::EmailAlreadyExists));
    }

    struct BrokenStore;

    #[async_trait]
    impl AccountStore for BrokenStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, StoreError> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn create(&self, _email: &str, _hash: &str) -> Result<Account, StoreError> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn list_all(&self) -> Result<Vec<Account>, StoreError> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
    }

    #[tokio::test]
    async fn storage_failures_are_internal() {
        let svc = AccountService::new(Arc::new(BrokenStore), cheap_config());
        assert!(matches!(
            svc.register("a@example.com", "SecurePass123!").await,
            Err(AccountError::Internal(_))
        ));
        assert!(matches!(
            svc.login("a@example.com", "SecurePass123!").await,
            Err(AccountError::Internal(_))
        ));
        assert!(matches!(svc.list_all().await, Err(AccountError::Internal(_))));
    }
}
