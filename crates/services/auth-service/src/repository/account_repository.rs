//! Account storage collaborator and its in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{normalize_identifier, Account};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Account repository trait for dependency injection.
///
/// Lookups by username or email normalize their argument, so callers may
/// pass raw user input.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Persist a new account. Conflict if the username or email is taken.
    async fn create(&self, account: Account) -> AppResult<Account>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    /// Overwrite an existing account.
    async fn save(&self, account: &Account) -> AppResult<()>;

    /// Overwrite an existing account only if its stored refresh token is still
    /// `expected`. Returns `false`, leaving the record untouched, otherwise.
    async fn save_if_refresh_token(&self, account: &Account, expected: &str) -> AppResult<bool>;
}

/// Process-local account store.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

/// Reject `account` if another record already uses its username or email.
fn check_unique(accounts: &HashMap<Uuid, Account>, account: &Account) -> AppResult<()> {
    for other in accounts.values().filter(|other| other.id != account.id) {
        if other.username == account.username {
            return Err(AppError::conflict("Username"));
        }
        if other.email == account.email {
            return Err(AppError::conflict("Email"));
        }
    }
    Ok(())
}

#[async_trait]
impl AccountRepository for InMemoryAccountStore {
    async fn create(&self, account: Account) -> AppResult<Account> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.id) {
            return Err(AppError::conflict("Account"));
        }
        check_unique(&accounts, &account)?;

        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        let username = normalize_identifier(username);
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|account| account.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let email = normalize_identifier(email);
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn save(&self, account: &Account) -> AppResult<()> {
        let mut accounts = self.accounts.write().await;
        if !accounts.contains_key(&account.id) {
            return Err(AppError::NotFound);
        }
        check_unique(&accounts, account)?;

        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn save_if_refresh_token(&self, account: &Account, expected: &str) -> AppResult<bool> {
        let mut accounts = self.accounts.write().await;
        let Some(current) = accounts.get(&account.id) else {
            return Err(AppError::NotFound);
        };
        if !current.holds_refresh_token(expected) {
            return Ok(false);
        }
        check_unique(&accounts, account)?;

        accounts.insert(account.id, account.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::NewAccount;

    fn account(username: &str, email: &str) -> Account {
        Account::register(NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            full_name: "Test User".to_string(),
            avatar: "https://res.example.com/a.png".to_string(),
            cover_image: None,
            password: "pw".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryAccountStore::new();
        assert!(store.is_empty().await);
        let created = store.create(account("alice", "alice@example.com")).await.unwrap();
        assert!(!store.is_empty().await);

        assert_eq!(store.find_by_id(created.id).await.unwrap().unwrap().id, created.id);
        assert!(store.find_by_username(" ALICE ").await.unwrap().is_some());
        assert!(store.find_by_email("Alice@Example.com").await.unwrap().is_some());
        assert!(store.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_conflict() {
        let store = InMemoryAccountStore::new();
        store.create(account("alice", "alice@example.com")).await.unwrap();

        let same_name = store.create(account("Alice", "other@example.com")).await;
        assert!(matches!(same_name, Err(AppError::Conflict(ref f)) if f == "Username"));

        let same_email = store.create(account("alice2", "ALICE@example.com")).await;
        assert!(matches!(same_email, Err(AppError::Conflict(ref f)) if f == "Email"));

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_save_requires_existing() {
        let store = InMemoryAccountStore::new();
        let result = store.save(&account("ghost", "ghost@example.com")).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_save_cannot_steal_email() {
        let store = InMemoryAccountStore::new();
        store.create(account("alice", "alice@example.com")).await.unwrap();
        let mut bob = store.create(account("bob", "bob@example.com")).await.unwrap();

        bob.email = "alice@example.com".to_string();
        assert!(matches!(store.save(&bob).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_save_if_refresh_token_compares_first() {
        let store = InMemoryAccountStore::new();
        let mut alice = store.create(account("alice", "alice@example.com")).await.unwrap();
        alice.set_refresh_token("t1".to_string());
        store.save(&alice).await.unwrap();

        alice.set_refresh_token("t2".to_string());
        assert!(store.save_if_refresh_token(&alice, "t1").await.unwrap());

        // t1 is gone now, so a second rotation from it must not land
        alice.set_refresh_token("t3".to_string());
        assert!(!store.save_if_refresh_token(&alice, "t1").await.unwrap());
        let stored = store.find_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token(), Some("t2"));

        let ghost = account("ghost", "ghost@example.com");
        assert!(matches!(
            store.save_if_refresh_token(&ghost, "t1").await,
            Err(AppError::NotFound)
        ));
    }
}
