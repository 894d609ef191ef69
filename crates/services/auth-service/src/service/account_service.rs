//! Account service - registration, login and token lifecycle.
//!
//! Composes the credential hasher, the token issuer and the account store.
//! Tokens are only ever issued after a successful credential check.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use common::{AppError, AppResult, OptionExt};
use domain::{Account, AccountResponse, NewAccount};

use super::hashing::CredentialHasher;
use super::token_service::{extract_bearer, AccessClaims, TokenIssuer, TokenPair};
use crate::repository::AccountRepository;

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub account: AccountResponse,
    pub tokens: TokenPair,
}

/// Account service trait for dependency injection.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Register a new account. The password is hashed before the account is stored.
    async fn register(&self, input: NewAccount) -> AppResult<Account>;

    /// Login with a username or email and return a fresh token pair
    async fn login(&self, identifier: &str, password: &str) -> AppResult<Session>;

    /// Exchange the current refresh token for a new pair (rotation)
    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair>;

    /// Invalidate the stored refresh token
    async fn logout(&self, account_id: Uuid) -> AppResult<()>;

    /// Replace the password after checking the current one
    async fn change_password(&self, account_id: Uuid, current: &str, new: &str) -> AppResult<()>;

    /// Persist an account, hashing its password only if it was changed
    async fn save(&self, account: &mut Account) -> AppResult<()>;

    /// Resolve an Authorization header to access claims
    fn authenticate(&self, authorization: &str) -> AppResult<AccessClaims>;
}

/// Concrete implementation of AccountService.
pub struct AccountManager {
    accounts: Arc<dyn AccountRepository>,
    hasher: Arc<CredentialHasher>,
    tokens: Arc<TokenIssuer>,
}

impl AccountManager {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        hasher: Arc<CredentialHasher>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            accounts,
            hasher,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Hash a pending password change into the account, if there is one.
    async fn apply_pending_password(&self, account: &mut Account) -> AppResult<()> {
        if let Some(plain) = account.take_pending_password() {
            let hash = self.hasher.hash_plain(plain).await?;
            account.apply_password_hash(hash);
        }
        Ok(())
    }

    async fn lookup(&self, identifier: &str) -> AppResult<Option<Account>> {
        if identifier.contains('@') {
            self.accounts.find_by_email(identifier).await
        } else {
            self.accounts.find_by_username(identifier).await
        }
    }

    /// Issue a pair and record its refresh token on the account.
    async fn start_session(&self, account: &mut Account) -> AppResult<TokenPair> {
        let pair = self.tokens.issue_pair(account)?;
        account.set_refresh_token(pair.refresh_token.clone());
        self.accounts.save(account).await?;
        Ok(pair)
    }

    /// Like `start_session`, but only if `presented` is still the token on record.
    async fn rotate_session(&self, account: &mut Account, presented: &str) -> AppResult<TokenPair> {
        let pair = self.tokens.issue_pair(account)?;
        account.set_refresh_token(pair.refresh_token.clone());
        if !self.accounts.save_if_refresh_token(account, presented).await? {
            warn!(account_id = %account.id, "Refresh token was rotated concurrently");
            return Err(AppError::Unauthorized);
        }
        Ok(pair)
    }
}

#[async_trait]
impl AccountService for AccountManager {
    async fn register(&self, input: NewAccount) -> AppResult<Account> {
        let mut account = Account::register(input)?;
        self.apply_pending_password(&mut account).await?;

        let account = self.accounts.create(account).await?;
        info!(account_id = %account.id, username = %account.username, "Account registered");
        Ok(account)
    }

    async fn login(&self, identifier: &str, password: &str) -> AppResult<Session> {
        let Some(mut account) = self.lookup(identifier).await? else {
            // Unknown accounts cost as much as a wrong password
            self.hasher.verify_decoy(password).await?;
            return Err(AppError::InvalidCredentials);
        };

        if !self.hasher.verify(password, account.password_hash()).await? {
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self.start_session(&mut account).await?;
        info!(account_id = %account.id, "Login succeeded");
        Ok(Session {
            account: AccountResponse::from(&account),
            tokens,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.tokens.verify_refresh(refresh_token)?;
        let mut account = self
            .accounts
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !account.holds_refresh_token(refresh_token) {
            warn!(account_id = %account.id, "Refresh token is not the one on record");
            return Err(AppError::Unauthorized);
        }

        self.rotate_session(&mut account, refresh_token).await
    }

    async fn logout(&self, account_id: Uuid) -> AppResult<()> {
        let mut account = self.accounts.find_by_id(account_id).await?.ok_or_not_found()?;
        account.clear_refresh_token();
        self.accounts.save(&account).await?;
        info!(account_id = %account_id, "Logged out");
        Ok(())
    }

    async fn change_password(&self, account_id: Uuid, current: &str, new: &str) -> AppResult<()> {
        let mut account = self.accounts.find_by_id(account_id).await?.ok_or_not_found()?;
        if !self.hasher.verify(current, account.password_hash()).await? {
            return Err(AppError::InvalidCredentials);
        }

        account.set_password(new)?;
        self.save(&mut account).await
    }

    async fn save(&self, account: &mut Account) -> AppResult<()> {
        self.apply_pending_password(account).await?;
        self.accounts.save(account).await
    }

    fn authenticate(&self, authorization: &str) -> AppResult<AccessClaims> {
        self.tokens.verify_access(extract_bearer(authorization)?)
    }
}
