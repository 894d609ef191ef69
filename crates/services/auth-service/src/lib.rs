//! Auth Service Library
//!
//! Credential hashing, access/refresh token issuance and the account
//! lifecycle built on top of them. Storage is a collaborator behind
//! [`repository::AccountRepository`].

pub mod config;
pub mod repository;
pub mod service;

use std::sync::Arc;

use common::AppResult;

use crate::config::AuthServiceConfig;
use crate::repository::AccountRepository;
use crate::service::{AccountManager, CredentialHasher, TokenIssuer};

/// Wire an account service from configuration and a storage backend.
pub fn build_account_service(
    config: &AuthServiceConfig,
    accounts: Arc<dyn AccountRepository>,
) -> AppResult<AccountManager> {
    let hasher = Arc::new(CredentialHasher::new(config.work_factor)?);
    let tokens = Arc::new(TokenIssuer::new(config.tokens.clone()));
    Ok(AccountManager::new(accounts, hasher, tokens))
}
