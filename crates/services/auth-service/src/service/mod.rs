//! Authentication business logic.

mod account_service;
mod hashing;
mod token_service;

pub use account_service::{AccountManager, AccountService, Session};
pub use hashing::CredentialHasher;
pub use token_service::{
    extract_bearer, verify_token, AccessClaims, RefreshClaims, SigningKey, TokenConfig,
    TokenIssuer, TokenPair,
};
