//! Repository layer for account storage.

mod account_repository;

pub use account_repository::{AccountRepository, InMemoryAccountStore};

#[cfg(any(test, feature = "test-utils"))]
pub use account_repository::MockAccountRepository;
