//! Domain layer - Core business entities and value objects.
//!
//! Pure account and credential logic with no infrastructure dependencies.
//! Shared by the auth and media services.

pub mod account;
pub mod constants;
pub mod error;
pub mod password;

pub use account::{normalize_identifier, Account, AccountResponse, NewAccount};
pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use password::{Password, PlainPassword, WorkFactor};
