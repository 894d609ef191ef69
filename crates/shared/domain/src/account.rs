//! Account domain entity and related types.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{DomainError, DomainResult};
use crate::password::{Password, PlainPassword};

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_.]+$").expect("username pattern is valid"));

/// Trim and lower-case a unique identifier (username or email).
///
/// Every write and every lookup goes through this, so uniqueness holds on
/// the normalized form.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Account domain entity
///
/// Owns its credential hash. The plaintext only ever exists as a pending
/// change between `set_password` and the next save, which hashes it.
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    /// Remote URL of the profile picture
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Watched video ids, most recent first
    #[serde(default)]
    pub watch_history: Vec<Uuid>,
    #[serde(skip_serializing, default)]
    password_hash: String,
    #[serde(skip_serializing, default)]
    refresh_token: Option<String>,
    #[serde(skip)]
    pending_password: Option<PlainPassword>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("password_hash", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("password_change_pending", &self.pending_password.is_some())
            .finish()
    }
}

impl Account {
    /// Build a new, not yet persisted account from registration input.
    ///
    /// The password is staged as a pending change; the stored hash stays
    /// empty until the account is saved through the account service.
    pub fn register(input: NewAccount) -> DomainResult<Self> {
        let input = input.normalized();
        input.validate()?;
        if !USERNAME_PATTERN.is_match(&input.username) {
            return Err(DomainError::validation(
                "Username may only contain letters, digits, '_' and '.'",
            ));
        }
        let password = PlainPassword::new(&input.password)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            username: input.username,
            email: input.email,
            full_name: input.full_name,
            avatar: input.avatar,
            cover_image: input.cover_image,
            watch_history: Vec::new(),
            password_hash: String::new(),
            refresh_token: None,
            pending_password: Some(password),
            created_at: now,
            updated_at: now,
        })
    }

    /// Stage a credential change. Hashing happens on save.
    pub fn set_password(&mut self, plain_text: &str) -> DomainResult<()> {
        self.pending_password = Some(PlainPassword::new(plain_text)?);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Whether the credential was modified since the last save.
    pub fn password_modified(&self) -> bool {
        self.pending_password.is_some()
    }

    /// Take the pending plaintext, leaving the account unmodified.
    pub fn take_pending_password(&mut self) -> Option<PlainPassword> {
        self.pending_password.take()
    }

    /// PHC string of the current credential; empty before the first save.
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    /// Install a freshly derived hash.
    pub fn apply_password_hash(&mut self, password: Password) {
        self.password_hash = password.into_string();
        self.updated_at = Utc::now();
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Whether `token` is the refresh token currently on record.
    pub fn holds_refresh_token(&self, token: &str) -> bool {
        self.refresh_token.as_deref() == Some(token)
    }

    pub fn set_refresh_token(&mut self, token: String) {
        self.refresh_token = Some(token);
        self.updated_at = Utc::now();
    }

    pub fn clear_refresh_token(&mut self) {
        self.refresh_token = None;
        self.updated_at = Utc::now();
    }

    /// Record a watched video, keeping the list most-recent-first without duplicates.
    pub fn record_watch(&mut self, video_id: Uuid) {
        self.watch_history.retain(|id| *id != video_id);
        self.watch_history.insert(0, video_id);
        self.updated_at = Utc::now();
    }
}

/// Account registration data transfer object
#[derive(Clone, Deserialize, Validate)]
pub struct NewAccount {
    #[validate(length(min = 3, max = 32, message = "Username must be between 3 and 32 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar: String,
    #[validate(url(message = "Cover image must be a valid URL"))]
    pub cover_image: Option<String>,
    pub password: String,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl NewAccount {
    fn normalized(self) -> Self {
        Self {
            username: normalize_identifier(&self.username),
            email: normalize_identifier(&self.email),
            full_name: self.full_name.trim().to_string(),
            avatar: self.avatar.trim().to_string(),
            cover_image: self
                .cover_image
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            password: self.password,
        }
    }
}

/// Account response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            avatar: account.avatar.clone(),
            cover_image: account.cover_image.clone(),
            created_at: account.created_at,
        }
    }
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        AccountResponse::from(&account)
    }
}
