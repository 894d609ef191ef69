//! Access and refresh token issuance.
//!
//! Two independently keyed HS256 token kinds: a short-lived access token
//! carrying identity claims, and a long-lived refresh token carrying only the
//! subject. A token signed with one key never verifies under the other.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use common::{AppError, AppResult};
use domain::{Account, BEARER_TOKEN_PREFIX, MIN_SIGNING_SECRET_LENGTH, TOKEN_TYPE_BEARER};

/// Access token claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh token claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    /// Distinguishes tokens issued within the same second
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Token pair returned after login or refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// A signing secret and the lifetime of tokens signed with it.
#[derive(Clone)]
pub struct SigningKey {
    secret: Zeroizing<String>,
    ttl: Duration,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SigningKey {
    /// `name` only labels the configuration error.
    pub fn new(name: &str, secret: impl Into<String>, ttl: Duration) -> AppResult<Self> {
        let secret = Zeroizing::new(secret.into());
        if secret.trim().is_empty() {
            return Err(AppError::configuration(format!("{} must be set", name)));
        }
        if secret.len() < MIN_SIGNING_SECRET_LENGTH {
            return Err(AppError::configuration(format!(
                "{} must be at least {} bytes",
                name, MIN_SIGNING_SECRET_LENGTH
            )));
        }
        if ttl.as_secs() == 0 {
            return Err(AppError::configuration(format!(
                "{} lifetime must be at least one second",
                name
            )));
        }
        Ok(Self { secret, ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.as_bytes())
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.as_bytes())
    }

    /// (iat, exp) for a token issued now.
    fn window(&self) -> (i64, i64) {
        let iat = Utc::now().timestamp();
        (iat, iat + self.ttl.as_secs() as i64)
    }
}

/// Signing configuration for both token kinds.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    access: SigningKey,
    refresh: SigningKey,
}

impl TokenConfig {
    pub fn new(
        access_secret: impl Into<String>,
        access_ttl: Duration,
        refresh_secret: impl Into<String>,
        refresh_ttl: Duration,
    ) -> AppResult<Self> {
        let access = SigningKey::new("ACCESS_TOKEN_SECRET", access_secret, access_ttl)?;
        let refresh = SigningKey::new("REFRESH_TOKEN_SECRET", refresh_secret, refresh_ttl)?;

        if access.secret.as_bytes() == refresh.secret.as_bytes() {
            return Err(AppError::configuration(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ",
            ));
        }

        Ok(Self { access, refresh })
    }

    pub fn access(&self) -> &SigningKey {
        &self.access
    }

    pub fn refresh(&self) -> &SigningKey {
        &self.refresh
    }
}

/// Verify a token's signature and expiry under `key` and decode its claims.
pub fn verify_token<C: DeserializeOwned>(token: &str, key: &SigningKey) -> AppResult<C> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<C>(token, &key.decoding_key(), &validation)?;
    Ok(data.claims)
}

fn sign<C: Serialize>(claims: &C, key: &SigningKey) -> AppResult<String> {
    Ok(encode(&Header::new(Algorithm::HS256), claims, &key.encoding_key())?)
}

/// Strip the `Bearer ` prefix from an Authorization header value.
pub fn extract_bearer(header_value: &str) -> AppResult<&str> {
    header_value
        .trim_start()
        .strip_prefix(BEARER_TOKEN_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)
}

/// Issues and verifies access and refresh tokens.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    config: TokenConfig,
}

impl TokenIssuer {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn issue_access_token(&self, account: &Account) -> AppResult<String> {
        let (iat, exp) = self.config.access.window();
        let claims = AccessClaims {
            sub: account.id,
            email: account.email.clone(),
            username: account.username.clone(),
            full_name: account.full_name.clone(),
            iat,
            exp,
        };
        sign(&claims, &self.config.access)
    }

    pub fn issue_refresh_token(&self, account_id: Uuid) -> AppResult<String> {
        let (iat, exp) = self.config.refresh.window();
        let claims = RefreshClaims {
            sub: account_id,
            jti: Uuid::new_v4(),
            iat,
            exp,
        };
        sign(&claims, &self.config.refresh)
    }

    pub fn issue_pair(&self, account: &Account) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access_token(account)?,
            refresh_token: self.issue_refresh_token(account.id)?,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.config.access.ttl.as_secs(),
        })
    }

    pub fn verify_access(&self, token: &str) -> AppResult<AccessClaims> {
        verify_token(token, &self.config.access)
    }

    pub fn verify_refresh(&self, token: &str) -> AppResult<RefreshClaims> {
        verify_token(token, &self.config.refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::NewAccount;

    const ACCESS_SECRET: &str = "access-secret-for-tests-0123456789abcdef";
    const REFRESH_SECRET: &str = "refresh-secret-for-tests-0123456789abcdef";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            TokenConfig::new(
                ACCESS_SECRET,
                Duration::from_secs(900),
                REFRESH_SECRET,
                Duration::from_secs(864_000),
            )
            .unwrap(),
        )
    }

    fn account() -> Account {
        Account::register(NewAccount {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice Liddell".to_string(),
            avatar: "https://res.example.com/alice.png".to_string(),
            cover_image: None,
            password: "s3cret!".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_access_claims_round_trip() {
        let issuer = issuer();
        let account = account();

        let claims = issuer
            .verify_access(&issuer.issue_access_token(&account).unwrap())
            .unwrap();

        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.full_name, "Alice Liddell");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_pair_tokens_differ_and_do_not_cross_verify() {
        let issuer = issuer();
        let pair = issuer.issue_pair(&account()).unwrap();

        assert_ne!(pair.access_token, pair.refresh_token);
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 900);
        assert!(matches!(issuer.verify_refresh(&pair.access_token), Err(AppError::Jwt(_))));
        assert!(matches!(issuer.verify_access(&pair.refresh_token), Err(AppError::Jwt(_))));
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let issuer = issuer();
        let id = Uuid::new_v4();
        assert_ne!(
            issuer.issue_refresh_token(id).unwrap(),
            issuer.issue_refresh_token(id).unwrap()
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();
        let now = Utc::now().timestamp();
        let stale = RefreshClaims {
            sub: Uuid::new_v4(),
            jti: Uuid::new_v4(),
            iat: now - 120,
            exp: now - 60,
        };
        let token = sign(&stale, issuer.config().refresh()).unwrap();

        let err = issuer.verify_refresh(&token).unwrap_err();
        assert!(matches!(
            err,
            AppError::Jwt(ref e) if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let issuer = issuer();
        let mut token = issuer.issue_access_token(&account()).unwrap();
        token.push('x');
        assert!(issuer.verify_access(&token).is_err());
    }

    #[test]
    fn test_config_rejects_identical_secrets() {
        let err = TokenConfig::new(
            ACCESS_SECRET,
            Duration::from_secs(60),
            ACCESS_SECRET,
            Duration::from_secs(60),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_config_rejects_weak_secret_and_zero_ttl() {
        assert!(TokenConfig::new("", Duration::from_secs(60), REFRESH_SECRET, Duration::from_secs(60)).is_err());
        assert!(TokenConfig::new("short", Duration::from_secs(60), REFRESH_SECRET, Duration::from_secs(60)).is_err());
        assert!(TokenConfig::new(ACCESS_SECRET, Duration::ZERO, REFRESH_SECRET, Duration::from_secs(60)).is_err());
        assert!(TokenConfig::new(ACCESS_SECRET, Duration::from_millis(500), REFRESH_SECRET, Duration::from_secs(60)).is_err());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(matches!(extract_bearer("Bearer "), Err(AppError::Unauthorized)));
        assert!(matches!(extract_bearer("Basic abc"), Err(AppError::Unauthorized)));
        assert!(matches!(extract_bearer("abc.def.ghi"), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", issuer().config());
        assert!(!rendered.contains(ACCESS_SECRET));
        assert!(!rendered.contains(REFRESH_SECRET));
    }
}
