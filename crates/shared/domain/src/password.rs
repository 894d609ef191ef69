//! Password value objects.
//!
//! `PlainPassword` holds a candidate plaintext (zeroed on drop), `Password`
//! holds the argon2id PHC string derived from it. Hashing here is synchronous;
//! async callers offload it to a blocking thread.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use zeroize::Zeroizing;

use crate::constants::MAX_PASSWORD_LENGTH;
use crate::error::{DomainError, DomainResult};

/// Argon2 cost parameters.
///
/// Only affects newly produced hashes; verification reads the parameters
/// embedded in the stored PHC string, so raising the work factor never
/// invalidates existing credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkFactor {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for WorkFactor {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl WorkFactor {
    /// Build an argon2id instance for these parameters.
    pub fn argon2(&self) -> DomainResult<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| DomainError::hashing(format!("Invalid work factor: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// A plaintext password accepted for hashing.
#[derive(Clone)]
pub struct PlainPassword(Zeroizing<String>);

impl std::fmt::Debug for PlainPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PlainPassword([REDACTED])")
    }
}

impl PlainPassword {
    /// Accept a plaintext password.
    ///
    /// # Errors
    /// Returns a password error if the input is empty or exceeds
    /// `MAX_PASSWORD_LENGTH` bytes.
    pub fn new(plain_text: &str) -> DomainResult<Self> {
        if plain_text.is_empty() {
            return Err(DomainError::password("Password is required"));
        }
        if plain_text.len() > MAX_PASSWORD_LENGTH {
            return Err(DomainError::password(format!(
                "Password must be at most {} bytes",
                MAX_PASSWORD_LENGTH
            )));
        }
        Ok(Self(Zeroizing::new(plain_text.to_string())))
    }

    /// Borrow the plaintext. Callers must not log or persist it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

/// Hashed password value object.
#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hash a plaintext with a fresh random salt.
    pub fn hash(plain: &PlainPassword, work_factor: &WorkFactor) -> DomainResult<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = work_factor
            .argon2()?
            .hash_password(plain.expose().as_bytes(), &salt)
            .map_err(|e| DomainError::hashing(format!("Password hash failed: {}", e)))?;
        Ok(Self {
            hash: hash.to_string(),
        })
    }

    /// Wrap a stored hash. Anything that is not a PHC string is rejected.
    pub fn from_hash(hash: impl Into<String>) -> DomainResult<Self> {
        let hash = hash.into();
        PasswordHash::new(&hash)
            .map_err(|e| DomainError::hashing(format!("Invalid hash format: {}", e)))?;
        Ok(Self { hash })
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    /// Check a plaintext against this hash.
    ///
    /// A mismatch is `Ok(false)`; a stored value that is not a valid PHC
    /// string is an error.
    pub fn verify(&self, plain_text: &str) -> DomainResult<bool> {
        let parsed = PasswordHash::new(&self.hash)
            .map_err(|e| DomainError::hashing(format!("Invalid hash format: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(plain_text.as_bytes(), &parsed)
            .is_ok())
    }
}

impl From<Password> for String {
    fn from(password: Password) -> Self {
        password.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: WorkFactor = WorkFactor {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };

    fn hash(plain: &str) -> Password {
        Password::hash(&PlainPassword::new(plain).unwrap(), &FAST).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let password = hash("s3cret!");

        assert_ne!(password.as_str(), "s3cret!");
        assert!(password.verify("s3cret!").unwrap());
        assert!(!password.verify("s3cret?").unwrap());
    }

    #[test]
    fn test_same_password_different_salts() {
        let first = hash("SamePassword123");
        let second = hash("SamePassword123");

        assert_ne!(first.as_str(), second.as_str());
        assert!(first.verify("SamePassword123").unwrap());
        assert!(second.verify("SamePassword123").unwrap());
    }

    #[test]
    fn test_hash_embeds_work_factor() {
        let password = hash("anything");
        assert!(password.as_str().starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
    }

    #[test]
    fn test_verify_ignores_current_work_factor() {
        // Stored with FAST, verified by a default-configured Argon2
        let restored = Password::from_hash(hash("portable").into_string()).unwrap();
        assert!(restored.verify("portable").unwrap());
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(matches!(
            PlainPassword::new(""),
            Err(DomainError::Password(_))
        ));
    }

    #[test]
    fn test_oversized_password_rejected() {
        let long = "x".repeat(MAX_PASSWORD_LENGTH + 1);
        assert!(PlainPassword::new(&long).is_err());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(matches!(
            Password::from_hash("not-a-phc-string"),
            Err(DomainError::Hashing(_))
        ));
    }

    #[test]
    fn test_invalid_work_factor() {
        let broken = WorkFactor {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(broken.argon2().is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let plain = PlainPassword::new("hunter22").unwrap();
        assert!(!format!("{:?}", plain).contains("hunter22"));
        assert!(!format!("{:?}", hash("hunter22")).contains("argon2"));
    }
}
