//! Async credential hashing.
//!
//! Argon2 is deliberately slow, so both hashing and verification run on the
//! blocking thread pool instead of stalling the async executor.

use tokio::sync::OnceCell;
use tokio::task;
use zeroize::Zeroizing;

use common::{AppError, AppResult};
use domain::{Password, PlainPassword, WorkFactor};

/// Hashes and verifies credentials with a fixed work factor.
pub struct CredentialHasher {
    work_factor: WorkFactor,
    /// Real hash of a throwaway secret, used to equalize timing for unknown accounts
    decoy: OnceCell<Password>,
}

impl CredentialHasher {
    /// Create a hasher, rejecting parameters argon2 would refuse.
    pub fn new(work_factor: WorkFactor) -> AppResult<Self> {
        work_factor
            .argon2()
            .map_err(|e| AppError::configuration(e.to_string()))?;
        Ok(Self {
            work_factor,
            decoy: OnceCell::new(),
        })
    }

    pub fn work_factor(&self) -> WorkFactor {
        self.work_factor
    }

    /// Hash a plaintext. Fails with a validation error on empty input.
    pub async fn hash(&self, plain_text: &str) -> AppResult<String> {
        let plain = PlainPassword::new(plain_text)?;
        Ok(self.hash_plain(plain).await?.into_string())
    }

    /// Hash an already accepted plaintext.
    pub async fn hash_plain(&self, plain: PlainPassword) -> AppResult<Password> {
        let work_factor = self.work_factor;
        let password = task::spawn_blocking(move || Password::hash(&plain, &work_factor))
            .await
            .map_err(|e| AppError::internal(format!("Hashing task failed: {}", e)))??;
        Ok(password)
    }

    /// Check a plaintext against a stored PHC string.
    pub async fn verify(&self, plain_text: &str, hash: &str) -> AppResult<bool> {
        let plain = Zeroizing::new(plain_text.to_string());
        let stored = Password::from_hash(hash)?;
        let matches = task::spawn_blocking(move || stored.verify(&plain))
            .await
            .map_err(|e| AppError::internal(format!("Verification task failed: {}", e)))??;
        Ok(matches)
    }

    /// Spend the same effort as a real verification when no account matched.
    pub async fn verify_decoy(&self, plain_text: &str) -> AppResult<()> {
        let decoy = self
            .decoy
            .get_or_try_init(|| async {
                let plain = PlainPassword::new("decoy-credential-never-issued")?;
                Ok::<_, AppError>(self.hash_plain(plain).await?)
            })
            .await?;
        self.verify(plain_text, decoy.as_str()).await?;
        Ok(())
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("work_factor", &self.work_factor)
            .finish()
    }
}
