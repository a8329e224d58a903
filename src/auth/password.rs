use tracing::warn;

use crate::db::PasswordHash;
use crate::error::AppError;

/// Lowest work factor bcrypt accepts. Only meant for tests.
pub const MIN_BCRYPT_COST: u32 = 4;

/// bcrypt hashing, run on the blocking pool so request workers stay responsive.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, plaintext: &str) -> Result<PasswordHash, AppError> {
        let cost = self.cost;
        let plaintext = plaintext.to_owned();

        let digest = tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await?
            .map_err(|e| AppError::HashingError(e.to_string()))?;

        Ok(PasswordHash::from_digest(digest))
    }

    /// Never fails: a malformed digest counts as a mismatch.
    pub async fn verify(&self, plaintext: &str, hash: &PasswordHash) -> bool {
        let plaintext = plaintext.to_owned();
        let digest = hash.as_str().to_owned();

        match tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &digest)).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                warn!("Password verification failed: {}", e);
                false
            }
            Err(e) => {
                warn!("Password verification task failed: {}", e);
                false
            }
        }
    }
}
