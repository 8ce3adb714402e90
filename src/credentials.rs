/*!
 * Credential Store
 * bcrypt hashing and verification of user passwords
 */
use bcrypt::{hash, verify};

use crate::error::AppError;

/// Stateless apart from the bcrypt cost factor. The encoded hash carries
/// its own algorithm version, cost and salt, so nothing else is stored per user.
#[derive(Debug, Clone, Copy)]
pub struct CredentialStore {
    cost: u32,
}

impl CredentialStore {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash with a fresh random salt; two calls on the same input differ.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost).map_err(|e| AppError::Internal(format!("hash failed: {e}")))
    }

    /// bcrypt compares digests in constant time. A malformed stored hash is
    /// treated as a mismatch.
    pub fn verify(&self, candidate: &str, stored_hash: &str) -> bool {
        verify(candidate, stored_hash).unwrap_or(false)
    }

    /// `hash` off the async executor; bcrypt is CPU-bound.
    pub async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let store = *self;
        tokio::task::spawn_blocking(move || store.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("spawn_blocking panic during hash: {e}")))?
    }

    pub async fn verify_password(&self, candidate: String, stored_hash: String) -> bool {
        let store = *self;
        tokio::task::spawn_blocking(move || store.verify(&candidate, &stored_hash))
            .await
            .unwrap_or(false)
    }

    /// Login check. With no stored hash the candidate is hashed anyway and
    /// the answer is false, so unknown emails cost the same bcrypt round.
    pub async fn check_login(&self, candidate: String, stored_hash: Option<String>) -> bool {
        match stored_hash {
            Some(stored_hash) => self.verify_password(candidate, stored_hash).await,
            None => {
                let _ = self.hash_password(candidate).await;
                false
            }
        }
    }
}
