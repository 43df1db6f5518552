// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! bcrypt password hashing, run on the blocking pool so slow hashes never
//! stall the async workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;

use super::AuthError;

/// Plaintext behind the decoy hash used for unknown usernames.
const DECOY_PASSWORD: &str = "relational-auth-decoy";

/// Clones share the decoy hash and the verification counter.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    decoy_hash: Arc<OnceCell<String>>,
    verifications: Arc<AtomicU64>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            decoy_hash: Arc::new(OnceCell::new()),
            verifications: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| AuthError::Internal(format!("failed to hash password: {e}")))
    }

    /// Constant-time comparison provided by bcrypt.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        self.verifications.fetch_add(1, Ordering::Relaxed);
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))?
            .map_err(|e| AuthError::Internal(format!("stored password hash unusable: {e}")))
    }

    /// Spend the same bcrypt work as [`Self::verify`] against a decoy hash
    /// of the configured cost. Used when there is no stored hash to check.
    ///
    /// The decoy is hashed on first use and reused afterwards.
    pub async fn verify_decoy(&self, password: &str) -> Result<(), AuthError> {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| self.hash(DECOY_PASSWORD))
            .await?;
        self.verify(password, decoy).await?;
        Ok(())
    }

    /// Number of bcrypt verifications performed so far.
    pub fn verifications(&self) -> u64 {
        self.verifications.load(Ordering::Relaxed)
    }
}
