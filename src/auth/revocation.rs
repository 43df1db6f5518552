// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh-token revocation registry.
//!
//! A revoked `jti` is remembered together with the expiry of its token.
//! Once that expiry has passed the token can no
//! longer verify anyway, so [`RevocationRegistry::prune_expired`] may drop
//! the entry.
//!
//! ## Implementations
//!
//! - [`InMemoryRevocationRegistry`] - single instance; cleared on restart
//! - [`crate::storage::CredentialDatabase`] - persisted in redb

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::storage::{StoreError, StoreResult};

#[async_trait]
pub trait RevocationRegistry: Send + Sync {
    /// Idempotent. An empty `jti` is ignored.
    async fn revoke(&self, jti: &str, expires_at: i64) -> StoreResult<()>;

    async fn is_revoked(&self, jti: &str) -> StoreResult<bool>;

    /// Remove entries whose token expired before `cutoff` (unix seconds).
    /// Returns the number of entries removed.
    async fn prune_expired(&self, cutoff: i64) -> StoreResult<usize>;
}

/// Process-local registry. The lock is only held for a map operation.
#[derive(Debug, Default)]
pub struct InMemoryRevocationRegistry {
    revoked: RwLock<HashMap<String, i64>>,
}

impl InMemoryRevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("revocation registry lock poisoned".to_string())
}

#[async_trait]
impl RevocationRegistry for InMemoryRevocationRegistry {
    async fn revoke(&self, jti: &str, expires_at: i64) -> StoreResult<()> {
        if jti.is_empty() {
            return Ok(());
        }
        let mut revoked = self.revoked.write().map_err(poisoned)?;
        revoked
            .entry(jti.to_string())
            .and_modify(|keep_until| *keep_until = (*keep_until).max(expires_at))
            .or_insert(expires_at);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> StoreResult<bool> {
        Ok(self.revoked.read().map_err(poisoned)?.contains_key(jti))
    }

    async fn prune_expired(&self, cutoff: i64) -> StoreResult<usize> {
        let mut revoked = self.revoked.write().map_err(poisoned)?;
        let before = revoked.len();
        revoked.retain(|_, expires_at| *expires_at >= cutoff);
        Ok(before - revoked.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let registry = InMemoryRevocationRegistry::new();
        assert!(!registry.is_revoked("jti-1").await.unwrap());

        registry.revoke("jti-1", 100).await.unwrap();
        assert!(registry.is_revoked("jti-1").await.unwrap());

        registry.revoke("jti-1", 100).await.unwrap();
        assert!(registry.is_revoked("jti-1").await.unwrap());
        assert_eq!(registry.prune_expired(50).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_jti_is_ignored() {
        let registry = InMemoryRevocationRegistry::new();
        registry.revoke("", 100).await.unwrap();
        assert!(!registry.is_revoked("").await.unwrap());
    }

    #[tokio::test]
    async fn prune_keeps_unexpired_entries() {
        let registry = InMemoryRevocationRegistry::new();
        registry.revoke("old", 10).await.unwrap();
        registry.revoke("new", 1_000).await.unwrap();

        assert_eq!(registry.prune_expired(500).await.unwrap(), 1);
        assert!(!registry.is_revoked("old").await.unwrap());
        assert!(registry.is_revoked("new").await.unwrap());
    }

    #[tokio::test]
    async fn later_expiry_wins_on_re_revoke() {
        let registry = InMemoryRevocationRegistry::new();
        registry.revoke("jti", 10).await.unwrap();
        registry.revoke("jti", 1_000).await.unwrap();

        assert_eq!(registry.prune_expired(500).await.unwrap(), 0);
        assert!(registry.is_revoked("jti").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_revocations_are_all_visible() {
        let registry = Arc::new(InMemoryRevocationRegistry::new());

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.revoke(&format!("jti-{i}"), 1_000).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for i in 0..64 {
            assert!(registry.is_revoked(&format!("jti-{i}")).await.unwrap());
        }
    }
}
