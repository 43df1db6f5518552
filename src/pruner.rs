// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Revocation Pruner
//!
//! Background task that drops revocation entries whose refresh token has
//! expired. Once a token is past `exp` the verifier rejects it as expired
//! anyway, so keeping its `jti` only grows the registry.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::RevocationRegistry;

/// Periodically prunes expired entries from a revocation registry.
pub struct RevocationPruner {
    registry: Arc<dyn RevocationRegistry>,
    interval: Duration,
}

impl RevocationPruner {
    pub fn new(registry: Arc<dyn RevocationRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Run the pruning loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(pruner.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Revocation pruner starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Revocation pruner shutting down");
                    return;
                }
            }

            self.prune_step().await;
        }
    }

    /// Execute one sweep. Returns the number of entries removed.
    pub async fn prune_step(&self) -> usize {
        // Same boundary as verification: `exp == now` still verifies.
        let cutoff = Utc::now().timestamp();

        match self.registry.prune_expired(cutoff).await {
            Ok(0) => {
                debug!("Revocation pruner: nothing to prune");
                0
            }
            Ok(removed) => {
                info!(removed, "Revocation pruner: removed expired entries");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Revocation pruner: sweep failed");
                0
            }
        }
    }
}
