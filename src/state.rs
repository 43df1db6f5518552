// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{
    PasswordHasher, RegistrationService, RevocationRegistry, SessionService, TokenService,
};
use crate::config::{ConfigError, Settings};
use crate::storage::CredentialStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub revocations: Arc<dyn RevocationRegistry>,
    pub tokens: Arc<TokenService>,
    pub sessions: SessionService,
    pub registration: RegistrationService,
}

impl AppState {
    pub fn new(
        settings: &Settings,
        store: Arc<dyn CredentialStore>,
        revocations: Arc<dyn RevocationRegistry>,
    ) -> Result<Self, ConfigError> {
        let tokens = Arc::new(TokenService::new(&settings.tokens, revocations.clone())?);
        let hasher = PasswordHasher::new(settings.bcrypt_cost);

        Ok(Self {
            sessions: SessionService::new(store.clone(), tokens.clone(), revocations.clone(), hasher.clone()),
            registration: RegistrationService::new(store.clone(), hasher, settings.invite_batch_max),
            store,
            revocations,
            tokens,
        })
    }

    /// Fully in-memory state with the cheapest bcrypt cost.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        use crate::auth::InMemoryRevocationRegistry;
        use crate::storage::InMemoryStore;

        let settings = Settings::from_lookup(|name| match name {
            "ACCESS_TOKEN_SECRET" => Some("state-access-secret".to_string()),
            "REFRESH_TOKEN_SECRET" => Some("state-refresh-secret".to_string()),
            "BCRYPT_COST" => Some("4".to_string()),
            _ => None,
        })
        .expect("test settings");

        Self::new(
            &settings,
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryRevocationRegistry::new()),
        )
        .expect("test state")
    }
}
