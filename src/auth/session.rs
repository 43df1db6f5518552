// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, refresh and logout.
//!
//! The service holds no per-session state of its own. A session is the
//! pair of tokens handed out at login; logout ends it by revoking the
//! refresh token's `jti`.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::{
    claims::{RefreshClaims, TokenSubject},
    password::PasswordHasher,
    tokens::{TokenKind, TokenService},
    AuthError, RevocationRegistry,
};
use crate::models::{LoginRequest, LoginResponse, LogoutResponse, RefreshResponse};
use crate::storage::CredentialStore;

const BEARER: &str = "Bearer";

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    revocations: Arc<dyn RevocationRegistry>,
    hasher: PasswordHasher,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
        revocations: Arc<dyn RevocationRegistry>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            store,
            tokens,
            revocations,
            hasher,
        }
    }

    /// Check credentials and issue an access/refresh token pair.
    ///
    /// An unknown username and a wrong password produce the same error
    /// and cost the same bcrypt work.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        let username = request.username.trim();

        let Some(user) = self.store.find_user_by_username(username).await? else {
            self.hasher.verify_decoy(&request.password).await?;
            warn!(username, reason = "unknown_user", "Login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(&request.password, &user.password_hash).await? {
            warn!(username, user_id = %user.id, reason = "bad_password", "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let subject = TokenSubject::from(&user);
        let access_token = self.tokens.issue_access_token(&subject)?;
        let refresh_token = self.tokens.issue_refresh_token(&subject)?;

        info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(LoginResponse {
            access_token,
            refresh_token,
            token_type: BEARER.to_string(),
            expires_in: self.tokens.access_ttl_secs(),
            user: user.summary(),
        })
    }

    /// Exchange a valid, unrevoked refresh token for a new access token.
    ///
    /// Identity comes from the refresh token alone; the store is not
    /// consulted, so the new access token carries no username.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError> {
        let claims: RefreshClaims = self
            .tokens
            .verify(refresh_token, TokenKind::Refresh, true)
            .await?;

        let access_token = self.tokens.issue_access_token(&TokenSubject::from(&claims))?;

        Ok(RefreshResponse {
            access_token,
            token_type: BEARER.to_string(),
            expires_in: self.tokens.access_ttl_secs(),
        })
    }

    /// Revoke a refresh token. Always reports success.
    ///
    /// Expired tokens are still revoked. Tokens that fail the signature
    /// check cannot be trusted for their `jti` and are ignored.
    pub async fn logout(&self, refresh_token: &str) -> LogoutResponse {
        let claims: Option<RefreshClaims> = self
            .tokens
            .decode_ignoring_expiry(refresh_token, TokenKind::Refresh);

        if let Some(claims) = claims {
            if let Some(jti) = claims.jti.as_deref().filter(|jti| !jti.is_empty()) {
                match self.revocations.revoke(jti, claims.exp).await {
                    Ok(()) => info!(user_id = %claims.sub, jti, "Refresh token revoked"),
                    Err(e) => error!(user_id = %claims.sub, error = %e, "Failed to revoke refresh token"),
                }
            }
        }

        LogoutResponse {
            success: true,
            message: "Logged out".to_string(),
        }
    }
}
