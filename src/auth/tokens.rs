// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token issuing and verification.
//!
//! Access and refresh tokens are HS256 JWTs signed with two distinct
//! secrets, so a token of one kind never verifies as the other. A single
//! [`TokenService::verify`] serves both kinds; it is parametrized by the
//! token kind and whether the revocation registry must be consulted.
//!
//! Verification order:
//! 1. Signature and structure (`TokenInvalid`)
//! 2. Expiry, with no leeway: `exp` in the past is `TokenExpired`
//! 3. Revocation, if requested and the claims carry a `jti` (`TokenRevoked`)

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::{
    claims::{AccessClaims, RefreshClaims, TokenClaims, TokenSubject},
    AuthError, RevocationRegistry,
};
use crate::config::{ConfigError, TokenSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Issues and verifies both token kinds.
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
    validation: Validation,
    revocations: Arc<dyn RevocationRegistry>,
}

impl TokenService {
    /// Fails if both token kinds would share a secret or a lifetime is
    /// out of range.
    pub fn new(
        settings: &TokenSettings,
        revocations: Arc<dyn RevocationRegistry>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;

        Ok(Self {
            access: KeyPair::from_secret(&settings.access_secret),
            refresh: KeyPair::from_secret(&settings.refresh_secret),
            access_ttl_secs: settings.access_ttl_secs,
            refresh_ttl_secs: settings.refresh_ttl_secs,
            validation,
            revocations,
        })
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Sign an access token carrying `{sub, username, role}`.
    pub fn issue_access_token(&self, subject: &TokenSubject) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: subject.id,
            username: subject.username.clone(),
            role: subject.role,
            iat: now,
            exp: now + self.access_ttl_secs as i64,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims, TokenKind::Access)
    }

    /// Sign a refresh token carrying `{sub, role}` and a fresh `jti`.
    ///
    /// The username is left out; it may be stale by the time the token is
    /// used.
    pub fn issue_refresh_token(&self, subject: &TokenSubject) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: subject.id,
            role: subject.role,
            iat: now,
            exp: now + self.refresh_ttl_secs as i64,
            jti: Some(Uuid::new_v4().to_string()),
        };
        self.sign(&claims, TokenKind::Refresh)
    }

    pub(crate) fn sign<C: Serialize>(&self, claims: &C, kind: TokenKind) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys(kind).encoding)
            .map_err(|e| AuthError::Internal(format!("failed to sign token: {e}")))
    }

    /// Verify `token` as a token of `kind`.
    pub async fn verify<C>(
        &self,
        token: &str,
        kind: TokenKind,
        check_revocation: bool,
    ) -> Result<C, AuthError>
    where
        C: DeserializeOwned + TokenClaims,
    {
        let claims = decode::<C>(token, &self.keys(kind).decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })?
            .claims;

        if check_revocation {
            if let Some(jti) = claims.jti().filter(|jti| !jti.is_empty()) {
                if self.revocations.is_revoked(jti).await? {
                    return Err(AuthError::TokenRevoked);
                }
            }
        }

        Ok(claims)
    }

    /// Decode a token whose signature is valid, accepting it even if it
    /// has expired. Returns `None` for anything that fails the signature
    /// or structure check.
    pub fn decode_ignoring_expiry<C: DeserializeOwned>(&self, token: &str, kind: TokenKind) -> Option<C> {
        let mut validation = self.validation.clone();
        validation.validate_exp = false;
        decode::<C>(token, &self.keys(kind).decoding, &validation)
            .ok()
            .map(|data| data.claims)
    }
}
