// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::roles::Role;
use crate::storage::User;

/// Access to the token identifier, used by the verifier's revocation check.
pub trait TokenClaims {
    fn jti(&self) -> Option<&str>;
}

/// Claims of a short-lived access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Absent when the token was minted from a refresh token, which does
    /// not carry the username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub role: Role,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Unique per token; access tokens are not revocable
    pub jti: String,
}

impl TokenClaims for AccessClaims {
    fn jti(&self) -> Option<&str> {
        Some(&self.jti)
    }
}

/// Claims of a long-lived refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub role: Role,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Revocation handle
    #[serde(default)]
    pub jti: Option<String>,
}

impl TokenClaims for RefreshClaims {
    fn jti(&self) -> Option<&str> {
        self.jti.as_deref()
    }
}

/// Identity a token is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub id: Uuid,
    pub username: Option<String>,
    pub role: Role,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: Some(user.username.clone()),
            role: user.role,
        }
    }
}

impl From<&RefreshClaims> for TokenSubject {
    /// The username is unknown at refresh time and stays unset.
    fn from(claims: &RefreshClaims) -> Self {
        Self {
            id: claims.sub,
            username: None,
            role: claims.role,
        }
    }
}

/// Authenticated user information extracted from an access token.
///
/// This is the primary type used by handlers to represent the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: Uuid,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// User's role
    pub role: Role,

    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Create from verified access-token claims.
    pub fn from_claims(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
            expires_at: claims.exp,
        }
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    /// Check if this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
