// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `ToSchema` for OpenAPI documentation.
//!
//! Request types that carry a password or a token deliberately do not
//! derive `Debug`, so they cannot end up in logs by accident.
//!
//! ## Model Categories
//!
//! - **Registration**: Invite-gated sign-up and admin-direct creation
//! - **Sessions**: Login, refresh and logout
//! - **Invites**: Batch generation and listing of invite codes

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Role;
use crate::storage::InviteCode;

// =============================================================================
// Users
// =============================================================================

/// Public-safe view of an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

// =============================================================================
// Registration
// =============================================================================

/// Request to register with an invite code.
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub invite_code: String,
    /// Accepted for compatibility and ignored: public registration always
    /// produces the `user` role.
    #[serde(default)]
    pub role: Option<String>,
}

/// Request to create an account directly (admin only).
#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    /// One of `user`, `moderator`, `admin`. Defaults to `user`.
    #[serde(default)]
    pub role: Option<String>,
}

// =============================================================================
// Sessions
// =============================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// A missing token is treated as empty; logout still succeeds.
#[derive(Deserialize, ToSchema)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Tokens issued on login.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    pub user: UserSummary,
}

/// A new access token. The refresh token is not rotated.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

// =============================================================================
// Invites
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateInvitesRequest {
    /// Number of codes to generate (1-20)
    #[serde(default = "default_invite_quantity")]
    pub quantity: usize,
}

fn default_invite_quantity() -> usize {
    1
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InviteListResponse {
    pub invites: Vec<InviteCode>,
    pub total: usize,
}

impl From<Vec<InviteCode>> for InviteListResponse {
    fn from(invites: Vec<InviteCode>) -> Self {
        Self {
            total: invites.len(),
            invites,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_accepts_but_keeps_role_optional() {
        let without: RegisterRequest = serde_json::from_str(
            r#"{"username":"bob","password":"hunter2hunter2","invite_code":"ABC"}"#,
        )
        .unwrap();
        assert!(without.role.is_none());

        let with: RegisterRequest = serde_json::from_str(
            r#"{"username":"bob","password":"hunter2hunter2","invite_code":"ABC","role":"admin"}"#,
        )
        .unwrap();
        assert_eq!(with.role.as_deref(), Some("admin"));
    }

    #[test]
    fn invite_quantity_defaults_to_one() {
        let request: GenerateInvitesRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.quantity, 1);
    }
}
