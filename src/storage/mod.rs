// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Storage
//!
//! Users and invite codes live behind the [`CredentialStore`] trait. Two
//! backends are provided:
//!
//! - [`InMemoryStore`] - process-local maps behind a single lock, used for
//!   tests and throwaway single-instance deployments
//! - [`CredentialDatabase`] - embedded redb database (ACID), which also
//!   persists the refresh-token revocation list
//!
//! ## Invariants
//!
//! - Usernames are unique (exact match).
//! - Invite codes are unique and move from unused to used exactly once.
//! - [`CredentialStore::register_with_invite`] creates the user and consumes
//!   the code in one transaction: both writes land or neither does.

pub mod database;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Role;
use crate::models::UserSummary;

pub use database::CredentialDatabase;
pub use memory::InMemoryStore;

/// Error type for credential store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username already exists: {0}")]
    DuplicateUsername(String),

    #[error("invite code already exists")]
    DuplicateCode,

    #[error("invite code not found")]
    InviteNotFound,

    #[error("invite code already used")]
    InviteAlreadyUsed,

    /// Stored records contradict each other (corrupt or partially written data).
    #[error("inconsistent store state: {0}")]
    Inconsistent(String),

    /// The backend could not be reached or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Inconsistent(format!("undecodable record: {e}"))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// bcrypt hash, never serialized into API responses
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    fn from_new(new_user: NewUser) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: new_user.username,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: Utc::now(),
        }
    }

    /// Public-safe view of the account.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// Input for account creation. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Single-use registration code.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct InviteCode {
    /// The code handed to the invitee
    pub code: String,
    /// Whether the code has been consumed
    pub used: bool,
    /// Admin who generated the code
    pub created_by: Uuid,
    /// Account created with this code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

impl InviteCode {
    fn new(code: impl Into<String>, created_by: Uuid) -> Self {
        Self {
            code: code.into(),
            used: false,
            created_by,
            used_by: None,
            created_at: Utc::now(),
            used_at: None,
        }
    }

    /// Perform the unused -> used transition. Returns `false` if the code
    /// was already consumed, leaving it untouched.
    fn consume(&mut self, consumer: Uuid) -> bool {
        if self.used {
            return false;
        }
        self.used = true;
        self.used_by = Some(consumer);
        self.used_at = Some(Utc::now());
        true
    }
}

/// Persistence contract for users and invite codes.
///
/// Every method may be called concurrently from many requests.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Fails with [`StoreError::DuplicateUsername`] if the name is taken.
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;

    async fn find_invite_code(&self, code: &str) -> StoreResult<Option<InviteCode>>;

    /// Conditional update: marks the code used only if it is still unused.
    /// Returns `true` iff this call performed the transition; an unknown
    /// code also yields `false`.
    async fn mark_invite_code_used(&self, code: &str, consumer: Uuid) -> StoreResult<bool>;

    /// Fails with [`StoreError::DuplicateCode`] on collision.
    async fn create_invite_code(&self, code: &str, created_by: Uuid) -> StoreResult<InviteCode>;

    /// Create the user and consume `code` atomically.
    ///
    /// Fails with [`StoreError::InviteNotFound`], [`StoreError::InviteAlreadyUsed`]
    /// or [`StoreError::DuplicateUsername`]; on any failure nothing is written.
    async fn register_with_invite(&self, new_user: NewUser, code: &str) -> StoreResult<User>;

    /// Invite codes, oldest first, optionally restricted to one creator.
    async fn list_invite_codes(&self, created_by: Option<Uuid>) -> StoreResult<Vec<InviteCode>>;

    /// Cheap liveness probe used by the readiness endpoint.
    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_consumes_exactly_once() {
        let creator = Uuid::new_v4();
        let first = Uuid::new_v4();
        let mut invite = InviteCode::new("CODE", creator);

        assert!(invite.consume(first));
        assert!(!invite.consume(Uuid::new_v4()));
        assert!(invite.used);
        assert_eq!(invite.used_by, Some(first));
        assert!(invite.used_at.is_some());
    }

    #[test]
    fn summary_omits_password_hash() {
        let user = User::from_new(NewUser {
            username: "alice".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            role: Role::Moderator,
        });

        let json = serde_json::to_value(user.summary()).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["role"], "moderator");
        assert!(json.get("password_hash").is_none());
    }
}
