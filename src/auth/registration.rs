// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account creation and invite codes.
//!
//! ## Entry Points
//!
//! - [`RegistrationService::register`] - public, gated by a single-use
//!   invite code, always yields [`Role::User`]
//! - [`RegistrationService::create_user`] - admin-direct, any role from
//!   the closed set
//!
//! Public registration creates the user and consumes the code in one store
//! transaction, so a failure can never leave an account without a consumed
//! code.

use std::sync::Arc;

use rand::{distr::Alphanumeric, Rng};
use tracing::{info, warn};
use uuid::Uuid;

use super::{password::PasswordHasher, AuthError, Role};
use crate::models::{CreateUserRequest, RegisterRequest, UserSummary};
use crate::storage::{CredentialStore, InviteCode, NewUser, StoreError};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;
pub const PASSWORD_MIN_LEN: usize = 8;
/// bcrypt ignores everything past 72 bytes.
pub const PASSWORD_MAX_BYTES: usize = 72;

pub const INVITE_CODE_LEN: usize = 16;
/// Attempts per code before giving up on collisions.
const INVITE_CODE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    invite_batch_max: usize,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher, invite_batch_max: usize) -> Self {
        Self {
            store,
            hasher,
            invite_batch_max,
        }
    }

    /// Register with an invite code.
    ///
    /// Any role in the request is ignored.
    pub async fn register(&self, request: RegisterRequest) -> Result<UserSummary, AuthError> {
        let username = validate_username(&request.username)?;
        validate_password(&request.password)?;
        let code = request.invite_code.trim();
        if code.is_empty() {
            return Err(AuthError::Validation("Invite code is required".to_string()));
        }

        if let Some(requested) = request.role.as_deref() {
            if Role::parse(requested) != Some(Role::User) {
                warn!(username, requested_role = requested, "Ignoring role supplied to public registration");
            }
        }

        // Fail fast before spending a bcrypt round; the transaction below
        // re-checks both conditions.
        match self.store.find_invite_code(code).await? {
            None => return Err(AuthError::InvalidInviteCode),
            Some(invite) if invite.used => return Err(AuthError::InviteCodeAlreadyUsed),
            Some(_) => {}
        }

        let password_hash = self.hasher.hash(&request.password).await?;
        let user = self
            .store
            .register_with_invite(
                NewUser {
                    username: username.to_string(),
                    password_hash,
                    role: Role::User,
                },
                code,
            )
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered with invite code");
        Ok(user.summary())
    }

    /// Create an account directly, with an explicit role.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserSummary, AuthError> {
        let role = match request.role.as_deref() {
            None => Role::User,
            Some(raw) => Role::parse(raw).ok_or_else(|| AuthError::InvalidRole(raw.to_string()))?,
        };
        let username = validate_username(&request.username)?;
        validate_password(&request.password)?;

        if self.store.find_user_by_username(username).await?.is_some() {
            return Err(AuthError::DuplicateUsername);
        }

        let password_hash = self.hasher.hash(&request.password).await?;
        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
                role,
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, role = %user.role, "User created by admin");
        Ok(user.summary())
    }

    /// Generate `quantity` fresh invite codes on behalf of `creator`.
    pub async fn generate_invites(&self, creator: Uuid, quantity: usize) -> Result<Vec<InviteCode>, AuthError> {
        if quantity == 0 || quantity > self.invite_batch_max {
            return Err(AuthError::Validation(format!(
                "Quantity must be between 1 and {}",
                self.invite_batch_max
            )));
        }

        let mut invites = Vec::with_capacity(quantity);
        for _ in 0..quantity {
            invites.push(self.create_unique_invite(creator).await?);
        }

        info!(created_by = %creator, count = invites.len(), "Invite codes generated");
        Ok(invites)
    }

    async fn create_unique_invite(&self, creator: Uuid) -> Result<InviteCode, AuthError> {
        for attempt in 1..=INVITE_CODE_ATTEMPTS {
            match self.store.create_invite_code(&generate_invite_code(), creator).await {
                Ok(invite) => return Ok(invite),
                Err(StoreError::DuplicateCode) => {
                    warn!(attempt, "Invite code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AuthError::Internal(format!(
            "no unique invite code after {INVITE_CODE_ATTEMPTS} attempts"
        )))
    }

    pub async fn list_invites(&self, created_by: Option<Uuid>) -> Result<Vec<InviteCode>, AuthError> {
        Ok(self.store.list_invite_codes(created_by).await?)
    }

    /// Create the bootstrap admin unless the username already exists.
    /// Returns the admin's id either way.
    pub async fn seed_admin(&self, username: &str, password: &str) -> Result<Uuid, AuthError> {
        if let Some(existing) = self.store.find_user_by_username(username.trim()).await? {
            if existing.role != Role::Admin {
                warn!(username, role = %existing.role, "Seed admin username belongs to a non-admin account");
            }
            return Ok(existing.id);
        }

        let admin = self
            .create_user(CreateUserRequest {
                username: username.to_string(),
                password: password.to_string(),
                role: Some(Role::Admin.as_str().to_string()),
            })
            .await?;
        info!(user_id = %admin.id, username = %admin.username, "Seeded admin account");
        Ok(admin.id)
    }

    /// Insert a fixed invite code unless it already exists.
    pub async fn seed_invite_code(&self, code: &str, created_by: Uuid) -> Result<(), AuthError> {
        let code = code.trim();
        if code.is_empty() || self.store.find_invite_code(code).await?.is_some() {
            return Ok(());
        }
        match self.store.create_invite_code(code, created_by).await {
            Ok(_) | Err(StoreError::DuplicateCode) => {
                info!("Seeded invite code");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Random alphanumeric code, roughly 95 bits of entropy.
pub fn generate_invite_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(char::from)
        .collect()
}

/// Returns the trimmed username.
pub fn validate_username(raw: &str) -> Result<&str, AuthError> {
    let username = raw.trim();
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AuthError::Validation(format!(
            "Username must be between {USERNAME_MIN_LEN} and {USERNAME_MAX_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AuthError::Validation(
            "Username may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(username)
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }
    if password.len() > PASSWORD_MAX_BYTES {
        return Err(AuthError::Validation(format!(
            "Password must be at most {PASSWORD_MAX_BYTES} bytes"
        )));
    }
    Ok(())
}
