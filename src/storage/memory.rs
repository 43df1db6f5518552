// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory credential store.
//!
//! All tables sit behind one mutex so multi-record operations
//! (registration) are atomic. The lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{CredentialStore, InviteCode, NewUser, StoreError, StoreResult, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    usernames: HashMap<String, Uuid>,
    invites: HashMap<String, InviteCode>,
}

impl Tables {
    fn insert_user(&mut self, new_user: NewUser) -> StoreResult<User> {
        if self.usernames.contains_key(&new_user.username) {
            return Err(StoreError::DuplicateUsername(new_user.username));
        }
        let user = User::from_new(new_user);
        self.usernames.insert(user.username.clone(), user.id);
        self.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("credential store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.lock()?;
        let Some(id) = tables.usernames.get(username) else {
            return Ok(None);
        };
        tables
            .users
            .get(id)
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                StoreError::Inconsistent(format!(
                    "username {username} indexes missing user {id}"
                ))
            })
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        self.lock()?.insert_user(new_user)
    }

    async fn find_invite_code(&self, code: &str) -> StoreResult<Option<InviteCode>> {
        Ok(self.lock()?.invites.get(code).cloned())
    }

    async fn mark_invite_code_used(&self, code: &str, consumer: Uuid) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        Ok(tables
            .invites
            .get_mut(code)
            .is_some_and(|invite| invite.consume(consumer)))
    }

    async fn create_invite_code(&self, code: &str, created_by: Uuid) -> StoreResult<InviteCode> {
        let mut tables = self.lock()?;
        if tables.invites.contains_key(code) {
            return Err(StoreError::DuplicateCode);
        }
        let invite = InviteCode::new(code, created_by);
        tables.invites.insert(invite.code.clone(), invite.clone());
        Ok(invite)
    }

    async fn register_with_invite(&self, new_user: NewUser, code: &str) -> StoreResult<User> {
        let mut tables = self.lock()?;

        // Validate both preconditions before the first write so a failure
        // leaves nothing behind.
        match tables.invites.get(code) {
            None => return Err(StoreError::InviteNotFound),
            Some(invite) if invite.used => return Err(StoreError::InviteAlreadyUsed),
            Some(_) => {}
        }

        let user = tables.insert_user(new_user)?;
        if let Some(invite) = tables.invites.get_mut(code) {
            invite.consume(user.id);
        }
        Ok(user)
    }

    async fn list_invite_codes(&self, created_by: Option<Uuid>) -> StoreResult<Vec<InviteCode>> {
        let tables = self.lock()?;
        let mut invites: Vec<InviteCode> = tables
            .invites
            .values()
            .filter(|invite| created_by.is_none_or(|creator| invite.created_by == creator))
            .cloned()
            .collect();
        invites.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.code.cmp(&b.code)));
        Ok(invites)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }
}
