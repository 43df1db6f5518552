// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded credential database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized User
//! - `usernames`: username → user_id
//! - `invite_codes`: code → serialized InviteCode
//! - `revoked_tokens`: jti → expiry of the revoked token (unix seconds)
//!
//! redb serializes write transactions, so every conditional write below
//! (username uniqueness, invite consumption) is a single compare-and-set
//! within one transaction. Calls run on the blocking pool.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use uuid::Uuid;

use super::{CredentialStore, InviteCode, NewUser, StoreError, StoreResult, User};
use crate::auth::RevocationRegistry;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user_id → serialized User (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Unique index: username → user_id.
const USERNAMES: TableDefinition<&str, &str> = TableDefinition::new("usernames");

/// Invite codes: code → serialized InviteCode (JSON bytes).
const INVITE_CODES: TableDefinition<&str, &[u8]> = TableDefinition::new("invite_codes");

/// Revocation list: jti → token expiry.
const REVOKED_TOKENS: TableDefinition<&str, i64> = TableDefinition::new("revoked_tokens");

macro_rules! unavailable_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for StoreError {
                fn from(e: $source) -> Self {
                    StoreError::Unavailable(e.to_string())
                }
            }
        )*
    };
}

unavailable_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

// =============================================================================
// Write helpers (shared by single-step and transactional operations)
// =============================================================================

fn insert_user(txn: &WriteTransaction, new_user: NewUser) -> StoreResult<User> {
    let mut usernames = txn.open_table(USERNAMES)?;
    if usernames.get(new_user.username.as_str())?.is_some() {
        return Err(StoreError::DuplicateUsername(new_user.username));
    }

    let user = User::from_new(new_user);
    let id = user.id.to_string();
    let json = serde_json::to_vec(&user)?;

    usernames.insert(user.username.as_str(), id.as_str())?;
    let mut users = txn.open_table(USERS)?;
    users.insert(id.as_str(), json.as_slice())?;
    Ok(user)
}

/// Consume `code` for `consumer`. `Ok(false)` means it was already used.
fn consume_invite(txn: &WriteTransaction, code: &str, consumer: Uuid) -> StoreResult<bool> {
    let mut table = txn.open_table(INVITE_CODES)?;

    // Copy the value out before mutating the table
    let existing_bytes = {
        let existing = table.get(code)?.ok_or(StoreError::InviteNotFound)?;
        existing.value().to_vec()
    };

    let mut invite: InviteCode = serde_json::from_slice(&existing_bytes)?;
    if !invite.consume(consumer) {
        return Ok(false);
    }

    let json = serde_json::to_vec(&invite)?;
    table.insert(code, json.as_slice())?;
    Ok(true)
}

// =============================================================================
// CredentialDatabase
// =============================================================================

/// Persistent credential store and revocation registry.
#[derive(Clone)]
pub struct CredentialDatabase {
    db: Arc<Database>,
}

impl CredentialDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("cannot create {}: {e}", parent.display())))?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERNAMES)?;
            let _ = write_txn.open_table(INVITE_CODES)?;
            let _ = write_txn.open_table(REVOKED_TOKENS)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Run `op` against the database on the blocking pool.
    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl CredentialStore for CredentialDatabase {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let username = username.to_owned();
        self.run(move |db| {
            let read_txn = db.begin_read()?;
            let index = read_txn.open_table(USERNAMES)?;
            let Some(id) = index.get(username.as_str())?.map(|v| v.value().to_string()) else {
                return Ok(None);
            };

            let users = read_txn.open_table(USERS)?;
            let user: User = match users.get(id.as_str())? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => {
                    return Err(StoreError::Inconsistent(format!(
                        "username {username} indexes missing user {id}"
                    )))
                }
            };
            Ok(Some(user))
        })
        .await
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        self.run(move |db| {
            let write_txn = db.begin_write()?;
            let user = insert_user(&write_txn, new_user)?;
            write_txn.commit()?;
            Ok(user)
        })
        .await
    }

    async fn find_invite_code(&self, code: &str) -> StoreResult<Option<InviteCode>> {
        let code = code.to_owned();
        self.run(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(INVITE_CODES)?;
            let invite: Option<InviteCode> = match table.get(code.as_str())? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };
            Ok(invite)
        })
        .await
    }

    async fn mark_invite_code_used(&self, code: &str, consumer: Uuid) -> StoreResult<bool> {
        let code = code.to_owned();
        self.run(move |db| {
            let write_txn = db.begin_write()?;
            let transitioned = match consume_invite(&write_txn, &code, consumer) {
                Ok(transitioned) => transitioned,
                Err(StoreError::InviteNotFound) => false,
                Err(e) => return Err(e),
            };
            if transitioned {
                write_txn.commit()?;
            }
            Ok(transitioned)
        })
        .await
    }

    async fn create_invite_code(&self, code: &str, created_by: Uuid) -> StoreResult<InviteCode> {
        let invite = InviteCode::new(code, created_by);
        self.run(move |db| {
            let json = serde_json::to_vec(&invite)?;
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(INVITE_CODES)?;
                if table.get(invite.code.as_str())?.is_some() {
                    return Err(StoreError::DuplicateCode);
                }
                table.insert(invite.code.as_str(), json.as_slice())?;
            }
            write_txn.commit()?;
            Ok(invite)
        })
        .await
    }

    async fn register_with_invite(&self, new_user: NewUser, code: &str) -> StoreResult<User> {
        let code = code.to_owned();
        self.run(move |db| {
            // Dropping the transaction on any early return aborts both writes
            let write_txn = db.begin_write()?;
            let user = insert_user(&write_txn, new_user)?;
            if !consume_invite(&write_txn, &code, user.id)? {
                return Err(StoreError::InviteAlreadyUsed);
            }
            write_txn.commit()?;
            Ok(user)
        })
        .await
    }

    async fn list_invite_codes(&self, created_by: Option<Uuid>) -> StoreResult<Vec<InviteCode>> {
        self.run(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(INVITE_CODES)?;

            let mut invites = Vec::new();
            for entry in table.iter()? {
                let (_, value) = entry?;
                let invite: InviteCode = serde_json::from_slice(value.value())?;
                if created_by.is_none_or(|creator| invite.created_by == creator) {
                    invites.push(invite);
                }
            }
            invites.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.code.cmp(&b.code)));
            Ok(invites)
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.run(|db| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(USERS)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl RevocationRegistry for CredentialDatabase {
    async fn revoke(&self, jti: &str, expires_at: i64) -> StoreResult<()> {
        if jti.is_empty() {
            return Ok(());
        }
        let jti = jti.to_owned();
        self.run(move |db| {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(REVOKED_TOKENS)?;
                let current = table.get(jti.as_str())?.map(|v| v.value());
                let keep_until = current.map_or(expires_at, |c| c.max(expires_at));
                table.insert(jti.as_str(), keep_until)?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn is_revoked(&self, jti: &str) -> StoreResult<bool> {
        let jti = jti.to_owned();
        self.run(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(REVOKED_TOKENS)?;
            let revoked = table.get(jti.as_str())?.is_some();
            Ok(revoked)
        })
        .await
    }

    async fn prune_expired(&self, cutoff: i64) -> StoreResult<usize> {
        self.run(move |db| {
            let write_txn = db.begin_write()?;
            let removed = {
                let mut table = write_txn.open_table(REVOKED_TOKENS)?;
                let mut expired = Vec::new();
                for entry in table.iter()? {
                    let (jti, expires_at) = entry?;
                    if expires_at.value() < cutoff {
                        expired.push(jti.value().to_string());
                    }
                }
                for jti in &expired {
                    table.remove(jti.as_str())?;
                }
                expired.len()
            };
            write_txn.commit()?;
            Ok(removed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, CredentialDatabase) {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let db = CredentialDatabase::open(&temp.path().join("auth.redb")).expect("open db");
        (temp, db)
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn create_and_find_user() {
        let (_temp, db) = open_temp();
        let created = db.create_user(new_user("alice")).await.unwrap();

        let found = db.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(db.find_user_by_username("nobody").await.unwrap().is_none());

        let dup = db.create_user(new_user("alice")).await;
        assert!(matches!(dup, Err(StoreError::DuplicateUsername(_))));
    }

    #[tokio::test]
    async fn invite_lifecycle() {
        let (_temp, db) = open_temp();
        let admin = Uuid::new_v4();
        db.create_invite_code("WELCOME2026", admin).await.unwrap();

        let dup = db.create_invite_code("WELCOME2026", admin).await;
        assert!(matches!(dup, Err(StoreError::DuplicateCode)));

        let consumer = Uuid::new_v4();
        assert!(db.mark_invite_code_used("WELCOME2026", consumer).await.unwrap());
        assert!(!db.mark_invite_code_used("WELCOME2026", Uuid::new_v4()).await.unwrap());
        assert!(!db.mark_invite_code_used("UNKNOWN", consumer).await.unwrap());

        let invite = db.find_invite_code("WELCOME2026").await.unwrap().unwrap();
        assert!(invite.used);
        assert_eq!(invite.used_by, Some(consumer));
    }

    #[tokio::test]
    async fn register_rolls_back_on_used_code() {
        let (_temp, db) = open_temp();
        db.create_invite_code("ONCE", Uuid::new_v4()).await.unwrap();

        let first = db.register_with_invite(new_user("first"), "ONCE").await.unwrap();
        let second = db.register_with_invite(new_user("second"), "ONCE").await;

        assert!(matches!(second, Err(StoreError::InviteAlreadyUsed)));
        assert!(db.find_user_by_username("second").await.unwrap().is_none());
        let invite = db.find_invite_code("ONCE").await.unwrap().unwrap();
        assert_eq!(invite.used_by, Some(first.id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registration_has_one_winner() {
        let (_temp, db) = open_temp();
        db.create_invite_code("RACE", Uuid::new_v4()).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                tokio::spawn(async move {
                    db.register_with_invite(new_user(&format!("racer{i}")), "RACE").await
                })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(user) => winners.push(user),
                Err(StoreError::InviteAlreadyUsed) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(winners.len(), 1);
        let invite = db.find_invite_code("RACE").await.unwrap().unwrap();
        assert_eq!(invite.used_by, Some(winners[0].id));

        for i in 0..8 {
            let name = format!("racer{i}");
            let found = db.find_user_by_username(&name).await.unwrap();
            assert_eq!(found.is_some(), name == winners[0].username);
        }
    }

    #[tokio::test]
    async fn register_with_unknown_code_creates_nothing() {
        let (_temp, db) = open_temp();
        let result = db.register_with_invite(new_user("ghost"), "NOPE").await;

        assert!(matches!(result, Err(StoreError::InviteNotFound)));
        assert!(db.find_user_by_username("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn revocations_survive_reopen_and_prune() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("auth.redb");

        {
            let db = CredentialDatabase::open(&path).unwrap();
            db.revoke("old-jti", 1_000).await.unwrap();
            db.revoke("live-jti", 5_000).await.unwrap();
            db.revoke("", 5_000).await.unwrap();
        }

        let db = CredentialDatabase::open(&path).unwrap();
        assert!(db.is_revoked("old-jti").await.unwrap());
        assert!(db.is_revoked("live-jti").await.unwrap());
        assert!(!db.is_revoked("").await.unwrap());

        assert_eq!(db.prune_expired(2_000).await.unwrap(), 1);
        assert!(!db.is_revoked("old-jti").await.unwrap());
        assert!(db.is_revoked("live-jti").await.unwrap());
    }

    #[tokio::test]
    async fn list_invites_sorted() {
        let (_temp, db) = open_temp();
        let admin = Uuid::new_v4();
        db.create_invite_code("FIRST", admin).await.unwrap();
        db.create_invite_code("SECOND", Uuid::new_v4()).await.unwrap();

        let all = db.list_invite_codes(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].code, "FIRST");

        let mine = db.list_invite_codes(Some(admin)).await.unwrap();
        assert_eq!(mine.len(), 1);
    }
}
