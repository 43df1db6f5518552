// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Auth - Invite-Gated Authentication Service
//!
//! Registration behind single-use invite codes, bcrypt credential checks and
//! a dual-token session model: short-lived access tokens and long-lived
//! refresh tokens that can be revoked on logout.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token lifecycle, sessions and registration
//! - `storage` - Credential store (in-memory or redb)
//! - `pruner` - Background cleanup of expired revocations

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod pruner;
pub mod state;
pub mod storage;
