// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Credential checks and the dual-token session model.
//!
//! ## Auth Flow
//!
//! 1. A user registers with a single-use invite code (or an admin creates
//!    the account directly)
//! 2. `POST /v1/auth/login` returns a short-lived access token and a
//!    long-lived refresh token
//! 3. Clients send `Authorization: Bearer <access token>`; the server
//!    verifies signature and expiry and extracts:
//!      - `sub` → canonical `user_id`
//!      - `role`
//! 4. When the access token expires, `POST /v1/auth/refresh` trades the
//!    refresh token for a new one
//! 5. `POST /v1/auth/logout` revokes the refresh token's `jti`
//!
//! ## Security
//!
//! - Access and refresh tokens are signed with different secrets
//! - Access tokens are not revocable and live until expiry
//! - Passwords are hashed with bcrypt off the async workers
//! - No clock skew tolerance: a token past `exp` is rejected
//! - Unknown usernames still pay for one bcrypt verification

pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod registration;
pub mod revocation;
pub mod roles;
pub mod session;
pub mod tokens;

pub use claims::{AccessClaims, AuthenticatedUser, RefreshClaims, TokenSubject};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use password::PasswordHasher;
pub use registration::RegistrationService;
pub use revocation::{InMemoryRevocationRegistry, RevocationRegistry};
pub use roles::Role;
pub use session::SessionService;
pub use tokens::{TokenKind, TokenService};
