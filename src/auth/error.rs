// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::storage::StoreError;

/// Message returned for every internal failure, whatever the cause.
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Authentication error type.
///
/// Token failures keep distinct codes (`token_expired`, `token_invalid`,
/// `token_revoked`) because clients react differently to each. Internal
/// variants carry a detail string for logs only; it never reaches the
/// response body.
#[derive(Debug)]
pub enum AuthError {
    /// Unknown user or wrong password (deliberately indistinguishable)
    InvalidCredentials,
    /// Invite code does not exist
    InvalidInviteCode,
    /// Invite code was already consumed
    InviteCodeAlreadyUsed,
    /// Username is taken
    DuplicateUsername,
    /// Token has expired
    TokenExpired,
    /// Token is malformed or its signature is invalid
    TokenInvalid,
    /// Refresh token was revoked by logout
    TokenRevoked,
    /// Store records contradict each other
    InternalInconsistency(String),
    /// Credential store I/O failure
    StoreUnavailable(String),
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Insufficient permissions
    InsufficientPermissions,
    /// Role outside the closed set
    InvalidRole(String),
    /// Request field failed validation
    Validation(String),
    /// Hashing or task failure
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidInviteCode => "invalid_invite_code",
            AuthError::InviteCodeAlreadyUsed => "invite_code_already_used",
            AuthError::DuplicateUsername => "duplicate_username",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenInvalid => "token_invalid",
            AuthError::TokenRevoked => "token_revoked",
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::InvalidRole(_) => "invalid_role",
            AuthError::Validation(_) => "validation_error",
            AuthError::InternalInconsistency(_)
            | AuthError::StoreUnavailable(_)
            | AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenRevoked
            | AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader => StatusCode::UNAUTHORIZED,
            AuthError::TokenInvalid | AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::InvalidInviteCode
            | AuthError::InviteCodeAlreadyUsed
            | AuthError::InvalidRole(_)
            | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateUsername => StatusCode::CONFLICT,
            AuthError::InternalInconsistency(_)
            | AuthError::StoreUnavailable(_)
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error hides an internal cause from the caller.
    pub fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// The message safe to show to the caller.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid username or password"),
            AuthError::InvalidInviteCode => write!(f, "Invalid invite code"),
            AuthError::InviteCodeAlreadyUsed => {
                write!(f, "This invite code has already been used")
            }
            AuthError::DuplicateUsername => write!(f, "Username is already taken"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::TokenRevoked => write!(f, "Token has been revoked"),
            AuthError::InternalInconsistency(msg) => write!(f, "Internal inconsistency: {msg}"),
            AuthError::StoreUnavailable(msg) => write!(f, "Credential store unavailable: {msg}"),
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::InsufficientPermissions => {
                write!(f, "Insufficient permissions for this operation")
            }
            AuthError::InvalidRole(role) => write!(f, "Invalid role: {role}"),
            AuthError::Validation(msg) => write!(f, "{msg}"),
            AuthError::Internal(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateUsername(_) => AuthError::DuplicateUsername,
            StoreError::InviteNotFound => AuthError::InvalidInviteCode,
            StoreError::InviteAlreadyUsed => AuthError::InviteCodeAlreadyUsed,
            StoreError::Inconsistent(msg) => AuthError::InternalInconsistency(msg),
            StoreError::DuplicateCode | StoreError::Unavailable(_) => {
                AuthError::StoreUnavailable(e.to_string())
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_internal() {
            error!(error_code = self.error_code(), detail = %self, "Request failed internally");
        }
        let body = Json(AuthErrorBody {
            error: self.public_message(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
