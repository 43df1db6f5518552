// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{
    claims::AccessClaims,
    tokens::TokenKind,
    AuthError, AuthenticatedUser,
};
use crate::state::AppState;

/// Extractor for authenticated users.
///
/// Validates the bearer access token from the Authorization header. Access
/// tokens are not revocable, so the revocation registry is not consulted.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(Auth(user): Auth) -> Json<AuthenticatedUser> {
///     Json(user)
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims: AccessClaims = state.tokens.verify(token, TokenKind::Access, false).await?;

        Ok(Auth(AuthenticatedUser::from_claims(claims)))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(AdminOnly(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{claims::TokenSubject, Role};
    use axum::http::Request;
    use chrono::Utc;
    use uuid::Uuid;

    fn parts_with(header: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn token_for(state: &AppState, role: Role) -> (Uuid, String) {
        let subject = TokenSubject {
            id: Uuid::new_v4(),
            username: Some("tester".to_string()),
            role,
        };
        (subject.id, state.tokens.issue_access_token(&subject).unwrap())
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let state = AppState::in_memory();
        let mut parts = parts_with(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_other_schemes() {
        let state = AppState::in_memory();
        let mut parts = parts_with(Some("Basic dXNlcjpwYXNz".to_string()));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));

        let mut parts = parts_with(Some("Bearer ".to_string()));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_access_token() {
        let state = AppState::in_memory();
        let (user_id, token) = token_for(&state, Role::User);
        let mut parts = parts_with(Some(format!("Bearer {token}")));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.username.as_deref(), Some("tester"));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_refresh_token() {
        let state = AppState::in_memory();
        let subject = TokenSubject {
            id: Uuid::new_v4(),
            username: None,
            role: Role::Admin,
        };
        let refresh = state.tokens.issue_refresh_token(&subject).unwrap();
        let mut parts = parts_with(Some(format!("Bearer {refresh}")));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::TokenInvalid)));
    }

    #[tokio::test]
    async fn auth_extractor_reports_expiry() {
        let state = AppState::in_memory();
        let now = Utc::now().timestamp();
        let expired = state
            .tokens
            .sign(
                &AccessClaims {
                    sub: Uuid::new_v4(),
                    username: None,
                    role: Role::User,
                    iat: now - 7200,
                    exp: now - 3600,
                    jti: "old".to_string(),
                },
                TokenKind::Access,
            )
            .unwrap();
        let mut parts = parts_with(Some(format!("Bearer {expired}")));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn admin_only_rejects_non_admin() {
        let state = AppState::in_memory();
        let (_, token) = token_for(&state, Role::Moderator);
        let mut parts = parts_with(Some(format!("Bearer {token}")));

        let result = AdminOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));
    }

    #[tokio::test]
    async fn admin_only_accepts_admin() {
        let state = AppState::in_memory();
        let (user_id, token) = token_for(&state, Role::Admin);
        let mut parts = parts_with(Some(format!("Bearer {token}")));

        let AdminOnly(user) = AdminOnly::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, user_id);
    }
}
