// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints.
//!
//! These endpoints require the Admin role and provide:
//! - Direct account creation with any role
//! - Invite code generation and listing

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    auth::{AdminOnly, AuthError},
    models::{CreateUserRequest, GenerateInvitesRequest, InviteListResponse, UserSummary},
    state::AppState,
};

/// Query parameters for invite listing.
#[derive(Debug, Deserialize, IntoParams)]
pub struct InviteListQuery {
    /// Only codes generated by this admin.
    pub created_by: Option<Uuid>,
}

/// Create an account directly, bypassing invite codes.
#[utoipa::path(
    post,
    path = "/v1/admin/users",
    request_body = CreateUserRequest,
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Account created", body = UserSummary),
        (status = 400, description = "Invalid role or input"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn create_user(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserSummary>), AuthError> {
    let user = state.registration.create_user(request).await?;
    tracing::info!(admin_id = %admin.user_id, user_id = %user.id, "Admin created account");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Generate a batch of invite codes.
#[utoipa::path(
    post,
    path = "/v1/admin/invites",
    request_body = GenerateInvitesRequest,
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Codes generated", body = InviteListResponse),
        (status = 400, description = "Quantity out of range"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn generate_invites(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<GenerateInvitesRequest>,
) -> Result<(StatusCode, Json<InviteListResponse>), AuthError> {
    let invites = state
        .registration
        .generate_invites(admin.user_id, request.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(invites.into())))
}

/// List invite codes, oldest first.
#[utoipa::path(
    get,
    path = "/v1/admin/invites",
    params(InviteListQuery),
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, body = InviteListResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_invites(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<InviteListQuery>,
) -> Result<Json<InviteListResponse>, AuthError> {
    let invites = state.registration.list_invites(query.created_by).await?;
    Ok(Json(invites.into()))
}
