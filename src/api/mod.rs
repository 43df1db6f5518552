// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{HeaderName, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{AuthenticatedUser, Role},
    models::{
        CreateUserRequest, GenerateInvitesRequest, InviteListResponse, LoginRequest,
        LoginResponse, LogoutRequest, LogoutResponse, RefreshRequest, RefreshResponse,
        RegisterRequest, UserSummary,
    },
    state::AppState,
    storage::InviteCode,
};

pub mod admin;
pub mod auth;
pub mod health;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/admin/users", post(admin::create_user))
        .route(
            "/admin/invites",
            get(admin::list_invites).post(admin::generate_invites),
        );

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .fallback(not_found)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Route not found" })))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::me,
        admin::create_user,
        admin::generate_invites,
        admin::list_invites,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Role,
            UserSummary,
            AuthenticatedUser,
            InviteCode,
            RegisterRequest,
            CreateUserRequest,
            LoginRequest,
            LoginResponse,
            RefreshRequest,
            RefreshResponse,
            LogoutRequest,
            LogoutResponse,
            GenerateInvitesRequest,
            InviteListResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login, token refresh and logout"),
        (name = "Admin", description = "Account creation and invite codes"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
