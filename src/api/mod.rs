// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::Role,
    error::ErrorBody,
    handshake::CallbackForm,
    portal::{AccessDecision, Portal},
    session::GuardDecision,
    state::AppState,
};

pub mod auth;
pub mod client;
pub mod health;
pub mod portals;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/portals", get(portals::list_portals))
        .route("/access", get(portals::check_access))
        .route("/roles/{role}/dashboard", get(portals::role_dashboard))
        .route("/login/{portal}", get(auth::login))
        .route("/auth/callback", post(auth::callback))
        .route("/session/{portal}", get(auth::session))
        .route("/logout", post(auth::logout))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/health/live", get(health::liveness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::readiness,
        health::liveness,
        portals::list_portals,
        portals::check_access,
        portals::role_dashboard,
        auth::login,
        auth::callback,
        auth::session,
        auth::logout
    ),
    components(
        schemas(
            Role,
            Portal,
            AccessDecision,
            GuardDecision,
            CallbackForm,
            ErrorBody,
            portals::PortalSummary,
            portals::RoleDashboard,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Portals", description = "Portal registry and role access decisions"),
        (name = "Auth", description = "Entra ID sign-in handshake and dashboard sessions")
    )
)]
struct ApiDoc;
