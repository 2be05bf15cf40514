// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Liveness and readiness endpoints.
//!
//! `/health` and `/health/ready` answer the same component report: session
//! storage always, the Entra ID signing keys only when signatures are checked.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::state::AppState;

const OK: &str = "ok";
const UNAVAILABLE: &str = "unavailable";

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// "ok" when every component is usable, "degraded" otherwise
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// e.g. "ok (file)" or "unavailable (file)"
    pub sessions: String,
    /// Client session stores currently held by the process
    pub open_sessions: usize,
    /// Absent when ID token signatures are not verified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn sessions_usable(state: &AppState) -> bool {
    match state.sessions.health_check() {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, backend = state.sessions.kind(), "Session storage unusable");
            false
        }
    }
}

/// `None` when there is no JWKS to check.
async fn signing_keys_usable(state: &AppState) -> Option<bool> {
    let jwks = state.verifier.jwks()?;
    if jwks.is_cached().await {
        return Some(true);
    }
    match jwks.refresh().await {
        Ok(_) => Some(true),
        Err(e) => {
            warn!(error = %e, "Signing keys unavailable");
            Some(false)
        }
    }
}

fn label(usable: bool) -> &'static str {
    if usable {
        OK
    } else {
        UNAVAILABLE
    }
}

async fn check_all(state: &AppState) -> (StatusCode, Json<ReadyResponse>) {
    let sessions = sessions_usable(state);
    let keys = signing_keys_usable(state).await;
    let ready = sessions && keys.unwrap_or(true);

    let report = ReadyResponse {
        status: if ready { OK } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: OK.to_string(),
            sessions: format!("{} ({})", label(sessions), state.sessions.kind()),
            open_sessions: state.sessions.open_stores(),
            jwks: keys.map(|usable| label(usable).to_string()),
        },
    };
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "All components usable", body = ReadyResponse),
        (status = 503, description = "A component is unusable", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    check_all(&state).await
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to serve sign-ins", body = ReadyResponse),
        (status = 503, description = "Not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    check_all(&state).await
}

/// Answers 200 while the process runs.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is running", body = HealthResponse))
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: OK.to_string(),
    })
}
