// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{normalize_role, Role},
    error::ApiError,
    portal::{access, dashboard_route, registry, AccessDecision, Portal},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct PortalSummary {
    pub portal: Portal,
    pub slug: String,
    pub aliases: Vec<String>,
    pub title: String,
    pub dashboard_route: String,
    pub login_route: String,
    pub permitted_roles: Vec<Role>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleDashboard {
    pub role: Role,
    pub dashboard_route: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AccessQuery {
    /// Raw role string, any casing or legacy alias
    pub role: Option<String>,
    /// Raw portal slug
    pub portal: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/portals",
    tag = "Portals",
    responses((status = 200, body = [PortalSummary]))
)]
pub async fn list_portals() -> Json<Vec<PortalSummary>> {
    let portals = registry::entries()
        .iter()
        .map(|entry| PortalSummary {
            portal: entry.portal,
            slug: entry.slug.to_string(),
            aliases: entry.aliases.iter().map(|a| a.to_string()).collect(),
            title: entry.title.to_string(),
            dashboard_route: entry.dashboard_route.to_string(),
            login_route: entry.login_route.to_string(),
            permitted_roles: entry.permitted_roles.to_vec(),
        })
        .collect();
    Json(portals)
}

#[utoipa::path(
    get,
    path = "/v1/access",
    params(AccessQuery),
    tag = "Portals",
    responses((status = 200, body = AccessDecision))
)]
pub async fn check_access(Query(query): Query<AccessQuery>) -> Json<AccessDecision> {
    Json(access::decide(query.role.as_deref(), query.portal.as_deref()))
}

#[utoipa::path(
    get,
    path = "/v1/roles/{role}/dashboard",
    params(("role" = String, Path, description = "Raw role string")),
    tag = "Portals",
    responses(
        (status = 200, body = RoleDashboard),
        (status = 404, body = crate::error::ErrorBody)
    )
)]
pub async fn role_dashboard(Path(role): Path<String>) -> Result<Json<RoleDashboard>, ApiError> {
    let canonical = normalize_role(Some(role.as_str()))
        .ok_or_else(|| ApiError::not_found(format!("Unknown role: {role}")))?;

    Ok(Json(RoleDashboard {
        role: canonical,
        dashboard_route: dashboard_route(canonical).to_string(),
    }))
}
