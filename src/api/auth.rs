// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in endpoints.
//!
//! `login` is the pre-redirect step: it remembers which portal the user came
//! from and sends the browser to Entra ID. Entra ID posts the tokens back to
//! `callback`, which runs the handshake against this client's session store.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;
use tracing::{debug, info};
use utoipa::IntoParams;
use uuid::Uuid;

use super::client::{self, ClientCookie};
use crate::{
    error::ApiError,
    handshake::{CallbackForm, FormPostIdentity, Handshake, HandshakeState, LoginChallenge},
    portal::{registry, ENTRY_ROUTE},
    session::{guard, keys, ClientId, GuardDecision, MemorySessionStore, SessionStore},
    state::AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    /// Portal slug the user is signing in to
    pub portal: Option<String>,
}

/// The client's store, or an empty throwaway one when the browser has no
/// client cookie.
fn client_store(state: &AppState, client: Option<ClientId>) -> Arc<dyn SessionStore> {
    match client {
        Some(id) => state.sessions.open(&id),
        None => Arc::new(MemorySessionStore::new()),
    }
}

#[utoipa::path(
    get,
    path = "/v1/login/{portal}",
    params(("portal" = String, Path, description = "Portal slug or alias")),
    tag = "Auth",
    responses(
        (status = 303, description = "Redirect to the Entra ID authorize endpoint"),
        (status = 404, body = crate::error::ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ClientCookie(client): ClientCookie,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let portal = registry::resolve(Some(slug.as_str()))
        .ok_or_else(|| ApiError::not_found(format!("Unknown portal: {slug}")))?;

    let client_id = client.unwrap_or_else(ClientId::generate);
    let store = state.sessions.open(&client_id);

    let login_state = Uuid::new_v4().to_string();
    let nonce = Uuid::new_v4().to_string();
    store.set(keys::PENDING_PORTAL, portal.slug())?;
    store.set(keys::LOGIN_STATE, &login_state)?;
    store.set(keys::LOGIN_NONCE, &nonce)?;

    let authorize_url = state
        .config
        .identity
        .authorize_url(&login_state, &nonce)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    debug!(portal = %portal, client_id = %client_id, "Redirecting to identity provider");

    let mut response = Redirect::to(authorize_url.as_str()).into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        client::set_cookie(&client_id, state.config.cookie_secure),
    );
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/v1/auth/callback",
    params(CallbackQuery),
    request_body(content = CallbackForm, content_type = "application/x-www-form-urlencoded"),
    tag = "Auth",
    responses(
        (status = 303, description = "Signed in, or returned to the entry page"),
        (status = 202, description = "Identity session still loading"),
        (status = 403, description = "Sign-in refused", body = crate::error::ErrorBody)
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    ClientCookie(client): ClientCookie,
    Query(query): Query<CallbackQuery>,
    Form(form): Form<CallbackForm>,
) -> Result<Response, ApiError> {
    if client.is_none() {
        debug!("Callback without client cookie");
    }
    let store = client_store(&state, client);
    let expected = LoginChallenge {
        state: store.take(keys::LOGIN_STATE)?,
        nonce: store.take(keys::LOGIN_NONCE)?,
    };

    let identity = FormPostIdentity::new(form, expected, &state.verifier);
    let outcome = Handshake::new(&identity, state.backend.as_ref(), store.as_ref(), query.portal)
        .run()
        .await;
    debug!(client_id = ?client, outcome = ?outcome, "Handshake finished");

    let frontend = &state.config.frontend_url;
    let response = match outcome {
        HandshakeState::Authenticated { location } => {
            Redirect::to(&format!("{frontend}{location}")).into_response()
        }
        HandshakeState::ReturnedToEntry => {
            Redirect::to(&format!("{frontend}{ENTRY_ROUTE}")).into_response()
        }
        HandshakeState::AccessDenied { message } => ApiError::forbidden(message).into_response(),
        _ => StatusCode::ACCEPTED.into_response(),
    };
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/v1/session/{portal}",
    params(("portal" = String, Path, description = "Portal slug or alias")),
    tag = "Auth",
    responses((status = 200, body = GuardDecision))
)]
pub async fn session(
    State(state): State<AppState>,
    ClientCookie(client): ClientCookie,
    Path(portal): Path<String>,
) -> Json<GuardDecision> {
    let store = client_store(&state, client);
    Json(guard(store.as_ref(), Some(portal.as_str())))
}

#[utoipa::path(
    post,
    path = "/v1/logout",
    tag = "Auth",
    responses((status = 204, description = "Session cleared"))
)]
pub async fn logout(
    State(state): State<AppState>,
    ClientCookie(client): ClientCookie,
) -> Result<Response, ApiError> {
    if let Some(id) = client {
        state.sessions.clear(&id)?;
        info!(client_id = %id, "Signed out");
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, client::expire_cookie(state.config.cookie_secure))],
    )
        .into_response())
}
