// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keys used in a client's session store.

/// Backend-issued bearer token.
pub const ACCESS_TOKEN: &str = "portal.access_token";

/// User profile JSON returned alongside the bearer token.
pub const USER: &str = "portal.user";

/// Portal slug saved before redirecting to the identity provider.
/// Consumed by the callback at most once.
pub const PENDING_PORTAL: &str = "portal.pending_portal";

/// OAuth `state` saved before redirecting to the identity provider.
pub const LOGIN_STATE: &str = "portal.login_state";

/// OIDC `nonce` sent with the authorize request. The ID token must echo it.
pub const LOGIN_NONCE: &str = "portal.login_nonce";
