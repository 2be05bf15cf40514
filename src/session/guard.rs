// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dashboard guard.
//!
//! Every protected portal runs the same check on each visit: read the stored
//! session, re-normalize its role and confirm it may enter this portal.
//! Stale or invalid state never errors; it turns into a redirect to the
//! portal's login page.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::profile::StoredSession;
use super::store::SessionStore;
use crate::auth::roles::Role;
use crate::portal::access::role_can_enter;
use crate::portal::registry::{self, ENTRY_ROUTE};

/// Outcome of guarding a portal visit.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Render the dashboard.
    Allow {
        role: Role,
        #[schema(value_type = Object)]
        user: Value,
        dashboard_route: String,
    },
    /// Leave for `location` instead.
    Redirect { location: String },
}

impl GuardDecision {
    fn redirect(location: &str) -> Self {
        GuardDecision::Redirect {
            location: location.to_string(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow { .. })
    }
}

/// Decide whether the session in `store` may view `portal`.
pub fn guard(store: &dyn SessionStore, portal: Option<&str>) -> GuardDecision {
    let Some(portal) = registry::resolve(portal) else {
        return GuardDecision::redirect(ENTRY_ROUTE);
    };

    let session = match StoredSession::load(store) {
        Ok(Some(session)) => session,
        Ok(None) => return GuardDecision::redirect(portal.login_route()),
        Err(e) => {
            warn!(error = %e, portal = %portal, "Stored session unreadable");
            return GuardDecision::redirect(portal.login_route());
        }
    };

    match session.role() {
        Some(role) if role_can_enter(role, portal) => GuardDecision::Allow {
            role,
            user: session.user,
            dashboard_route: portal.dashboard_route().to_string(),
        },
        role => {
            debug!(
                role = ?role,
                raw_role = session.raw_role(),
                portal = %portal,
                "Stored role may not enter portal"
            );
            GuardDecision::redirect(portal.login_route())
        }
    }
}
