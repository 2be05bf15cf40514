// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portal access decisions and dashboard route resolution.

use serde::Serialize;
use utoipa::ToSchema;

use super::registry::{self, Portal};
use crate::auth::roles::{normalize_role, Role};

/// Whether a canonical role may enter a registered portal.
pub fn role_can_enter(role: Role, portal: Portal) -> bool {
    role.is_admin() || portal.permitted_roles().contains(&role)
}

/// Whether a raw role string may enter the portal named by a raw slug.
///
/// Both arguments go through normalization first. Absent, empty or
/// unrecognized input is denied.
pub fn can_access_portal(role: Option<&str>, portal: Option<&str>) -> bool {
    match (normalize_role(role), registry::resolve(portal)) {
        (Some(role), Some(portal)) => role_can_enter(role, portal),
        _ => false,
    }
}

/// Dashboard path for a canonical role.
pub fn dashboard_route(role: Role) -> &'static str {
    role.home_portal().dashboard_route()
}

/// Dashboard path for a raw role string, `None` if it does not normalize.
pub fn dashboard_route_for_role(role: Option<&str>) -> Option<&'static str> {
    normalize_role(role).map(dashboard_route)
}

/// Dashboard path for a raw portal slug, `None` if it is not registered.
pub fn dashboard_route_for_portal(portal: Option<&str>) -> Option<&'static str> {
    registry::resolve(portal).map(|p| p.dashboard_route())
}

/// Result of evaluating a role against a portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AccessDecision {
    /// Canonical role, if the input normalized
    pub role: Option<Role>,
    /// Registered portal, if the slug resolved
    pub portal: Option<Portal>,
    pub allowed: bool,
    /// Dashboard of the resolved portal
    pub dashboard_route: Option<String>,
}

pub fn decide(role: Option<&str>, portal: Option<&str>) -> AccessDecision {
    let role = normalize_role(role);
    let portal = registry::resolve(portal);
    let allowed = matches!((role, portal), (Some(r), Some(p)) if role_can_enter(r, p));

    AccessDecision {
        role,
        portal,
        allowed,
        dashboard_route: portal.map(|p| p.dashboard_route().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn slug_variants(slug: &str) -> Vec<String> {
        vec![
            slug.to_string(),
            slug.to_uppercase(),
            slug.replace('-', "_"),
            slug.replace('-', " ").to_uppercase(),
        ]
    }

    #[test]
    fn every_role_has_a_unique_dashboard() {
        let routes: HashSet<&str> = Role::ALL.iter().map(|r| dashboard_route(*r)).collect();
        assert_eq!(routes.len(), Role::ALL.len());
    }

    #[test]
    fn raw_role_dashboard_resolution() {
        assert_eq!(
            dashboard_route_for_role(Some("Data_Officer")),
            Some("/finance-officer/dashboard")
        );
        assert_eq!(dashboard_route_for_role(Some("ceo")), Some("/md/dashboard"));
        assert_eq!(dashboard_route_for_role(Some("intern")), None);
        assert_eq!(dashboard_route_for_role(None), None);
    }

    #[test]
    fn portal_dashboard_matches_permitted_role_dashboards() {
        for entry in registry::entries() {
            let route = dashboard_route_for_portal(Some(entry.slug));
            assert_eq!(route, Some(entry.dashboard_route));
            for role in entry.permitted_roles {
                assert_eq!(route, Some(dashboard_route(*role)), "{}", entry.slug);
            }
        }
    }

    #[test]
    fn admin_enters_every_registered_portal() {
        for entry in registry::entries() {
            for slug in std::iter::once(&entry.slug).chain(entry.aliases) {
                for variant in slug_variants(slug) {
                    assert!(
                        can_access_portal(Some("SYSTEM_ADMIN"), Some(&variant)),
                        "admin denied on {variant}"
                    );
                }
            }
        }
    }

    #[test]
    fn admin_denied_on_unregistered_portals() {
        assert!(!can_access_portal(Some("SYSTEM_ADMIN"), Some("payroll")));
        assert!(!can_access_portal(Some("ADMIN"), None));
        assert!(!can_access_portal(Some("ADMIN"), Some("")));
    }

    #[test]
    fn unrecognized_roles_are_denied_everywhere() {
        for entry in registry::entries() {
            assert!(!can_access_portal(Some("intern"), Some(entry.slug)));
            assert!(!can_access_portal(Some(""), Some(entry.slug)));
            assert!(!can_access_portal(None, Some(entry.slug)));
        }
        assert!(!can_access_portal(None, None));
    }

    #[test]
    fn legacy_data_officer_scenario() {
        assert!(can_access_portal(Some("Data_Officer"), Some("finance-officer")));
        assert!(!can_access_portal(Some("Data_Officer"), Some("md")));
    }

    #[test]
    fn non_admin_roles_only_enter_their_own_portal() {
        for role in Role::ALL.into_iter().filter(|r| !r.is_admin()) {
            for portal in Portal::ALL {
                assert_eq!(role_can_enter(role, portal), portal == role.home_portal());
            }
        }
    }

    #[test]
    fn uppercase_md_resolves_like_lowercase() {
        assert_eq!(
            dashboard_route_for_portal(Some("MD")),
            dashboard_route_for_portal(Some("md"))
        );
        assert_eq!(
            can_access_portal(Some("MD"), Some("MD")),
            can_access_portal(Some("MD"), Some("md"))
        );
        assert_eq!(decide(Some("CEO"), Some("MD")), decide(Some("CEO"), Some("md")));
    }

    #[test]
    fn decide_reports_normalized_inputs() {
        let decision = decide(Some("company director"), Some("Finance-Director"));
        assert_eq!(decision.role, Some(Role::FinanceDirector));
        assert_eq!(decision.portal, Some(Portal::FinanceDirector));
        assert!(decision.allowed);
        assert_eq!(
            decision.dashboard_route.as_deref(),
            Some("/finance-director/dashboard")
        );

        let denied = decide(Some("nobody"), Some("nowhere"));
        assert_eq!(denied.role, None);
        assert_eq!(denied.portal, None);
        assert!(!denied.allowed);
        assert_eq!(denied.dashboard_route, None);
    }
}
