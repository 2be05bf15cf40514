// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Static registry of the reporting portals.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::roles::{normalize_key, Role};

/// Entry page users are sent to when no portal applies.
pub const ENTRY_ROUTE: &str = "/";

/// The four dashboard applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Portal {
    FinanceOfficer,
    FinanceDirector,
    Md,
    SystemAdmin,
}

/// A registered portal and its routing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalEntry {
    pub portal: Portal,
    /// Canonical URL slug
    pub slug: &'static str,
    /// Additional slugs accepted for this portal
    pub aliases: &'static [&'static str],
    pub title: &'static str,
    pub dashboard_route: &'static str,
    pub login_route: &'static str,
    /// Roles permitted to enter. `SYSTEM_ADMIN` is implicitly permitted
    /// everywhere and is only listed on its own portal.
    pub permitted_roles: &'static [Role],
}

static REGISTRY: [PortalEntry; 4] = [
    PortalEntry {
        portal: Portal::FinanceOfficer,
        slug: "finance-officer",
        aliases: &[],
        title: "Finance Officer",
        dashboard_route: "/finance-officer/dashboard",
        login_route: "/finance-officer/login",
        permitted_roles: &[Role::FinanceOfficer],
    },
    PortalEntry {
        portal: Portal::FinanceDirector,
        slug: "finance-director",
        aliases: &[],
        title: "Finance Director",
        dashboard_route: "/finance-director/dashboard",
        login_route: "/finance-director/login",
        permitted_roles: &[Role::FinanceDirector],
    },
    PortalEntry {
        portal: Portal::Md,
        slug: "md",
        aliases: &["ceo"],
        title: "Managing Director",
        dashboard_route: "/md/dashboard",
        login_route: "/md/login",
        permitted_roles: &[Role::Md],
    },
    PortalEntry {
        portal: Portal::SystemAdmin,
        slug: "system-admin",
        aliases: &["administrator", "admin"],
        title: "System Administrator",
        dashboard_route: "/system-admin/dashboard",
        login_route: "/system-admin/login",
        permitted_roles: &[Role::SystemAdmin],
    },
];

/// All registered portals, in display order.
pub fn entries() -> &'static [PortalEntry] {
    &REGISTRY
}

/// Resolve a portal slug or alias, ignoring case and separators.
pub fn resolve(slug: Option<&str>) -> Option<Portal> {
    let key = normalize_key(slug?);
    if key.is_empty() {
        return None;
    }

    REGISTRY
        .iter()
        .find(|entry| {
            normalize_key(entry.slug) == key
                || entry.aliases.iter().any(|alias| normalize_key(alias) == key)
        })
        .map(|entry| entry.portal)
}

impl Portal {
    pub const ALL: [Portal; 4] = [
        Portal::FinanceOfficer,
        Portal::FinanceDirector,
        Portal::Md,
        Portal::SystemAdmin,
    ];

    pub fn entry(&self) -> &'static PortalEntry {
        match self {
            Portal::FinanceOfficer => &REGISTRY[0],
            Portal::FinanceDirector => &REGISTRY[1],
            Portal::Md => &REGISTRY[2],
            Portal::SystemAdmin => &REGISTRY[3],
        }
    }

    pub fn slug(&self) -> &'static str {
        self.entry().slug
    }

    pub fn dashboard_route(&self) -> &'static str {
        self.entry().dashboard_route
    }

    pub fn login_route(&self) -> &'static str {
        self.entry().login_route
    }

    pub fn permitted_roles(&self) -> &'static [Role] {
        self.entry().permitted_roles
    }
}

impl std::fmt::Display for Portal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl Role {
    /// The portal whose dashboard is this role's home.
    pub fn home_portal(&self) -> Portal {
        match self {
            Role::FinanceOfficer => Portal::FinanceOfficer,
            Role::FinanceDirector => Portal::FinanceDirector,
            Role::Md => Portal::Md,
            Role::SystemAdmin => Portal::SystemAdmin,
        }
    }
}
