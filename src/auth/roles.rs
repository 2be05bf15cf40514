// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical portal roles and normalization of raw role strings.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Canonical user roles.
///
/// ## Legacy Names
///
/// Role strings reach the gateway from several naming eras of the backend.
/// Each canonical role accepts its own name plus exactly one legacy alias:
///
/// | Canonical | Legacy alias |
/// |-----------|--------------|
/// | `FINANCE_OFFICER` | `DATA_OFFICER` |
/// | `FINANCE_DIRECTOR` | `COMPANY_DIRECTOR` |
/// | `MD` | `CEO` |
/// | `SYSTEM_ADMIN` | `ADMIN` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Budget / data-entry officer
    FinanceOfficer,
    /// Finance director (reviews and approves submissions)
    FinanceDirector,
    /// Managing director (group-level aggregates)
    Md,
    /// System administrator, permitted on every portal
    SystemAdmin,
}

/// Error returned by [`Role::from_str`] for unrecognized role strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0:?}")]
pub struct UnknownRole(pub String);

impl Role {
    /// Every canonical role.
    pub const ALL: [Role; 4] = [
        Role::FinanceOfficer,
        Role::FinanceDirector,
        Role::Md,
        Role::SystemAdmin,
    ];

    /// Canonical upper snake case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::FinanceOfficer => "FINANCE_OFFICER",
            Role::FinanceDirector => "FINANCE_DIRECTOR",
            Role::Md => "MD",
            Role::SystemAdmin => "SYSTEM_ADMIN",
        }
    }

    /// The one legacy name this role still answers to.
    pub fn legacy_alias(&self) -> &'static str {
        match self {
            Role::FinanceOfficer => "DATA_OFFICER",
            Role::FinanceDirector => "COMPANY_DIRECTOR",
            Role::Md => "CEO",
            Role::SystemAdmin => "ADMIN",
        }
    }

    /// Whether this role bypasses per-portal permission sets.
    pub fn is_admin(&self) -> bool {
        *self == Role::SystemAdmin
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_key(s);
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == key || role.legacy_alias() == key)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a possibly-absent role string onto a canonical role.
///
/// Returns `None` for absent, empty or unrecognized input. Never panics.
pub fn normalize_role(raw: Option<&str>) -> Option<Role> {
    raw.and_then(|s| s.parse().ok())
}

/// Uppercase `raw` and collapse runs of whitespace, hyphens and underscores
/// into a single underscore, dropping leading and trailing separators.
///
/// Shared by role and portal slug matching so both are case and
/// separator insensitive in the same way.
pub fn normalize_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for c in raw.chars() {
        if c.is_whitespace() || c == '-' || c == '_' {
            pending_separator = !key.is_empty();
            continue;
        }
        if pending_separator {
            key.push('_');
            pending_separator = false;
        }
        key.extend(c.to_uppercase());
    }

    key
}
