// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Portal Routing
//!
//! Four dashboards share one sign-in flow. This module decides which of them
//! a role may enter and where each one lives.
//!
//! - `registry` - static slug → route/role table
//! - `access` - `can_access_portal` and dashboard route lookups

pub mod access;
pub mod registry;

pub use access::{can_access_portal, dashboard_route, dashboard_route_for_portal, AccessDecision};
pub use registry::{Portal, PortalEntry, ENTRY_ROUTE};
