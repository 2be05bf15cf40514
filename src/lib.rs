// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portal Gateway - Role Routing & Entra ID Sign-in
//!
//! Backend-for-frontend for the four financial reporting portals. It decides
//! which dashboard a role may enter, completes the Microsoft Entra ID
//! callback handshake against the reporting backend and guards every
//! dashboard visit against the stored session.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Role normalization and Entra ID token verification
//! - `handshake` - Sign-in state machine and backend client
//! - `portal` - Portal registry and access decisions
//! - `session` - Per-client session stores and the dashboard guard

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod handshake;
pub mod logging;
pub mod portal;
pub mod session;
pub mod state;
