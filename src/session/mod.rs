// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Session Storage
//!
//! Each browser client owns a small key-value store holding what the
//! dashboards need across page loads:
//!
//! - backend bearer token and user profile (after sign-in)
//! - pending portal slug and OAuth `state` (between login redirect and callback)
//!
//! The handshake and the dashboard guard only see the `SessionStore` trait,
//! so tests run against `MemorySessionStore`.

pub mod file;
pub mod guard;
pub mod keys;
pub mod profile;
pub mod registry;
pub mod store;

pub use file::{FileSessionStore, SessionPaths};
pub use guard::{guard, GuardDecision};
pub use profile::StoredSession;
pub use registry::{ClientId, SessionBackend};
pub use store::{MemorySessionStore, SessionStore, StorageError, StorageResult};
