// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # External Identity Handshake
//!
//! Turns an identity provider callback into a backend session:
//!
//! 1. wait for the third-party session (`identity`)
//! 2. check the email may use the portal (`backend`)
//! 3. exchange the provider token for a backend bearer token
//! 4. persist it and redirect to the portal's dashboard
//!
//! The two backend calls are strictly sequential and never retried.

pub mod backend;
pub mod identity;
pub mod machine;

pub use backend::{AuthBackend, BackendError, HttpAuthBackend, IssuedSession};
pub use identity::{
    CallbackForm, FormPostIdentity, IdentitySource, LoginChallenge, SessionStatus, VerifiedIdentity,
};
pub use machine::{messages, Handshake, HandshakeState};
