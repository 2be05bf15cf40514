// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Roles and Microsoft Entra ID token verification for the portal gateway.
//!
//! ## Auth Flow
//!
//! 1. `/v1/login/{portal}` redirects the browser to Entra ID
//! 2. Entra ID posts `id_token` + `access_token` back to `/v1/auth/callback`
//! 3. The gateway:
//!    - Fetches Entra JWKS via HTTPS
//!    - Verifies the ID token signature, expiry, issuer, audience
//!    - Extracts the verified email and runs the access handshake
//!
//! ## Security
//!
//! - Tokens failing verification count as "no identity"
//! - JWKS is cached with TTL and refetched on unknown `kid`
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod jwks;
pub mod roles;
pub mod verifier;

pub use claims::EntraClaims;
pub use error::AuthError;
pub use jwks::JwksManager;
pub use roles::{normalize_role, Role};
pub use verifier::IdTokenVerifier;
