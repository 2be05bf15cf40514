// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{IdTokenVerifier, JwksManager};
use crate::config::GatewayConfig;
use crate::handshake::{AuthBackend, HttpAuthBackend};
use crate::session::SessionBackend;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("authentication setup failed: {0}")]
    Auth(#[from] crate::auth::AuthError),

    #[error("backend client setup failed: {0}")]
    Backend(#[from] crate::handshake::BackendError),

    #[error("session storage setup failed: {0}")]
    Storage(#[from] crate::session::StorageError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub backend: Arc<dyn AuthBackend>,
    pub verifier: Arc<IdTokenVerifier>,
    pub sessions: SessionBackend,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        backend: Arc<dyn AuthBackend>,
        verifier: IdTokenVerifier,
        sessions: SessionBackend,
    ) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            verifier: Arc::new(verifier),
            sessions,
        }
    }

    /// Wire up the HTTP backend client, ID token verifier and session
    /// storage described by `config`.
    pub fn from_config(config: GatewayConfig) -> Result<Self, StateError> {
        let backend = HttpAuthBackend::new(config.backend_url.clone(), config.backend_timeout)?;

        let identity = &config.identity;
        let jwks = identity.jwks_url.as_deref().map(JwksManager::new).transpose()?;
        let mut verifier = IdTokenVerifier::new(jwks).with_audience(identity.client_id.clone());
        if let Some(issuer) = &identity.issuer {
            verifier = verifier.with_issuer(issuer.clone());
        }

        let sessions = match &config.session_dir {
            Some(dir) => SessionBackend::file(dir)?,
            None => SessionBackend::memory(),
        };

        Ok(Self::new(config, Arc::new(backend), verifier, sessions))
    }
}
