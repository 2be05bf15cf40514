// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Third-party identity sessions.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::auth::IdTokenVerifier;

/// Identity asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
    /// Provider access token, exchanged for a backend token
    pub access_token: Option<String>,
}

/// State of the third-party session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Not resolved yet
    Loading,
    /// No identity was asserted
    Unauthenticated,
    Authenticated(VerifiedIdentity),
}

/// Source of the third-party session for one handshake.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn session(&self) -> SessionStatus;
}

/// Fields Entra ID posts to the redirect URI with `response_mode=form_post`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CallbackForm {
    pub id_token: Option<String>,
    pub access_token: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Identity resolved from a form-post callback.
pub struct FormPostIdentity<'a> {
    form: CallbackForm,
    expected: LoginChallenge,
    verifier: &'a IdTokenVerifier,
}

/// Values saved before the login redirect that the callback must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginChallenge {
    /// OAuth `state`, echoed in the form post
    pub state: Option<String>,
    /// OIDC `nonce`, echoed inside the ID token
    pub nonce: Option<String>,
}

impl<'a> FormPostIdentity<'a> {
    pub fn new(form: CallbackForm, expected: LoginChallenge, verifier: &'a IdTokenVerifier) -> Self {
        Self {
            form,
            expected,
            verifier,
        }
    }
}

#[async_trait]
impl IdentitySource for FormPostIdentity<'_> {
    async fn session(&self) -> SessionStatus {
        if let Some(error) = &self.form.error {
            warn!(
                error = %error,
                description = self.form.error_description.as_deref().unwrap_or(""),
                "Identity provider returned an error"
            );
            return SessionStatus::Unauthenticated;
        }

        match (&self.expected.state, &self.form.state) {
            (Some(expected), Some(actual)) if expected == actual => {}
            _ => {
                warn!("Callback state missing or does not match login request");
                return SessionStatus::Unauthenticated;
            }
        }

        let Some(id_token) = self.form.id_token.as_deref() else {
            warn!("Callback carried no ID token");
            return SessionStatus::Unauthenticated;
        };

        let claims = match self.verifier.verify(id_token).await {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, error_code = e.error_code(), "ID token rejected");
                return SessionStatus::Unauthenticated;
            }
        };

        match (&self.expected.nonce, &claims.nonce) {
            (Some(expected), Some(actual)) if expected == actual => {}
            _ => {
                warn!("ID token nonce missing or does not match login request");
                return SessionStatus::Unauthenticated;
            }
        }

        let email = claims.verified_email();

        match email {
            Ok(email) => SessionStatus::Authenticated(VerifiedIdentity {
                email,
                access_token: self.form.access_token.clone().filter(|t| !t.is_empty()),
            }),
            Err(e) => {
                warn!(error = %e, error_code = e.error_code(), "ID token rejected");
                SessionStatus::Unauthenticated
            }
        }
    }
}
