// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ID token verification.
//!
//! ## Verification Modes
//!
//! - **Production mode** (JWKS configured): signature, expiry, issuer and
//!   audience checked against Entra ID signing keys
//! - **Development mode** (no JWKS, `dev` feature or tests): structure and
//!   expiry only, no signature check

use jsonwebtoken::{decode, decode_header, Validation};

use super::claims::EntraClaims;
use super::{AuthError, JwksManager};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Verifies ID tokens posted back by the identity provider.
#[derive(Clone)]
pub struct IdTokenVerifier {
    jwks: Option<JwksManager>,
    issuer: Option<String>,
    audience: Option<String>,
}

impl IdTokenVerifier {
    pub fn new(jwks: Option<JwksManager>) -> Self {
        Self {
            jwks,
            issuer: None,
            audience: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn jwks(&self) -> Option<&JwksManager> {
        self.jwks.as_ref()
    }

    /// Verify `token` and return its claims.
    pub async fn verify(&self, token: &str) -> Result<EntraClaims, AuthError> {
        match &self.jwks {
            Some(jwks) => self.verify_production(token, jwks).await,
            None => verify_development(token),
        }
    }

    async fn verify_production(
        &self,
        token: &str,
        jwks: &JwksManager,
    ) -> Result<EntraClaims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

        let (decoding_key, algorithm) = match &header.kid {
            Some(kid) => jwks.get_decoding_key(kid).await?,
            None => jwks.get_any_decoding_key().await?,
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;

        if let Some(ref issuer) = self.issuer {
            validation.set_issuer(&[issuer]);
        }

        match self.audience {
            Some(ref audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let token_data = decode::<EntraClaims>(token, &decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(any(test, feature = "dev"))]
fn verify_development(token: &str) -> Result<EntraClaims, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<EntraClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;
    let claims = token_data.claims;

    let now = chrono::Utc::now().timestamp();
    if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    Ok(claims)
}

#[cfg(not(any(test, feature = "dev")))]
fn verify_development(_token: &str) -> Result<EntraClaims, AuthError> {
    Err(AuthError::NotConfigured)
}

/// Unsigned test token builder.
#[cfg(test)]
pub(crate) fn unsigned_token(claims: &serde_json::Value) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let header = r#"{"alg":"RS256","typ":"JWT"}"#;
    format!(
        "{}.{}.fake_signature",
        URL_SAFE_NO_PAD.encode(header.as_bytes()),
        URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes())
    )
}
