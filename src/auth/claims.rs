// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Entra ID token claims.

use serde::Deserialize;

use super::AuthError;

/// Claims read from a Microsoft Entra ID (v2.0) ID token.
///
/// Which of `email`, `preferred_username` and `upn` are present depends on
/// the tenant's optional-claims configuration and account type.
/// See: https://learn.microsoft.com/entra/identity-platform/id-token-claims-reference
#[derive(Debug, Clone, Deserialize)]
pub struct EntraClaims {
    /// Subject (pairwise user identifier)
    pub sub: String,

    /// Object ID of the user in the tenant
    #[serde(default)]
    pub oid: Option<String>,

    /// Tenant ID
    #[serde(default)]
    pub tid: Option<String>,

    /// Issuer
    #[serde(default)]
    pub iss: String,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub preferred_username: Option<String>,

    /// User principal name (work accounts)
    #[serde(default)]
    pub upn: Option<String>,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Echo of the authorize request's `nonce`
    #[serde(default)]
    pub nonce: Option<String>,
}

impl EntraClaims {
    /// The email to check access for: `email`, else `preferred_username`,
    /// else `upn`. Blank values are skipped.
    pub fn verified_email(&self) -> Result<String, AuthError> {
        [&self.email, &self.preferred_username, &self.upn]
            .into_iter()
            .flatten()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or(AuthError::MissingEmail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(json: &str) -> EntraClaims {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn email_claim_preferred() {
        let c = claims(
            r#"{"sub":"s","email":"jane@corp.com","preferred_username":"jane.d@corp.com"}"#,
        );
        assert_eq!(c.verified_email().unwrap(), "jane@corp.com");
    }

    #[test]
    fn falls_back_to_preferred_username_then_upn() {
        let c = claims(r#"{"sub":"s","preferred_username":"jane.d@corp.com"}"#);
        assert_eq!(c.verified_email().unwrap(), "jane.d@corp.com");

        let c = claims(r#"{"sub":"s","email":"  ","upn":"jdoe@corp.onmicrosoft.com"}"#);
        assert_eq!(c.verified_email().unwrap(), "jdoe@corp.onmicrosoft.com");
    }

    #[test]
    fn missing_email_is_an_error() {
        let c = claims(r#"{"sub":"s","name":"Jane"}"#);
        assert!(matches!(c.verified_email(), Err(AuthError::MissingEmail)));
    }
}
