// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PORTAL_BACKEND_URL` | Base URL of the reporting backend API | Required |
//! | `PORTAL_FRONTEND_URL` | Origin the dashboards are served from | empty (same origin) |
//! | `BACKEND_TIMEOUT_SECS` | Timeout for each backend call | `15` |
//! | `SESSION_DIR` | Directory for file-backed client sessions | unset (in memory) |
//! | `COOKIE_SECURE` | Mark the client cookie `Secure; SameSite=None` | `true` |
//! | `ENTRA_TENANT_ID` | Entra ID tenant | Required unless `ENTRA_JWKS_URL` set |
//! | `ENTRA_CLIENT_ID` | Application (client) ID, also the token audience | Required |
//! | `ENTRA_REDIRECT_URI` | Callback URL registered in Entra ID | Required |
//! | `ENTRA_JWKS_URL` | Signing keys endpoint | derived from tenant |
//! | `ENTRA_ISSUER` | Expected ID token issuer | derived from tenant |
//! | `ENTRA_INSECURE_SKIP_VERIFY` | Skip ID token signature checks (`dev` builds only) | `false` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const BACKEND_URL_ENV: &str = "PORTAL_BACKEND_URL";
pub const FRONTEND_URL_ENV: &str = "PORTAL_FRONTEND_URL";
pub const BACKEND_TIMEOUT_ENV: &str = "BACKEND_TIMEOUT_SECS";
pub const SESSION_DIR_ENV: &str = "SESSION_DIR";
pub const COOKIE_SECURE_ENV: &str = "COOKIE_SECURE";
pub const ENTRA_TENANT_ID_ENV: &str = "ENTRA_TENANT_ID";
pub const ENTRA_CLIENT_ID_ENV: &str = "ENTRA_CLIENT_ID";
pub const ENTRA_REDIRECT_URI_ENV: &str = "ENTRA_REDIRECT_URI";
pub const ENTRA_JWKS_URL_ENV: &str = "ENTRA_JWKS_URL";
pub const ENTRA_ISSUER_ENV: &str = "ENTRA_ISSUER";
pub const ENTRA_INSECURE_ENV: &str = "ENTRA_INSECURE_SKIP_VERIFY";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(15);
const ENTRA_AUTHORITY: &str = "https://login.microsoftonline.com";
const DEFAULT_SCOPES: &str = "openid profile email User.Read";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Entra ID application settings.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub tenant_id: Option<String>,
    pub client_id: String,
    pub redirect_uri: Url,
    /// `None` means development mode (no signature verification)
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub scopes: String,
}

impl IdentityConfig {
    /// Build the Entra authorize URL for a login attempt.
    pub fn authorize_url(&self, state: &str, nonce: &str) -> Result<Url, ConfigError> {
        let tenant = self.tenant_id.as_deref().unwrap_or("common");
        let mut url = Url::parse(&format!("{ENTRA_AUTHORITY}/{tenant}/oauth2/v2.0/authorize"))
            .map_err(|e| ConfigError::Invalid {
                name: ENTRA_TENANT_ID_ENV,
                reason: e.to_string(),
            })?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "id_token token")
            .append_pair("response_mode", "form_post")
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("scope", &self.scopes)
            .append_pair("state", state)
            .append_pair("nonce", nonce);

        Ok(url)
    }
}

#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub backend_url: Url,
    /// Prefix for dashboard redirects, without trailing slash
    pub frontend_url: String,
    pub backend_timeout: Duration,
    pub session_dir: Option<PathBuf>,
    pub cookie_secure: bool,
    pub identity: IdentityConfig,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                reason: format!("{raw:?} is not a port number"),
            })?,
            None => DEFAULT_PORT,
        };

        let backend_url = parse_url(BACKEND_URL_ENV, &require(BACKEND_URL_ENV)?)?;

        let backend_timeout = match get(BACKEND_TIMEOUT_ENV) {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|_| ConfigError::Invalid {
                name: BACKEND_TIMEOUT_ENV,
                reason: format!("{raw:?} is not a number of seconds"),
            })?),
            None => DEFAULT_BACKEND_TIMEOUT,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::to_ascii_lowercase) {
            Some(f) if f == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            backend_url,
            frontend_url: get(FRONTEND_URL_ENV)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            backend_timeout,
            session_dir: get(SESSION_DIR_ENV).map(PathBuf::from),
            cookie_secure: parse_bool(COOKIE_SECURE_ENV, get(COOKIE_SECURE_ENV), true)?,
            identity: identity_config(&get, &require)?,
            tls,
            log_format,
        })
    }
}

fn identity_config(
    get: &impl Fn(&str) -> Option<String>,
    require: &impl Fn(&'static str) -> Result<String, ConfigError>,
) -> Result<IdentityConfig, ConfigError> {
    let tenant_id = get(ENTRA_TENANT_ID_ENV);
    let client_id = require(ENTRA_CLIENT_ID_ENV)?;
    let redirect_uri = parse_url(ENTRA_REDIRECT_URI_ENV, &require(ENTRA_REDIRECT_URI_ENV)?)?;
    let insecure = parse_bool(ENTRA_INSECURE_ENV, get(ENTRA_INSECURE_ENV), false)?;

    let jwks_url = match (get(ENTRA_JWKS_URL_ENV), &tenant_id) {
        _ if insecure => {
            if !cfg!(feature = "dev") {
                return Err(ConfigError::Invalid {
                    name: ENTRA_INSECURE_ENV,
                    reason: "only available in dev builds".to_string(),
                });
            }
            None
        }
        (Some(url), _) => Some(url),
        (None, Some(tenant)) => Some(format!("{ENTRA_AUTHORITY}/{tenant}/discovery/v2.0/keys")),
        (None, None) => return Err(ConfigError::Missing(ENTRA_TENANT_ID_ENV)),
    };

    let issuer = get(ENTRA_ISSUER_ENV).or_else(|| {
        tenant_id
            .as_ref()
            .map(|tenant| format!("{ENTRA_AUTHORITY}/{tenant}/v2.0"))
    });

    Ok(IdentityConfig {
        tenant_id,
        client_id,
        redirect_uri,
        jwks_url,
        issuer,
        scopes: DEFAULT_SCOPES.to_string(),
    })
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn parse_bool(name: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            name,
            reason: format!("{other:?} is not a boolean"),
        }),
    }
}
