// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Backend auth endpoints used by the handshake.
//!
//! | Endpoint | Body | Response |
//! |----------|------|----------|
//! | `POST /auth/check-access` | `{ email, portal }` | `{ has_access }` |
//! | `POST /auth/microsoft-login` | `{ access_token, portal }` | `{ access_token, user }` or `{ detail }` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

const CHECK_ACCESS_PATH: &str = "auth/check-access";
const MICROSOFT_LOGIN_PATH: &str = "auth/microsoft-login";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("backend returned HTTP {status}")]
    Status {
        status: u16,
        detail: Option<String>,
    },

    #[error("backend response was invalid: {0}")]
    InvalidResponse(String),

    #[error("backend issued no access token")]
    MissingToken { detail: Option<String> },
}

impl BackendError {
    /// Human-readable `detail` sent by the backend, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            BackendError::Status { detail, .. } | BackendError::MissingToken { detail } => {
                detail.as_deref()
            }
            _ => None,
        }
    }
}

/// Bearer token and user profile issued by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedSession {
    pub access_token: String,
    pub user: Value,
}

#[derive(Debug, Serialize)]
struct CheckAccessRequest<'a> {
    email: &'a str,
    portal: &'a str,
}

#[derive(Debug, Deserialize)]
struct CheckAccessResponse {
    has_access: bool,
}

#[derive(Debug, Serialize)]
struct MicrosoftLoginRequest<'a> {
    access_token: &'a str,
    portal: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct MicrosoftLoginResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<Value>,
    #[serde(default)]
    detail: Option<Value>,
}

/// The backend's authentication contract.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Whether `email` may use `portal`.
    async fn check_access(&self, email: &str, portal: &str) -> Result<bool, BackendError>;

    /// Exchange an identity provider access token for a backend session.
    async fn microsoft_login(
        &self,
        access_token: &str,
        portal: &str,
    ) -> Result<IssuedSession, BackendError>;
}

/// `AuthBackend` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    base_url: Url,
    http: Client,
}

impl HttpAuthBackend {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: with_trailing_slash(base_url),
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Transport(format!("invalid backend URL: {e}")))
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn check_access(&self, email: &str, portal: &str) -> Result<bool, BackendError> {
        let response = self
            .http
            .post(self.endpoint(CHECK_ACCESS_PATH)?)
            .json(&CheckAccessRequest { email, portal })
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = read_detail(response).await;
            return Err(BackendError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let body: CheckAccessResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        Ok(body.has_access)
    }

    async fn microsoft_login(
        &self,
        access_token: &str,
        portal: &str,
    ) -> Result<IssuedSession, BackendError> {
        let response = self
            .http
            .post(self.endpoint(MICROSOFT_LOGIN_PATH)?)
            .json(&MicrosoftLoginRequest {
                access_token,
                portal,
            })
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        // Error bodies are not always JSON; treat unparsable ones as empty.
        let body: MicrosoftLoginResponse = serde_json::from_slice(&bytes).unwrap_or_default();
        let detail = body.detail.as_ref().and_then(detail_text);

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        match body.access_token.filter(|t| !t.is_empty()) {
            Some(access_token) => Ok(IssuedSession {
                access_token,
                user: body.user.unwrap_or(Value::Object(Default::default())),
            }),
            None => Err(BackendError::MissingToken { detail }),
        }
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn read_detail(response: reqwest::Response) -> Option<String> {
    let body: Value = response.json().await.ok()?;
    body.get("detail").and_then(detail_text)
}

/// Extract a displayable message from a `detail` value. Validation errors
/// arrive as a list of `{ msg }` objects.
fn detail_text(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::post, Json, Router};
    use serde_json::json;

    async fn spawn_backend(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/api")).unwrap()
    }

    fn client(base: Url) -> HttpAuthBackend {
        HttpAuthBackend::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let backend = client(Url::parse("http://backend.local/api").unwrap());
        assert_eq!(
            backend.endpoint(CHECK_ACCESS_PATH).unwrap().as_str(),
            "http://backend.local/api/auth/check-access"
        );
    }

    #[test]
    fn detail_text_handles_strings_and_lists() {
        assert_eq!(detail_text(&json!("User inactive")), Some("User inactive".into()));
        assert_eq!(
            detail_text(&json!([{"msg": "field required"}, {"msg": "bad portal"}])),
            Some("field required; bad portal".into())
        );
        assert_eq!(detail_text(&json!("  ")), None);
        assert_eq!(detail_text(&json!({"x": 1})), None);
    }

    #[tokio::test]
    async fn check_access_posts_email_and_portal() {
        let app = Router::new().route(
            "/api/auth/check-access",
            post(|Json(body): Json<Value>| async move {
                let allowed = body["email"] == "jane@corp.com" && body["portal"] == "md";
                Json(json!({ "has_access": allowed }))
            }),
        );
        let backend = client(spawn_backend(app).await);

        assert!(backend.check_access("jane@corp.com", "md").await.unwrap());
        assert!(!backend.check_access("jane@corp.com", "finance-officer").await.unwrap());
    }

    #[tokio::test]
    async fn check_access_non_success_is_status_error() {
        let app = Router::new().route(
            "/api/auth/check-access",
            post(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "down") }),
        );
        let backend = client(spawn_backend(app).await);

        let err = backend.check_access("a@b.c", "md").await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn microsoft_login_returns_issued_session() {
        let app = Router::new().route(
            "/api/auth/microsoft-login",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["access_token"], "graph-token");
                Json(json!({
                    "access_token": "backend-jwt",
                    "user": {"email": "jane@corp.com", "role": "MD"},
                }))
            }),
        );
        let backend = client(spawn_backend(app).await);

        let session = backend.microsoft_login("graph-token", "md").await.unwrap();
        assert_eq!(session.access_token, "backend-jwt");
        assert_eq!(session.user["role"], "MD");
    }

    #[tokio::test]
    async fn microsoft_login_failure_carries_detail() {
        let app = Router::new().route(
            "/api/auth/microsoft-login",
            post(|| async {
                (
                    AxumStatus::UNAUTHORIZED,
                    Json(json!({"detail": "Account is disabled"})),
                )
            }),
        );
        let backend = client(spawn_backend(app).await);

        let err = backend.microsoft_login("t", "md").await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 401, .. }));
        assert_eq!(err.detail(), Some("Account is disabled"));
    }

    #[tokio::test]
    async fn microsoft_login_without_token_is_missing_token() {
        let app = Router::new().route(
            "/api/auth/microsoft-login",
            post(|| async { Json(json!({"user": {}})) }),
        );
        let backend = client(spawn_backend(app).await);

        let err = backend.microsoft_login("t", "md").await.unwrap_err();
        assert!(matches!(err, BackendError::MissingToken { detail: None }));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let backend = client(Url::parse("http://127.0.0.1:9/").unwrap());
        let err = backend.check_access("a@b.c", "md").await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
