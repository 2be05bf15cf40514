// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The sign-in handshake state machine.
//!
//! ```text
//! AwaitingThirdPartySession ──► VerifyingAccess ──► IssuingToken ──► Redirecting ──► Authenticated
//!          │                          │                   │               │
//!          ▼                          └───────────────────┴───────────────┴──► AccessDenied
//!   ReturnedToEntry
//! ```
//!
//! Every fault is terminal for the attempt and produces exactly one message.
//! Nothing is retried; the user starts over from the portal's login page.

use tracing::{info, warn};

use super::backend::AuthBackend;
use super::identity::{IdentitySource, SessionStatus, VerifiedIdentity};
use crate::portal::access::dashboard_route_for_portal;
use crate::session::{keys, SessionStore, StoredSession};

/// User-facing failure messages.
pub mod messages {
    pub const MISSING_PORTAL: &str =
        "Configuration error: no portal was specified for this sign-in. Please start again from your portal's login page.";
    pub const VERIFY_FAILED: &str = "Could not verify your access. Please try again.";
    pub const MISSING_PROVIDER_TOKEN: &str =
        "Configuration error: the identity provider did not return an access token.";
    pub const CONNECTION_FAILED: &str =
        "Failed to connect to the authentication server. Please try again.";
    pub const SESSION_NOT_SAVED: &str = "Could not save your session. Please try again.";

    pub fn access_denied(email: &str, portal: &str) -> String {
        format!("Access denied: {email} does not have access to the {portal} portal.")
    }

    pub fn unknown_portal(portal: &str) -> String {
        format!("Unknown portal: {portal}")
    }
}

/// Handshake states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    AwaitingThirdPartySession,
    VerifyingAccess {
        identity: VerifiedIdentity,
        portal: String,
    },
    IssuingToken {
        identity: VerifiedIdentity,
        portal: String,
    },
    Redirecting {
        portal: String,
    },
    /// Signed in. `location` replaces the callback in history.
    Authenticated {
        location: String,
    },
    AccessDenied {
        message: String,
    },
    /// No identity was asserted; back to the entry page without an error.
    ReturnedToEntry,
}

impl HandshakeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HandshakeState::Authenticated { .. }
                | HandshakeState::AccessDenied { .. }
                | HandshakeState::ReturnedToEntry
        )
    }

    fn denied(message: impl Into<String>) -> Self {
        HandshakeState::AccessDenied {
            message: message.into(),
        }
    }
}

/// One sign-in attempt for one client.
pub struct Handshake<'a> {
    identity: &'a dyn IdentitySource,
    backend: &'a dyn AuthBackend,
    store: &'a dyn SessionStore,
    /// Portal slug from the callback query string
    query_portal: Option<String>,
    state: HandshakeState,
}

impl<'a> Handshake<'a> {
    pub fn new(
        identity: &'a dyn IdentitySource,
        backend: &'a dyn AuthBackend,
        store: &'a dyn SessionStore,
        query_portal: Option<String>,
    ) -> Self {
        Self {
            identity,
            backend,
            store,
            query_portal,
            state: HandshakeState::AwaitingThirdPartySession,
        }
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    /// Drive the handshake until it is terminal, or until the identity
    /// session is still loading (state stays `AwaitingThirdPartySession`).
    pub async fn run(mut self) -> HandshakeState {
        loop {
            self.step().await;
            if self.state.is_terminal() || self.state == HandshakeState::AwaitingThirdPartySession
            {
                return self.state;
            }
        }
    }

    /// Perform one transition.
    pub async fn step(&mut self) -> &HandshakeState {
        let current = std::mem::replace(&mut self.state, HandshakeState::AwaitingThirdPartySession);

        self.state = match current {
            HandshakeState::AwaitingThirdPartySession => self.await_session().await,
            HandshakeState::VerifyingAccess { identity, portal } => {
                self.verify_access(identity, portal).await
            }
            HandshakeState::IssuingToken { identity, portal } => {
                self.issue_token(identity, portal).await
            }
            HandshakeState::Redirecting { portal } => self.redirect(&portal),
            terminal => terminal,
        };

        &self.state
    }

    async fn await_session(&self) -> HandshakeState {
        let identity = match self.identity.session().await {
            SessionStatus::Loading => return HandshakeState::AwaitingThirdPartySession,
            SessionStatus::Unauthenticated => return HandshakeState::ReturnedToEntry,
            SessionStatus::Authenticated(identity) => identity,
        };

        // Consumed whether or not the query string names a portal.
        let pending = self.store.take(keys::PENDING_PORTAL).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read pending portal");
            None
        });

        let portal = non_blank(self.query_portal.as_deref()).or(non_blank(pending.as_deref()));

        match portal {
            Some(portal) => HandshakeState::VerifyingAccess {
                identity,
                portal: portal.to_string(),
            },
            None => {
                warn!(email = %identity.email, "Callback without a portal slug");
                HandshakeState::denied(messages::MISSING_PORTAL)
            }
        }
    }

    async fn verify_access(&self, identity: VerifiedIdentity, portal: String) -> HandshakeState {
        match self.backend.check_access(&identity.email, &portal).await {
            Ok(true) => HandshakeState::IssuingToken { identity, portal },
            Ok(false) => {
                info!(email = %identity.email, portal = %portal, "Portal access denied");
                if let Err(e) = StoredSession::discard(self.store) {
                    warn!(error = %e, "Failed to discard stored session after denial");
                }
                HandshakeState::denied(messages::access_denied(&identity.email, &portal))
            }
            Err(e) => {
                warn!(error = %e, email = %identity.email, portal = %portal, "Access check failed");
                HandshakeState::denied(messages::VERIFY_FAILED)
            }
        }
    }

    async fn issue_token(&self, identity: VerifiedIdentity, portal: String) -> HandshakeState {
        let Some(provider_token) = identity.access_token.as_deref() else {
            warn!(email = %identity.email, "Identity session has no access token");
            return HandshakeState::denied(messages::MISSING_PROVIDER_TOKEN);
        };

        let issued = match self.backend.microsoft_login(provider_token, &portal).await {
            Ok(issued) => issued,
            Err(e) => {
                warn!(error = %e, email = %identity.email, portal = %portal, "Token exchange failed");
                return HandshakeState::denied(
                    e.detail().unwrap_or(messages::CONNECTION_FAILED).to_string(),
                );
            }
        };

        let session = StoredSession::new(issued.access_token, issued.user);
        if let Err(e) = session.persist(self.store) {
            warn!(error = %e, email = %identity.email, "Failed to persist session");
            return HandshakeState::denied(messages::SESSION_NOT_SAVED);
        }

        info!(email = %identity.email, portal = %portal, "Signed in");
        HandshakeState::Redirecting { portal }
    }

    fn redirect(&self, portal: &str) -> HandshakeState {
        match dashboard_route_for_portal(Some(portal)) {
            Some(route) => HandshakeState::Authenticated {
                location: route.to_string(),
            },
            None => {
                warn!(portal = %portal, "Signed in to an unregistered portal");
                // A denied sign-in leaves no session behind.
                if let Err(e) = StoredSession::discard(self.store) {
                    warn!(error = %e, "Failed to discard stored session after unknown portal");
                }
                HandshakeState::denied(messages::unknown_portal(portal))
            }
        }
    }
}


fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::backend::{BackendError, IssuedSession};
    use crate::session::MemorySessionStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    struct FixedIdentity(SessionStatus);

    #[async_trait]
    impl IdentitySource for FixedIdentity {
        async fn session(&self) -> SessionStatus {
            self.0.clone()
        }
    }

    fn signed_in(email: &str) -> FixedIdentity {
        FixedIdentity(SessionStatus::Authenticated(VerifiedIdentity {
            email: email.to_string(),
            access_token: Some("graph-token".to_string()),
        }))
    }

    #[derive(Clone)]
    enum Reply<T> {
        Ok(T),
        Status(u16, Option<&'static str>),
        Transport,
    }

    impl<T: Clone> Reply<T> {
        fn into_result(self) -> Result<T, BackendError> {
            match self {
                Reply::Ok(v) => Ok(v),
                Reply::Status(status, detail) => Err(BackendError::Status {
                    status,
                    detail: detail.map(String::from),
                }),
                Reply::Transport => Err(BackendError::Transport("connection refused".into())),
            }
        }
    }

    struct FakeBackend {
        access: Reply<bool>,
        login: Reply<IssuedSession>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(access: Reply<bool>, login: Reply<IssuedSession>) -> Self {
            Self {
                access,
                login,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn allowing(user: Value) -> Self {
            Self::new(
                Reply::Ok(true),
                Reply::Ok(IssuedSession {
                    access_token: "backend-jwt".into(),
                    user,
                }),
            )
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl AuthBackend for FakeBackend {
        async fn check_access(&self, email: &str, portal: &str) -> Result<bool, BackendError> {
            self.calls.lock().push(format!("check-access {email} {portal}"));
            self.access.clone().into_result()
        }

        async fn microsoft_login(
            &self,
            access_token: &str,
            portal: &str,
        ) -> Result<IssuedSession, BackendError> {
            self.calls
                .lock()
                .push(format!("microsoft-login {access_token} {portal}"));
            self.login.clone().into_result()
        }
    }

    async fn run(
        identity: &FixedIdentity,
        backend: &FakeBackend,
        store: &MemorySessionStore,
        query_portal: Option<&str>,
    ) -> HandshakeState {
        Handshake::new(identity, backend, store, query_portal.map(String::from))
            .run()
            .await
    }

    #[tokio::test]
    async fn successful_handshake_persists_and_redirects() {
        let identity = signed_in("jane@corp.com");
        let backend = FakeBackend::allowing(json!({"email": "jane@corp.com", "role": "MD"}));
        let store = MemorySessionStore::new();

        let state = run(&identity, &backend, &store, Some("md")).await;

        assert_eq!(
            state,
            HandshakeState::Authenticated {
                location: "/md/dashboard".into()
            }
        );
        let session = StoredSession::load(&store).unwrap().unwrap();
        assert_eq!(session.access_token, "backend-jwt");
        assert_eq!(session.user["role"], "MD");
        assert_eq!(
            backend.calls(),
            vec![
                "check-access jane@corp.com md".to_string(),
                "microsoft-login graph-token md".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn steps_visit_each_state_in_order() {
        let identity = signed_in("jane@corp.com");
        let backend = FakeBackend::allowing(json!({"role": "FINANCE_OFFICER"}));
        let store = MemorySessionStore::new();
        let mut handshake = Handshake::new(&identity, &backend, &store, Some("finance-officer".into()));

        assert!(matches!(
            handshake.step().await,
            HandshakeState::VerifyingAccess { .. }
        ));
        assert!(matches!(
            handshake.step().await,
            HandshakeState::IssuingToken { .. }
        ));
        assert!(matches!(
            handshake.step().await,
            HandshakeState::Redirecting { .. }
        ));
        assert!(matches!(
            handshake.step().await,
            HandshakeState::Authenticated { .. }
        ));
        // Terminal states stay put
        assert!(matches!(
            handshake.step().await,
            HandshakeState::Authenticated { .. }
        ));
    }

    #[tokio::test]
    async fn loading_session_stays_suspended() {
        let identity = FixedIdentity(SessionStatus::Loading);
        let backend = FakeBackend::allowing(json!({}));
        let store = MemorySessionStore::new();
        store.set(keys::PENDING_PORTAL, "md").unwrap();

        let state = run(&identity, &backend, &store, None).await;

        assert_eq!(state, HandshakeState::AwaitingThirdPartySession);
        assert!(backend.calls().is_empty());
        // Nothing consumed while loading
        assert_eq!(store.get(keys::PENDING_PORTAL).unwrap().as_deref(), Some("md"));
    }

    #[tokio::test]
    async fn unauthenticated_returns_to_entry() {
        let identity = FixedIdentity(SessionStatus::Unauthenticated);
        let backend = FakeBackend::allowing(json!({}));
        let store = MemorySessionStore::new();

        let state = run(&identity, &backend, &store, Some("md")).await;

        assert_eq!(state, HandshakeState::ReturnedToEntry);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn pending_portal_is_fallback_and_consumed() {
        let identity = signed_in("jane@corp.com");
        let backend = FakeBackend::allowing(json!({"role": "FINANCE_DIRECTOR"}));
        let store = MemorySessionStore::new();
        store.set(keys::PENDING_PORTAL, "finance-director").unwrap();

        let state = run(&identity, &backend, &store, None).await;

        assert_eq!(
            state,
            HandshakeState::Authenticated {
                location: "/finance-director/dashboard".into()
            }
        );
        assert_eq!(store.get(keys::PENDING_PORTAL).unwrap(), None);
    }

    #[tokio::test]
    async fn query_portal_wins_over_pending_which_is_still_cleared() {
        let identity = signed_in("jane@corp.com");
        let backend = FakeBackend::new(Reply::Ok(false), Reply::Transport);
        let store = MemorySessionStore::new();
        store.set(keys::PENDING_PORTAL, "finance-director").unwrap();

        run(&identity, &backend, &store, Some("md")).await;

        assert_eq!(backend.calls(), vec!["check-access jane@corp.com md".to_string()]);
        assert_eq!(store.get(keys::PENDING_PORTAL).unwrap(), None);
    }

    #[tokio::test]
    async fn missing_portal_is_configuration_error() {
        let identity = signed_in("jane@corp.com");
        let backend = FakeBackend::allowing(json!({}));
        let store = MemorySessionStore::new();

        let state = run(&identity, &backend, &store, Some("  ")).await;

        assert_eq!(state, HandshakeState::denied(messages::MISSING_PORTAL));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn access_denied_names_email_and_portal_and_writes_no_token() {
        let identity = signed_in("bob@corp.com");
        let backend = FakeBackend::new(Reply::Ok(false), Reply::Transport);
        let store = MemorySessionStore::new();

        let state = run(&identity, &backend, &store, Some("md")).await;

        match state {
            HandshakeState::AccessDenied { message } => {
                assert!(message.contains("bob@corp.com"));
                assert!(message.contains("md"));
            }
            other => panic!("expected denial, got {other:?}"),
        }
        assert!(store.get(keys::ACCESS_TOKEN).unwrap().is_none());
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn explicit_denial_removes_prior_session() {
        let identity = signed_in("bob@corp.com");
        let backend = FakeBackend::new(Reply::Ok(false), Reply::Transport);
        let store = MemorySessionStore::new();
        StoredSession::new("old-token", json!({"role": "MD"}))
            .persist(&store)
            .unwrap();

        run(&identity, &backend, &store, Some("md")).await;

        assert!(StoredSession::load(&store).unwrap().is_none());
    }

    #[tokio::test]
    async fn access_check_failures_are_generic_and_not_retried() {
        for reply in [Reply::Status(500, Some("boom")), Reply::Transport] {
            let identity = signed_in("jane@corp.com");
            let backend = FakeBackend::new(reply, Reply::Transport);
            let store = MemorySessionStore::new();

            let state = run(&identity, &backend, &store, Some("md")).await;

            assert_eq!(state, HandshakeState::denied(messages::VERIFY_FAILED));
            assert_eq!(backend.calls().len(), 1);
        }
    }

    #[tokio::test]
    async fn missing_provider_token_is_configuration_error() {
        let identity = FixedIdentity(SessionStatus::Authenticated(VerifiedIdentity {
            email: "jane@corp.com".into(),
            access_token: None,
        }));
        let backend = FakeBackend::allowing(json!({}));
        let store = MemorySessionStore::new();

        let state = run(&identity, &backend, &store, Some("md")).await;

        assert_eq!(state, HandshakeState::denied(messages::MISSING_PROVIDER_TOKEN));
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn token_exchange_500_leaves_storage_untouched() {
        let identity = signed_in("jane@corp.com");
        let backend = FakeBackend::new(Reply::Ok(true), Reply::Status(500, None));
        let store = MemorySessionStore::new();
        StoredSession::new("previous", json!({"role": "MD"}))
            .persist(&store)
            .unwrap();
        let before = store.snapshot();

        let state = run(&identity, &backend, &store, Some("md")).await;

        assert_eq!(state, HandshakeState::denied(messages::CONNECTION_FAILED));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn token_exchange_detail_is_shown() {
        let identity = signed_in("jane@corp.com");
        let backend = FakeBackend::new(
            Reply::Ok(true),
            Reply::Status(403, Some("Your account has been deactivated")),
        );
        let store = MemorySessionStore::new();

        let state = run(&identity, &backend, &store, Some("md")).await;

        assert_eq!(
            state,
            HandshakeState::denied("Your account has been deactivated")
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unknown_portal_is_denied_after_token_issue() {
        let identity = signed_in("jane@corp.com");
        let backend = FakeBackend::allowing(json!({"role": "SYSTEM_ADMIN"}));
        let store = MemorySessionStore::new();

        let state = run(&identity, &backend, &store, Some("payroll")).await;

        assert_eq!(state, HandshakeState::denied(messages::unknown_portal("payroll")));
        assert_eq!(StoredSession::load(&store).unwrap(), None);
        assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap(), None);
        assert_eq!(store.get(keys::USER).unwrap(), None);
    }

    #[tokio::test]
    async fn uppercase_slug_redirects_like_lowercase() {
        let identity = signed_in("ceo@corp.com");
        let backend = FakeBackend::allowing(json!({"role": "CEO"}));
        let store = MemorySessionStore::new();

        let state = run(&identity, &backend, &store, Some("MD")).await;

        assert_eq!(
            state,
            HandshakeState::Authenticated {
                location: "/md/dashboard".into()
            }
        );
    }
}
