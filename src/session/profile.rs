// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The signed-in session persisted after a successful handshake.

use serde_json::Value;

use super::keys;
use super::store::{SessionStore, StorageResult};
use crate::auth::roles::{normalize_role, Role};

/// Bearer token and user profile as held in a client's store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub access_token: String,
    /// User object exactly as the backend returned it
    pub user: Value,
}

impl StoredSession {
    pub fn new(access_token: impl Into<String>, user: Value) -> Self {
        Self {
            access_token: access_token.into(),
            user,
        }
    }

    /// Read the stored session. `Ok(None)` if either half is missing.
    pub fn load(store: &dyn SessionStore) -> StorageResult<Option<Self>> {
        let Some(access_token) = store.get(keys::ACCESS_TOKEN)? else {
            return Ok(None);
        };
        let Some(user) = store.get(keys::USER)? else {
            return Ok(None);
        };
        if access_token.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            access_token,
            user: serde_json::from_str(&user)?,
        }))
    }

    /// Replace everything in `store` with this session.
    pub fn persist(&self, store: &dyn SessionStore) -> StorageResult<()> {
        let user = serde_json::to_string(&self.user)?;
        store.replace(&[
            (keys::ACCESS_TOKEN, self.access_token.as_str()),
            (keys::USER, user.as_str()),
        ])
    }

    /// Remove the token and profile, leaving other entries alone.
    pub fn discard(store: &dyn SessionStore) -> StorageResult<()> {
        store.remove(keys::ACCESS_TOKEN)?;
        store.remove(keys::USER)
    }

    /// Raw `role` field of the user profile.
    pub fn raw_role(&self) -> Option<&str> {
        self.user.get("role").and_then(Value::as_str)
    }

    pub fn role(&self) -> Option<Role> {
        normalize_role(self.raw_role())
    }

    pub fn email(&self) -> Option<&str> {
        self.user.get("email").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use serde_json::json;

    #[test]
    fn persist_then_load() {
        let store = MemorySessionStore::new();
        let session = StoredSession::new("tok", json!({"email": "a@corp.com", "role": "CEO"}));
        session.persist(&store).unwrap();

        let loaded = StoredSession::load(&store).unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.role(), Some(Role::Md));
        assert_eq!(loaded.email(), Some("a@corp.com"));
    }

    #[test]
    fn persist_overwrites_prior_state() {
        let store = MemorySessionStore::new();
        store.set(keys::PENDING_PORTAL, "md").unwrap();
        store.set("stale", "x").unwrap();

        StoredSession::new("tok", json!({})).persist(&store).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains_key(keys::ACCESS_TOKEN));
        assert!(snapshot.contains_key(keys::USER));
    }

    #[test]
    fn load_requires_both_halves() {
        let store = MemorySessionStore::new();
        store.set(keys::ACCESS_TOKEN, "tok").unwrap();
        assert!(StoredSession::load(&store).unwrap().is_none());

        store.remove(keys::ACCESS_TOKEN).unwrap();
        store.set(keys::USER, "{}").unwrap();
        assert!(StoredSession::load(&store).unwrap().is_none());

        store.set(keys::ACCESS_TOKEN, "").unwrap();
        assert!(StoredSession::load(&store).unwrap().is_none());
    }

    #[test]
    fn load_rejects_unparsable_user() {
        let store = MemorySessionStore::new();
        store.set(keys::ACCESS_TOKEN, "tok").unwrap();
        store.set(keys::USER, "{not json").unwrap();
        assert!(StoredSession::load(&store).is_err());
    }

    #[test]
    fn discard_keeps_pending_entries() {
        let store = MemorySessionStore::new();
        StoredSession::new("tok", json!({})).persist(&store).unwrap();
        store.set(keys::PENDING_PORTAL, "md").unwrap();

        StoredSession::discard(&store).unwrap();
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(store.get(keys::PENDING_PORTAL).unwrap().as_deref(), Some("md"));
    }
}
