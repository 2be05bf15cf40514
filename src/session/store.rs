// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session store abstraction and the in-memory implementation.

use std::collections::HashMap;
use std::io;

use parking_lot::RwLock;

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid client id: {0}")]
    InvalidClientId(String),
}

/// Result type for session store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A single client's key-value session storage.
///
/// Mirrors what a browser keeps in local storage for one user: the issued
/// bearer token, the user profile and the pre-redirect login entries.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Remove every entry.
    fn clear(&self) -> StorageResult<()>;

    /// Replace every entry with `entries`.
    fn replace(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        self.clear()?;
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Read an entry and remove it, so it is consumed at most once.
    fn take(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self.get(key)?;
        if value.is_some() {
            self.remove(key)?;
        }
        Ok(value)
    }
}

/// Session store held in process memory.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all entries.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// True when every entry's key is one of `keys`. An empty store qualifies.
    pub fn holds_only(&self, keys: &[&str]) -> bool {
        self.entries
            .read()
            .keys()
            .all(|key| keys.contains(&key.as_str()))
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.entries.write().clear();
        Ok(())
    }

    fn replace(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        let mut map = self.entries.write();
        map.clear();
        map.extend(entries.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        Ok(())
    }

    // Single write lock so concurrent takes cannot both observe the entry.
    fn take(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.write().remove(key))
    }
}
