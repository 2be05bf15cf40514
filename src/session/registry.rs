// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-client session stores.

use std::collections::HashMap;
use std::fs;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::file::{FileSessionStore, SessionPaths};
use super::keys;
use super::store::{MemorySessionStore, SessionStore, StorageError, StorageResult};

/// Identifies one browser client's session store.
///
/// Always a UUID, so it is safe to embed in file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for ClientId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| StorageError::InvalidClientId(s.to_string()))
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

/// How long a store holding only an unfinished login stays in memory.
pub const PENDING_LOGIN_TTL: Duration = Duration::from_secs(10 * 60);

/// Minimum time between idle-store sweeps triggered by `open`.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Keys written before the redirect to the identity provider.
const PENDING_KEYS: [&str; 3] = [keys::PENDING_PORTAL, keys::LOGIN_STATE, keys::LOGIN_NONCE];

struct Slot<T> {
    store: Arc<T>,
    last_used: Instant,
}

/// Live stores keyed by client. Every request for one client gets the same
/// `Arc`, so a store's own lock covers all of that client's writes.
struct StoreCache<T> {
    slots: Mutex<HashMap<ClientId, Slot<T>>>,
}

impl<T> StoreCache<T> {
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn open(&self, client_id: &ClientId, create: impl FnOnce() -> T) -> Arc<T> {
        let mut slots = self.slots.lock();
        let slot = slots.entry(*client_id).or_insert_with(|| Slot {
            store: Arc::new(create()),
            last_used: Instant::now(),
        });
        slot.last_used = Instant::now();
        slot.store.clone()
    }

    /// Drop every slot no request holds and for which `evict(store, idle)`
    /// is true. Returns how many were dropped.
    fn evict(&self, mut evict: impl FnMut(&T, Duration) -> bool) -> usize {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| {
            Arc::strong_count(&slot.store) > 1 || !evict(&slot.store, slot.last_used.elapsed())
        });
        before - slots.len()
    }

    fn evict_one(&self, client_id: &ClientId, evict: impl FnOnce(&T) -> bool) {
        let mut slots = self.slots.lock();
        let unused = slots
            .get(client_id)
            .is_some_and(|slot| Arc::strong_count(&slot.store) == 1 && evict(&slot.store));
        if unused {
            slots.remove(client_id);
        }
    }

    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

enum Medium {
    /// Stores held in process memory (lost on restart)
    Memory(StoreCache<MemorySessionStore>),
    /// One JSON file per client under a session directory
    File {
        paths: SessionPaths,
        stores: StoreCache<FileSessionStore>,
    },
}

struct Shared {
    medium: Medium,
    last_sweep: Mutex<Instant>,
}

/// Where client session stores live.
///
/// Cheap to clone; clones share the same stores.
#[derive(Clone)]
pub struct SessionBackend {
    shared: Arc<Shared>,
    pending_ttl: Duration,
}

impl SessionBackend {
    fn with_medium(medium: Medium) -> Self {
        Self {
            shared: Arc::new(Shared {
                medium,
                last_sweep: Mutex::new(Instant::now()),
            }),
            pending_ttl: PENDING_LOGIN_TTL,
        }
    }

    pub fn memory() -> Self {
        Self::with_medium(Medium::Memory(StoreCache::new()))
    }

    /// File backend rooted at `root`. Creates the sessions directory.
    pub fn file(root: impl AsRef<std::path::Path>) -> StorageResult<Self> {
        let paths = SessionPaths::new(root);
        fs::create_dir_all(paths.sessions_dir())?;
        Ok(Self::with_medium(Medium::File {
            paths,
            stores: StoreCache::new(),
        }))
    }

    /// Override [`PENDING_LOGIN_TTL`].
    pub fn with_pending_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl = ttl;
        self
    }

    /// Open the session store for `client_id`, creating it if needed.
    pub fn open(&self, client_id: &ClientId) -> Arc<dyn SessionStore> {
        if self.sweep_due() {
            let dropped = self.sweep();
            if dropped > 0 {
                debug!(dropped, backend = self.kind(), "Dropped idle session stores");
            }
        }

        match &self.shared.medium {
            Medium::Memory(stores) => stores.open(client_id, MemorySessionStore::new),
            Medium::File { paths, stores } => {
                stores.open(client_id, || FileSessionStore::for_client(paths, client_id))
            }
        }
    }

    /// Clear a client's store and release it.
    pub fn clear(&self, client_id: &ClientId) -> StorageResult<()> {
        self.open(client_id).clear()?;
        match &self.shared.medium {
            Medium::Memory(stores) => stores.evict_one(client_id, MemorySessionStore::is_empty),
            Medium::File { stores, .. } => stores.evict_one(client_id, |_| true),
        }
        Ok(())
    }

    /// Drop stores no request is using.
    ///
    /// In memory that means empty stores, and stores holding only an
    /// unfinished login that has been idle for the pending TTL. File stores
    /// are always dropped since their entries stay on disk.
    pub fn sweep(&self) -> usize {
        let ttl = self.pending_ttl;
        match &self.shared.medium {
            Medium::Memory(stores) => stores.evict(|store, idle| {
                store.is_empty() || (idle >= ttl && store.holds_only(&PENDING_KEYS))
            }),
            Medium::File { stores, .. } => stores.evict(|_, _| true),
        }
    }

    /// Number of stores currently held in memory.
    pub fn open_stores(&self) -> usize {
        match &self.shared.medium {
            Medium::Memory(stores) => stores.len(),
            Medium::File { stores, .. } => stores.len(),
        }
    }

    fn sweep_due(&self) -> bool {
        let mut last = self.shared.last_sweep.lock();
        if last.elapsed() < SWEEP_INTERVAL {
            return false;
        }
        *last = Instant::now();
        true
    }

    /// Write-read-delete probe of the backing storage.
    pub fn health_check(&self) -> StorageResult<()> {
        match &self.shared.medium {
            Medium::Memory(_) => Ok(()),
            Medium::File { paths, .. } => {
                let probe = paths.sessions_dir().join(".health_check");
                fs::write(&probe, b"ok")?;
                let read = fs::read(&probe)?;
                fs::remove_file(&probe)?;
                if read != b"ok" {
                    return Err(StorageError::Io(std::io::Error::other(
                        "health check data mismatch",
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match &self.shared.medium {
            Medium::Memory(_) => "memory",
            Medium::File { .. } => "file",
        }
    }
}

impl Default for SessionBackend {
    fn default() -> Self {
        Self::memory()
    }
}
