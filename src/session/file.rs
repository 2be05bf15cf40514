// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File-backed session store.
//!
//! ## Storage Layout
//!
//! ```text
//! {SESSION_DIR}/
//!   sessions/
//!     {client_id}.json   # flat JSON object of session keys
//! ```
//!
//! Writes go to a uniquely named temp file in the same directory and are
//! renamed into place, so a reader never sees a half-written session.
//! Read-modify-write cycles are serialized per `FileSessionStore`; the
//! [`SessionBackend`](super::SessionBackend) hands every request for a client
//! the same instance.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use super::registry::ClientId;
use super::store::{SessionStore, StorageResult};

/// Path utilities for the session directory.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    root: PathBuf,
}

impl SessionPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory containing all client sessions.
    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    /// Session file for one client.
    pub fn session_file(&self, client_id: &ClientId) -> PathBuf {
        self.sessions_dir().join(format!("{client_id}.json"))
    }
}

type Entries = BTreeMap<String, String>;

/// Session store persisted as one JSON file per client.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn for_client(paths: &SessionPaths, client_id: &ClientId) -> Self {
        Self::new(paths.session_file(client_id))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<Entries> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn save(&self, entries: &Entries) -> StorageResult<()> {
        if entries.is_empty() {
            return self.delete_file();
        }

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, entries)?;
            writer.flush()?;
        }

        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn delete_file(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn modify<T>(&self, f: impl FnOnce(&mut Entries) -> T) -> StorageResult<T> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        let result = f(&mut entries);
        self.save(&entries)?;
        Ok(result)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> StorageResult<()> {
        let _guard = self.lock.lock();
        self.delete_file()
    }

    fn replace(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        let _guard = self.lock.lock();
        let entries: Entries = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.save(&entries)
    }

    fn take(&self, key: &str) -> StorageResult<Option<String>> {
        self.modify(|entries| entries.remove(key))
    }
}
