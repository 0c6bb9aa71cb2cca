// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Local storage abstraction.
//!
//! The engine only ever talks to a [`LocalStore`]; the platform decides
//! whether that is the SQLite-backed store or something else. The
//! [`MemoryStore`] backs tests and one-shot runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::entry::LocalEntry;
use crate::error::SyncError;
use crate::settings::Collection;
use crate::state::SyncState;

/// Storage for one collection's entries and sync state.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// The collection this store belongs to.
    fn collection(&self) -> &Collection;

    /// All entries, including tombstones.
    async fn all(&self) -> Result<Vec<LocalEntry>, SyncError>;

    /// Entries flagged dirty, including dirty tombstones.
    async fn dirty(&self) -> Result<Vec<LocalEntry>, SyncError>;

    /// Tombstones of locally deleted entries.
    async fn deleted(&self) -> Result<Vec<LocalEntry>, SyncError>;

    /// Looks up an entry by store key.
    async fn find_by_uid(&self, uid: &str) -> Result<Option<LocalEntry>, SyncError>;

    /// Looks up an entry by remote file name.
    async fn find_by_file_name(&self, name: &str) -> Result<Option<LocalEntry>, SyncError>;

    /// Inserts or replaces an entry, keyed by `uid`.
    async fn upsert(&self, entry: LocalEntry) -> Result<(), SyncError>;

    /// Removes an entry and its tombstone state entirely.
    async fn remove(&self, uid: &str) -> Result<(), SyncError>;

    /// Flags an entry dirty without touching its payload.
    async fn mark_dirty(&self, uid: &str) -> Result<(), SyncError>;

    /// Clears the deleted flag of a tombstone, restoring the entry.
    async fn undelete(&self, uid: &str) -> Result<(), SyncError>;

    /// Reads the persisted sync state.
    async fn read_sync_state(&self) -> Result<Option<SyncState>, SyncError>;

    /// Writes (or with `None` clears) the persisted sync state.
    async fn write_sync_state(&self, state: Option<&SyncState>) -> Result<(), SyncError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: BTreeMap<String, LocalEntry>,
    sync_state: Option<SyncState>,
}

/// In-memory [`LocalStore`].
#[derive(Debug)]
pub struct MemoryStore {
    collection: Collection,
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    /// Creates an empty store for the given collection.
    #[must_use]
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            inner: Mutex::new(MemoryInner::default()),
        }
    }

    /// Seeds an entry synchronously, bypassing the async trait. Intended
    /// for setting up fixtures.
    pub fn seed(&self, entry: LocalEntry) {
        self.lock().entries.insert(entry.uid.clone(), entry);
    }

    /// Seeds a sync state synchronously.
    pub fn seed_state(&self, state: SyncState) {
        self.lock().sync_state = Some(state);
    }

    /// Snapshot of all entries, for assertions.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LocalEntry> {
        self.lock().entries.values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A poisoned lock only happens after a panic in another test
        // thread; propagating the panic is fine there.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    fn collection(&self) -> &Collection {
        &self.collection
    }

    async fn all(&self) -> Result<Vec<LocalEntry>, SyncError> {
        Ok(self.lock().entries.values().cloned().collect())
    }

    async fn dirty(&self) -> Result<Vec<LocalEntry>, SyncError> {
        Ok(self
            .lock()
            .entries
            .values()
            .filter(|e| e.dirty)
            .cloned()
            .collect())
    }

    async fn deleted(&self) -> Result<Vec<LocalEntry>, SyncError> {
        Ok(self
            .lock()
            .entries
            .values()
            .filter(|e| e.deleted)
            .cloned()
            .collect())
    }

    async fn find_by_uid(&self, uid: &str) -> Result<Option<LocalEntry>, SyncError> {
        Ok(self.lock().entries.get(uid).cloned())
    }

    async fn find_by_file_name(&self, name: &str) -> Result<Option<LocalEntry>, SyncError> {
        Ok(self
            .lock()
            .entries
            .values()
            .find(|e| e.file_name.as_deref() == Some(name))
            .cloned())
    }

    async fn upsert(&self, entry: LocalEntry) -> Result<(), SyncError> {
        self.lock().entries.insert(entry.uid.clone(), entry);
        Ok(())
    }

    async fn remove(&self, uid: &str) -> Result<(), SyncError> {
        self.lock().entries.remove(uid);
        Ok(())
    }

    async fn mark_dirty(&self, uid: &str) -> Result<(), SyncError> {
        if let Some(entry) = self.lock().entries.get_mut(uid) {
            entry.dirty = true;
        }
        Ok(())
    }

    async fn undelete(&self, uid: &str) -> Result<(), SyncError> {
        if let Some(entry) = self.lock().entries.get_mut(uid) {
            entry.deleted = false;
        }
        Ok(())
    }

    async fn read_sync_state(&self) -> Result<Option<SyncState>, SyncError> {
        Ok(self.lock().sync_state.clone())
    }

    async fn write_sync_state(&self, state: Option<&SyncState>) -> Result<(), SyncError> {
        self.lock().sync_state = state.cloned();
        Ok(())
    }
}
