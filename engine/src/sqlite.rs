// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! SQLite-backed [`LocalStore`].
//!
//! One database holds one collection. The entry row keeps the payload in
//! its wire form and the membership sets as JSON arrays, so membership
//! snapshots are persisted in the same transaction as the entry itself.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use syncplus_dav::ETag;

use crate::entry::LocalEntry;
use crate::error::SyncError;
use crate::settings::Collection;
use crate::state::SyncState;
use crate::store::LocalStore;

const SQL_CREATE_ENTRIES: &str = "
CREATE TABLE IF NOT EXISTS entries (
    uid TEXT PRIMARY KEY NOT NULL,
    file_name TEXT,
    etag TEXT,
    schedule_tag TEXT,
    dirty INTEGER NOT NULL DEFAULT 0,
    deleted INTEGER NOT NULL DEFAULT 0,
    remotely_present INTEGER NOT NULL DEFAULT 0,
    is_group INTEGER NOT NULL DEFAULT 0,
    payload TEXT NOT NULL,
    memberships TEXT NOT NULL DEFAULT '[]',
    cached_memberships TEXT NOT NULL DEFAULT '[]'
)";

const SQL_CREATE_ENTRIES_FILE_NAME_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_entries_file_name ON entries (file_name)";

const SQL_CREATE_SYNC_STATE: &str = "
CREATE TABLE IF NOT EXISTS sync_state (
    id INTEGER PRIMARY KEY CHECK (id = 0),
    state TEXT
)";

#[derive(Debug, sqlx::FromRow)]
struct EntryRecord {
    uid: String,
    file_name: Option<String>,
    etag: Option<String>,
    schedule_tag: Option<String>,
    dirty: bool,
    deleted: bool,
    remotely_present: bool,
    is_group: bool,
    payload: String,
    memberships: String,
    cached_memberships: String,
}

impl EntryRecord {
    fn into_entry(self) -> Result<LocalEntry, SyncError> {
        let mut components = syncplus_vobject::parse(&self.payload).map_err(|e| {
            SyncError::InvalidLocalState(format!("corrupt payload for {}: {e}", self.uid))
        })?;
        if components.is_empty() {
            return Err(SyncError::InvalidLocalState(format!(
                "empty payload for {}",
                self.uid
            )));
        }
        Ok(LocalEntry {
            uid: self.uid,
            file_name: self.file_name,
            etag: self.etag.map(ETag::from),
            schedule_tag: self.schedule_tag,
            dirty: self.dirty,
            deleted: self.deleted,
            remotely_present: self.remotely_present,
            is_group: self.is_group,
            payload: components.remove(0),
            group_memberships: decode_memberships(&self.memberships)?,
            cached_memberships: decode_memberships(&self.cached_memberships)?,
        })
    }
}

fn decode_memberships(raw: &str) -> Result<BTreeSet<String>, SyncError> {
    serde_json::from_str(raw)
        .map_err(|e| SyncError::InvalidLocalState(format!("corrupt memberships: {e}")))
}

fn encode_memberships(set: &BTreeSet<String>) -> String {
    serde_json::to_string(set).unwrap_or_else(|_| "[]".to_string())
}

/// SQLite-backed store for one collection.
pub struct SqliteStore {
    pool: SqlitePool,
    collection: Collection,
}

impl SqliteStore {
    /// Opens (and if needed initializes) the database at `url`.
    ///
    /// `url` is an sqlx SQLite URL such as `sqlite:contacts.db?mode=rwc`
    /// or `sqlite::memory:`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open(url: &str, collection: Collection) -> Result<Self, SyncError> {
        let pool = SqlitePool::connect(url).await?;
        sqlx::query(SQL_CREATE_ENTRIES).execute(&pool).await?;
        sqlx::query(SQL_CREATE_ENTRIES_FILE_NAME_INDEX)
            .execute(&pool)
            .await?;
        sqlx::query(SQL_CREATE_SYNC_STATE).execute(&pool).await?;
        tracing::debug!(collection = %collection.id, "opened local store");
        Ok(Self { pool, collection })
    }

    async fn fetch_where(&self, sql: &str) -> Result<Vec<LocalEntry>, SyncError> {
        let records: Vec<EntryRecord> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
        records.into_iter().map(EntryRecord::into_entry).collect()
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    fn collection(&self) -> &Collection {
        &self.collection
    }

    async fn all(&self) -> Result<Vec<LocalEntry>, SyncError> {
        self.fetch_where("SELECT * FROM entries ORDER BY uid").await
    }

    async fn dirty(&self) -> Result<Vec<LocalEntry>, SyncError> {
        self.fetch_where("SELECT * FROM entries WHERE dirty = 1 ORDER BY uid")
            .await
    }

    async fn deleted(&self) -> Result<Vec<LocalEntry>, SyncError> {
        self.fetch_where("SELECT * FROM entries WHERE deleted = 1 ORDER BY uid")
            .await
    }

    async fn find_by_uid(&self, uid: &str) -> Result<Option<LocalEntry>, SyncError> {
        let record: Option<EntryRecord> = sqlx::query_as("SELECT * FROM entries WHERE uid = ?")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        record.map(EntryRecord::into_entry).transpose()
    }

    async fn find_by_file_name(&self, name: &str) -> Result<Option<LocalEntry>, SyncError> {
        let record: Option<EntryRecord> =
            sqlx::query_as("SELECT * FROM entries WHERE file_name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        record.map(EntryRecord::into_entry).transpose()
    }

    async fn upsert(&self, entry: LocalEntry) -> Result<(), SyncError> {
        sqlx::query(
            "INSERT OR REPLACE INTO entries \
             (uid, file_name, etag, schedule_tag, dirty, deleted, remotely_present, is_group, \
              payload, memberships, cached_memberships) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.uid)
        .bind(&entry.file_name)
        .bind(entry.etag.as_ref().map(|e| e.as_str().to_string()))
        .bind(&entry.schedule_tag)
        .bind(entry.dirty)
        .bind(entry.deleted)
        .bind(entry.remotely_present)
        .bind(entry.is_group)
        .bind(syncplus_vobject::write(&entry.payload))
        .bind(encode_memberships(&entry.group_memberships))
        .bind(encode_memberships(&entry.cached_memberships))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, uid: &str) -> Result<(), SyncError> {
        sqlx::query("DELETE FROM entries WHERE uid = ?")
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_dirty(&self, uid: &str) -> Result<(), SyncError> {
        sqlx::query("UPDATE entries SET dirty = 1 WHERE uid = ?")
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn undelete(&self, uid: &str) -> Result<(), SyncError> {
        sqlx::query("UPDATE entries SET deleted = 0 WHERE uid = ?")
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn read_sync_state(&self) -> Result<Option<SyncState>, SyncError> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT state FROM sync_state WHERE id = 0")
                .fetch_optional(&self.pool)
                .await?;
        Ok(row
            .and_then(|(state,)| state)
            .as_deref()
            .and_then(SyncState::from_stored))
    }

    async fn write_sync_state(&self, state: Option<&SyncState>) -> Result<(), SyncError> {
        sqlx::query(
            "INSERT INTO sync_state (id, state) VALUES (0, ?) \
             ON CONFLICT (id) DO UPDATE SET state = excluded.state",
        )
        .bind(state.map(SyncState::to_json))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
