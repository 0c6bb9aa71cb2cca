// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! A locally stored calendar event or contact.

use std::collections::BTreeSet;

use syncplus_dav::ETag;
use syncplus_vobject::Component;

/// One row of the local store.
///
/// `uid` is the store key. For recurrence exceptions stored as separate
/// rows the key is `<master-uid>#<recurrence-id>` while the payload keeps
/// the master's UID, so exceptions never collide with their master.
#[derive(Debug, Clone)]
pub struct LocalEntry {
    /// Store key; usually the payload UID.
    pub uid: String,
    /// File name of the remote resource, assigned on first upload or
    /// download.
    pub file_name: Option<String>,
    /// `ETag` of the last version seen on the server.
    pub etag: Option<ETag>,
    /// `Schedule-Tag` of the last version seen, when the server sent one.
    pub schedule_tag: Option<String>,
    /// The entry changed locally since the last upload.
    pub dirty: bool,
    /// The entry was deleted locally; the row is a tombstone until the
    /// deletion is pushed.
    pub deleted: bool,
    /// The resource was confirmed present on the server at least once.
    pub remotely_present: bool,
    /// The entry is a contact group rather than a plain contact.
    pub is_group: bool,
    /// Parsed iCalendar/vCard payload.
    pub payload: Component,
    /// UIDs (or category names) of the groups this contact belongs to.
    pub group_memberships: BTreeSet<String>,
    /// Memberships as of the last completed reconciliation. Persisted
    /// together with the entry; the difference against
    /// `group_memberships` drives group dirty-marking.
    pub cached_memberships: BTreeSet<String>,
}

impl LocalEntry {
    /// Creates a fresh, clean entry with no remote counterpart yet.
    pub fn new(uid: impl Into<String>, payload: Component) -> Self {
        Self {
            uid: uid.into(),
            file_name: None,
            etag: None,
            schedule_tag: None,
            dirty: false,
            deleted: false,
            remotely_present: false,
            is_group: false,
            payload,
            group_memberships: BTreeSet::new(),
            cached_memberships: BTreeSet::new(),
        }
    }

    /// Creates a locally authored entry that still needs its first upload.
    pub fn new_local(uid: impl Into<String>, payload: Component) -> Self {
        let mut entry = Self::new(uid, payload);
        entry.dirty = true;
        entry
    }

    /// Whether this entry has local changes to push. Deletion wins over a
    /// concurrent local edit.
    #[must_use]
    pub fn needs_upload(&self) -> bool {
        self.dirty && !self.deleted
    }

    /// Memberships added or removed since the cached snapshot.
    #[must_use]
    pub fn membership_changes(&self) -> BTreeSet<String> {
        self.group_memberships
            .symmetric_difference(&self.cached_memberships)
            .cloned()
            .collect()
    }
}
