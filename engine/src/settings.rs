// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Accounts, collections and per-account sync settings.

use serde::{Deserialize, Serialize};

/// A configured server account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Account name, unique per device.
    pub name: String,
}

impl Account {
    /// Creates an account with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The data domain a sync run operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Authority {
    /// Calendar events.
    Calendars,
    /// Contacts and contact groups.
    Contacts,
}

/// Stable identifier of a collection within an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    /// Creates a collection id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// What a collection holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionKind {
    /// A CalDAV calendar.
    Calendar,
    /// A CardDAV address book.
    AddressBook,
    /// A read-only iCalendar subscription.
    WebCal,
}

impl CollectionKind {
    /// The authority this kind of collection is synced under.
    #[must_use]
    pub const fn authority(self) -> Authority {
        match self {
            Self::Calendar | Self::WebCal => Authority::Calendars,
            Self::AddressBook => Authority::Contacts,
        }
    }
}

/// A remote collection known to the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Stable identifier.
    pub id: CollectionId,
    /// Collection path below the account base URL, with trailing slash.
    pub path: String,
    /// Human-readable name, if the server reported one.
    pub display_name: Option<String>,
    /// What the collection holds.
    pub kind: CollectionKind,
    /// Whether the user enabled syncing for this collection.
    pub sync_enabled: bool,
    /// Whether the collection is known to reject writes.
    pub read_only: bool,
}

impl Collection {
    /// Creates an enabled, writable collection.
    pub fn new(id: impl Into<CollectionId>, path: impl Into<String>, kind: CollectionKind) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            display_name: None,
            kind,
            sync_enabled: true,
            read_only: kind == CollectionKind::WebCal,
        }
    }
}

/// How contact group membership is represented in vCards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupMethod {
    /// Groups live in each contact's `CATEGORIES`; no group resources
    /// exist on the server.
    #[default]
    Categories,
    /// Groups are separate `KIND:group` vCards holding `MEMBER` URIs.
    VcardGroups,
}

/// Per-account settings that shape a sync run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    /// Contact group representation.
    pub group_method: GroupMethod,
    /// Restricts event sync to the last N days when set.
    pub time_range_past_days: Option<u32>,
}

/// Request-scoped options passed along with a sync invocation.
#[derive(Debug, Clone, Default)]
pub struct SyncExtras {
    /// The user asked for this run explicitly.
    pub manual: bool,
    /// The platform scheduled this run with elevated urgency.
    pub expedited: bool,
    /// Ignore stored `ETag`s and re-download everything.
    pub full_resync: bool,
    /// Ignore the stored sync state and re-list everything.
    pub resync: bool,
    /// Collections to sync first, in order.
    pub priority_collections: Vec<CollectionId>,
}

impl SyncExtras {
    /// Parses a comma-separated priority list as carried in sync request
    /// extras.
    #[must_use]
    pub fn parse_priority_list(raw: &str) -> Vec<CollectionId> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(CollectionId::from)
            .collect()
    }
}
