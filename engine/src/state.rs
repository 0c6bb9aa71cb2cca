// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Persisted per-collection sync state.
//!
//! The state is stored as a small JSON document so older deployments that
//! kept a bare token string keep working: such values are upgraded to a
//! `CTAG`-typed state on first read.

use serde::{Deserialize, Serialize};

/// The kind of token held in a [`SyncState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncTokenKind {
    /// Collection tag compared for equality; any change means "re-list".
    #[serde(rename = "CTAG")]
    CTag,
    /// RFC 6578 token handed back to `sync-collection`.
    #[serde(rename = "SYNC_TOKEN")]
    SyncToken,
}

/// Where the last completed pass left off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Token kind.
    #[serde(rename = "type")]
    pub kind: SyncTokenKind,
    /// Opaque token value as the server reported it.
    pub value: String,
    /// Set while a truncated first delta walk is still in progress; the
    /// next pass continues from `value` instead of starting over.
    #[serde(rename = "initialSync", default, skip_serializing_if = "std::ops::Not::not")]
    pub initial_sync: bool,
}

impl SyncState {
    /// A `CTAG` state.
    pub fn ctag(value: impl Into<String>) -> Self {
        Self {
            kind: SyncTokenKind::CTag,
            value: value.into(),
            initial_sync: false,
        }
    }

    /// A `SYNC_TOKEN` state.
    pub fn sync_token(value: impl Into<String>) -> Self {
        Self {
            kind: SyncTokenKind::SyncToken,
            value: value.into(),
            initial_sync: false,
        }
    }

    /// Serializes the state for storage.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Reads a stored state, accepting both the JSON document and the
    /// legacy bare-token form.
    #[must_use]
    pub fn from_stored(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        match serde_json::from_str(raw) {
            Ok(state) => Some(state),
            Err(_) => Some(Self::ctag(raw)),
        }
    }
}
