// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy of the sync engine.
//!
//! Per-resource problems never surface here; they are contained inside a
//! pass (skipped, logged, counted). Only conditions that invalidate the
//! whole pass become a [`SyncError`].

use syncplus_dav::DavError;

/// A condition that aborts the current sync pass.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Network-level failure; the pass is retried on the next schedule.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server rejected our credentials.
    #[error("authorization failed")]
    Unauthorized,

    /// The server answered in a way the engine cannot act on.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The local data contradicts itself (corrupt payload, broken
    /// membership snapshot); usually needs a full resync to heal.
    #[error("invalid local state: {0}")]
    InvalidLocalState(String),

    /// Reading or writing the local store failed.
    #[error("local store error: {0}")]
    Store(String),

    /// The pass was cancelled (pause, shutdown, or user abort).
    #[error("sync cancelled")]
    Cancelled,
}

impl From<DavError> for SyncError {
    fn from(e: DavError) -> Self {
        match e {
            DavError::Unauthorized => Self::Unauthorized,
            DavError::Transport(msg) => Self::Transport(msg),
            other => Self::Protocol(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(e.to_string())
    }
}

/// A downloaded resource the engine cannot make sense of.
///
/// Such resources are skipped and reported via the invalid-resource
/// callback; they never abort the pass.
#[derive(Debug, thiserror::Error)]
#[error("invalid resource: {0}")]
pub struct InvalidResource(pub String);
