// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Per-domain behavior plugged into the sync pass.
//!
//! The pass itself is domain-agnostic; everything calendar- or
//! contact-specific hangs off this trait. Hooks with a default body are
//! no-ops for domains that do not need them.

use async_trait::async_trait;
use syncplus_dav::{Capabilities, DavClient, MultigetKind, ResourceRef};
use syncplus_vobject::Component;

use crate::entry::LocalEntry;
use crate::error::{InvalidResource, SyncError};
use crate::store::LocalStore;

/// Domain-specific half of a sync pass.
#[async_trait]
pub trait SyncFlavor: Send {
    /// Multiget dialect for this domain.
    fn multiget_kind(&self) -> MultigetKind;

    /// File extension assigned to newly uploaded resources.
    fn file_extension(&self) -> &'static str;

    /// Lower bound of the sync window as a UTC timestamp string, when
    /// the domain restricts how far back it syncs.
    fn time_window_start(&self) -> Option<&str> {
        None
    }

    /// Lets the flavor pick up negotiated formats from the collection's
    /// capabilities.
    fn apply_capabilities(&mut self, _caps: &Capabilities) {}

    /// Runs before anything else in the pass; local bookkeeping like
    /// promoting recurrence exceptions to their masters happens here.
    async fn prepare(&mut self, _store: &dyn LocalStore) -> Result<(), SyncError> {
        Ok(())
    }

    /// Enumerates the remote resources this pass should consider.
    async fn list_remote(&self, dav: &DavClient) -> Result<Vec<ResourceRef>, SyncError>;

    /// Parses and validates a downloaded resource body.
    fn parse_resource(&self, data: &str) -> Result<Component, InvalidResource>;

    /// Runs on every downloaded entry before it is saved; membership
    /// extraction and group buffering happen here.
    async fn verify_before_saving(
        &mut self,
        _entry: &mut LocalEntry,
        _store: &dyn LocalStore,
    ) -> Result<(), SyncError> {
        Ok(())
    }

    /// Runs once before local changes are pushed; group reconciliation
    /// marks additional entries dirty here.
    async fn before_upload_dirty(&mut self, _store: &dyn LocalStore) -> Result<(), SyncError> {
        Ok(())
    }

    /// Whether this entry has a server-side resource of its own. Entries
    /// without one are created and deleted locally only.
    fn uploads_entry(&self, _entry: &LocalEntry) -> bool {
        true
    }

    /// Renders the upload body and content type for a dirty entry.
    async fn generate_upload(
        &self,
        entry: &LocalEntry,
        store: &dyn LocalStore,
    ) -> Result<(String, &'static str), SyncError>;

    /// Runs at the end of the pass, after uploads; derived local data
    /// (materialized groups, membership snapshots) is settled here.
    async fn post_process(&mut self, _store: &dyn LocalStore) -> Result<(), SyncError> {
        Ok(())
    }
}
