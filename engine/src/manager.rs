// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! The sync pass: one run of the ETag-based reconciliation loop for one
//! collection.

use std::collections::HashSet;
use std::sync::Arc;

use syncplus_dav::{DavClient, DavError, Href, PutPrecondition, SyncCollectionResult};

use crate::error::SyncError;
use crate::flavor::SyncFlavor;
use crate::registry::CancelToken;
use crate::settings::SyncExtras;
use crate::state::{SyncState, SyncTokenKind};
use crate::store::LocalStore;

/// Invoked for every downloaded resource the engine had to skip, so the
/// platform can surface it to the user.
pub type InvalidResourceCallback = Arc<dyn Fn(&Href) + Send + Sync>;

/// Counters of one completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Resources downloaded and saved locally.
    pub downloaded: usize,
    /// Entries uploaded.
    pub uploaded: usize,
    /// Entries removed locally because they vanished remotely.
    pub deleted_local: usize,
    /// Remote resources deleted for local tombstones.
    pub deleted_remote: usize,
    /// Local changes reverted on a read-only collection.
    pub reverted: usize,
    /// Downloaded resources skipped as unusable.
    pub skipped_invalid: usize,
}

/// How the remote listing is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAlgorithm {
    /// Full listing via PROPFIND (or a time-ranged REPORT), diffed by
    /// `ETag`.
    PropfindReport,
    /// RFC 6578 delta walk.
    CollectionSync,
}

/// A time window forces the listing algorithm: delta walks cannot express
/// "events after X".
#[must_use]
pub fn choose_algorithm(has_time_window: bool, supports_sync_collection: bool) -> SyncAlgorithm {
    if has_time_window || !supports_sync_collection {
        SyncAlgorithm::PropfindReport
    } else {
        SyncAlgorithm::CollectionSync
    }
}

enum Listing {
    Full(Vec<syncplus_dav::ResourceRef>),
    Delta(SyncCollectionResult),
}

/// Runs sync passes for one collection.
pub struct SyncManager {
    dav: DavClient,
    store: Arc<dyn LocalStore>,
    flavor: Box<dyn SyncFlavor>,
    cancel: CancelToken,
    on_invalid_resource: Option<InvalidResourceCallback>,
}

impl SyncManager {
    /// Creates a manager for one collection.
    #[must_use]
    pub fn new(
        dav: DavClient,
        store: Arc<dyn LocalStore>,
        flavor: Box<dyn SyncFlavor>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            dav,
            store,
            flavor,
            cancel,
            on_invalid_resource: None,
        }
    }

    /// Registers the invalid-resource callback.
    #[must_use]
    pub fn with_invalid_resource_callback(mut self, callback: InvalidResourceCallback) -> Self {
        self.on_invalid_resource = Some(callback);
        self
    }

    /// Runs one sync pass.
    ///
    /// # Errors
    ///
    /// Returns an error when the pass as a whole cannot continue; see
    /// [`SyncError`] for the taxonomy. Per-resource problems are contained
    /// and show up in the returned [`SyncStats`] instead.
    #[tracing::instrument(skip_all, fields(collection = %self.store.collection().id))]
    pub async fn perform_sync(&mut self, extras: &SyncExtras) -> Result<SyncStats, SyncError> {
        let mut stats = SyncStats::default();
        let store = Arc::clone(&self.store);

        self.ensure_active()?;
        self.flavor.prepare(store.as_ref()).await?;

        let caps = self.dav.query_capabilities().await?;
        self.flavor.apply_capabilities(&caps);
        let read_only = store.collection().read_only || caps.read_only;

        let previous_state = store.read_sync_state().await?;
        let algorithm = choose_algorithm(
            self.flavor.time_window_start().is_some(),
            caps.supports_sync_collection,
        );
        tracing::debug!(?algorithm, read_only, "starting sync pass");

        self.ensure_active()?;
        let listing = self.list_remote(algorithm, extras, previous_state.as_ref()).await?;

        let mut to_download: Vec<Href> = Vec::new();
        let mut next_state: Option<SyncState> = None;
        let mut initial_sync_pending = false;

        match &listing {
            Listing::Full(refs) => {
                let mut remote_names = HashSet::new();
                for resource in refs {
                    let name = resource.href.file_name().to_string();
                    remote_names.insert(name.clone());
                    let changed = match store.find_by_file_name(&name).await? {
                        None => true,
                        Some(local) => match (&local.etag, &resource.etag) {
                            (Some(ours), Some(theirs)) => ours != theirs,
                            _ => true,
                        },
                    };
                    if changed || extras.full_resync {
                        to_download.push(resource.href.clone());
                    }
                }

                // Entries once confirmed remote but absent from the
                // listing were deleted on the server.
                for entry in store.all().await? {
                    if !entry.remotely_present || entry.deleted {
                        continue;
                    }
                    let Some(name) = &entry.file_name else { continue };
                    if !remote_names.contains(name) {
                        tracing::debug!(uid = %entry.uid, "deleted on server, removing locally");
                        store.remove(&entry.uid).await?;
                        stats.deleted_local += 1;
                    }
                }

                next_state = if caps.supports_sync_collection
                    && self.flavor.time_window_start().is_none()
                {
                    caps.sync_token.clone().map(SyncState::sync_token)
                } else {
                    caps.ctag.clone().map(SyncState::ctag)
                };
            }
            Listing::Delta(delta) => {
                for href in &delta.removed {
                    if let Some(entry) = store.find_by_file_name(href.file_name()).await? {
                        store.remove(&entry.uid).await?;
                        stats.deleted_local += 1;
                    }
                }
                for resource in &delta.changed {
                    let name = resource.href.file_name();
                    let changed = match store.find_by_file_name(name).await? {
                        None => true,
                        Some(local) => match (&local.etag, &resource.etag) {
                            (Some(ours), Some(theirs)) => ours != theirs,
                            _ => true,
                        },
                    };
                    if changed {
                        to_download.push(resource.href.clone());
                    }
                }
                initial_sync_pending = delta.truncated;
                next_state = delta.new_token.clone().map(SyncState::sync_token);
            }
        }

        self.ensure_active()?;
        self.download(&to_download, &mut stats).await?;

        // A truncated delta is persisted and continued on the next pass;
        // touching local changes now would race the incomplete listing.
        if initial_sync_pending {
            if let Some(mut state) = next_state {
                state.initial_sync = true;
                store.write_sync_state(Some(&state)).await?;
            }
            tracing::info!(?stats, "delta listing truncated, continuing next pass");
            return Ok(stats);
        }

        self.ensure_active()?;
        let mut forget_token = false;
        if !read_only {
            self.flavor.before_upload_dirty(store.as_ref()).await?;
        }
        self.process_locally_deleted(read_only, &mut forget_token, &mut stats)
            .await?;
        self.upload_dirty(read_only, &mut forget_token, &mut stats)
            .await?;

        self.flavor.post_process(store.as_ref()).await?;

        if forget_token {
            // Reverted changes mean our view no longer matches any token
            // the server handed out; the next pass re-lists everything.
            store.write_sync_state(None).await?;
        } else if let Some(state) = next_state {
            store.write_sync_state(Some(&state)).await?;
        } else {
            store.write_sync_state(previous_state.as_ref()).await?;
        }

        tracing::info!(?stats, "sync pass finished");
        Ok(stats)
    }

    async fn list_remote(
        &mut self,
        algorithm: SyncAlgorithm,
        extras: &SyncExtras,
        previous_state: Option<&SyncState>,
    ) -> Result<Listing, SyncError> {
        if algorithm == SyncAlgorithm::CollectionSync && !extras.resync && !extras.full_resync {
            let token = previous_state
                .filter(|s| s.kind == SyncTokenKind::SyncToken)
                .map(|s| s.value.clone());
            match self.dav.sync_collection(token.as_deref()).await {
                Ok(delta) => return Ok(Listing::Delta(delta)),
                Err(DavError::SyncTokenInvalid) => {
                    tracing::info!("sync token rejected, falling back to full listing");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Listing::Full(self.flavor.list_remote(&self.dav).await?))
    }

    async fn download(&mut self, hrefs: &[Href], stats: &mut SyncStats) -> Result<(), SyncError> {
        if hrefs.is_empty() {
            return Ok(());
        }
        let store = Arc::clone(&self.store);
        let fetched = self.dav.multiget(hrefs, self.flavor.multiget_kind()).await?;

        for item in fetched {
            if !item.status_ok {
                tracing::warn!(href = %item.href, "multiget item failed, skipping");
                continue;
            }
            let Some(data) = item.data else {
                tracing::warn!(href = %item.href, "multiget item without body, skipping");
                continue;
            };
            // Saving without an ETag would make the entry look dirty or
            // changed forever; better to abort and retry the whole pass.
            let Some(etag) = item.etag else {
                return Err(SyncError::Protocol(format!(
                    "multiget item {} without ETag",
                    item.href
                )));
            };

            let payload = match self.flavor.parse_resource(&data) {
                Ok(payload) => payload,
                Err(err) => {
                    self.skip_invalid(&item.href, &err.to_string(), stats);
                    continue;
                }
            };
            let Some(uid) = payload.uid() else {
                self.skip_invalid(&item.href, "resource without UID", stats);
                continue;
            };

            let name = item.href.file_name().to_string();
            let mut entry = match store.find_by_file_name(&name).await? {
                Some(existing) => existing,
                None => match store.find_by_uid(&uid).await? {
                    Some(existing) => existing,
                    None => crate::entry::LocalEntry::new(uid.clone(), payload.clone()),
                },
            };

            entry.payload = payload;
            entry.file_name = Some(name);
            entry.etag = Some(etag);
            entry.schedule_tag = item.schedule_tag;
            entry.dirty = false;
            entry.deleted = false;
            entry.remotely_present = true;

            self.flavor
                .verify_before_saving(&mut entry, store.as_ref())
                .await?;
            store.upsert(entry).await?;
            stats.downloaded += 1;
        }
        Ok(())
    }

    async fn process_locally_deleted(
        &mut self,
        read_only: bool,
        forget_token: &mut bool,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let store = Arc::clone(&self.store);

        for entry in store.deleted().await? {
            self.ensure_active()?;

            if read_only {
                tracing::warn!(uid = %entry.uid, "deletion on read-only collection, restoring");
                store.undelete(&entry.uid).await?;
                *forget_token = true;
                stats.reverted += 1;
                continue;
            }

            if !self.flavor.uploads_entry(&entry) {
                store.remove(&entry.uid).await?;
                continue;
            }

            let mut removed_remote = false;
            if entry.remotely_present {
                if let Some(name) = &entry.file_name {
                    let href = self.member_href(name);
                    match self.dav.delete(&href, entry.etag.as_ref()).await {
                        Ok(()) | Err(DavError::NotFound(_)) => removed_remote = true,
                        Err(DavError::PreconditionFailed(_)) => {
                            // The resource changed remotely since the local
                            // deletion; the next download decides its fate.
                            tracing::warn!(uid = %entry.uid, "remote changed under local deletion, keeping tombstone");
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            store.remove(&entry.uid).await?;
            if removed_remote {
                stats.deleted_remote += 1;
            }
        }
        Ok(())
    }

    async fn upload_dirty(
        &mut self,
        read_only: bool,
        forget_token: &mut bool,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let store = Arc::clone(&self.store);

        for entry in store.dirty().await? {
            self.ensure_active()?;

            if entry.deleted {
                continue;
            }

            if read_only {
                tracing::warn!(uid = %entry.uid, "local change on read-only collection, reverting");
                if entry.remotely_present {
                    // Dropping the ETag forces a re-download of the server
                    // version on the next pass.
                    let mut entry = entry;
                    entry.dirty = false;
                    entry.etag = None;
                    entry.schedule_tag = None;
                    store.upsert(entry).await?;
                } else {
                    store.remove(&entry.uid).await?;
                }
                *forget_token = true;
                stats.reverted += 1;
                continue;
            }

            if !self.flavor.uploads_entry(&entry) {
                let mut entry = entry;
                entry.dirty = false;
                entry.cached_memberships = entry.group_memberships.clone();
                store.upsert(entry).await?;
                continue;
            }

            let mut entry = entry;
            let name = match entry.file_name.clone() {
                Some(name) => name,
                None => {
                    let name = generate_file_name(&entry.uid, self.flavor.file_extension());
                    entry.file_name = Some(name.clone());
                    name
                }
            };
            let href = self.member_href(&name);

            let (body, content_type) = self.flavor.generate_upload(&entry, store.as_ref()).await?;
            let precondition = match &entry.etag {
                Some(etag) => PutPrecondition::IfMatch(etag.clone()),
                None => PutPrecondition::IfNoneMatchAny,
            };

            let (etag, schedule_tag) =
                match self.dav.put(&href, body, content_type, &precondition).await {
                    Ok(put) => match put.etag {
                        Some(etag) => (etag, put.schedule_tag),
                        None => {
                            let fetched = self.dav.get(&href).await?;
                            (fetched.etag, put.schedule_tag.or(fetched.schedule_tag))
                        }
                    },
                    Err(DavError::PreconditionFailed(_)) => {
                        // Conflict: the server version wins, the local edit
                        // stays dirty and is retried after the next download.
                        tracing::warn!(uid = %entry.uid, "upload conflict, deferring to next pass");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };

            entry.etag = Some(etag);
            entry.schedule_tag = schedule_tag;
            entry.dirty = false;
            entry.remotely_present = true;
            entry.cached_memberships = entry.group_memberships.clone();
            store.upsert(entry).await?;
            stats.uploaded += 1;
        }
        Ok(())
    }

    fn skip_invalid(&self, href: &Href, reason: &str, stats: &mut SyncStats) {
        tracing::warn!(href = %href, reason, "skipping invalid resource");
        stats.skipped_invalid += 1;
        if let Some(callback) = &self.on_invalid_resource {
            callback(href);
        }
    }

    fn member_href(&self, name: &str) -> Href {
        let collection = self.dav.collection_href().trim_end_matches('/');
        Href::from(format!("{collection}/{name}"))
    }

    fn ensure_active(&self) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }
}

/// File names derive from the UID, with anything URL-hostile replaced.
fn generate_file_name(uid: &str, extension: &str) -> String {
    let safe: String = uid
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let base = if safe.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        safe
    };
    format!("{base}{extension}")
}
