// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Account-level sync entry point.
//!
//! Bridges a platform sync request ("sync account X, authority Y") to a
//! sequence of per-collection passes: claims the registry slot, brings
//! the set of local stores in line with the enabled collections, and
//! runs the passes in priority order.

use std::sync::Arc;

use async_trait::async_trait;
use syncplus_dav::{AuthMethod, DavClient, DavConfig, Href};

use crate::calendar::CalendarFlavor;
use crate::contacts::ContactsFlavor;
use crate::error::SyncError;
use crate::flavor::SyncFlavor;
use crate::manager::{InvalidResourceCallback, SyncManager, SyncStats};
use crate::registry::{CancelToken, SyncKey, SyncRegistry};
use crate::settings::{
    Account, AccountSettings, Authority, Collection, CollectionId, CollectionKind, SyncExtras,
};
use crate::store::LocalStore;

/// Creates, lists and removes the local stores backing collections.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    /// All stores currently existing for the account and authority.
    async fn stores(
        &self,
        account: &Account,
        authority: Authority,
    ) -> Result<Vec<Arc<dyn LocalStore>>, SyncError>;

    /// Creates the store for a newly enabled collection.
    async fn create_store(
        &self,
        account: &Account,
        collection: &Collection,
    ) -> Result<Arc<dyn LocalStore>, SyncError>;

    /// Removes the store (and its local data) of a collection that is no
    /// longer synced.
    async fn delete_store(
        &self,
        account: &Account,
        collection: &CollectionId,
    ) -> Result<(), SyncError>;
}

/// What one account-level invocation did.
#[derive(Debug)]
pub struct AccountSyncOutcome {
    /// False when the run was refused (already running or paused).
    pub ran: bool,
    /// Per-collection results, in execution order.
    pub results: Vec<(CollectionId, Result<SyncStats, SyncError>)>,
}

/// Invoked when the server rejects the account's credentials, so the
/// platform can prompt for a new login.
pub type UnauthorizedCallback = Arc<dyn Fn(&Account) + Send + Sync>;

/// Runs account-level sync requests.
pub struct SyncService {
    registry: Arc<SyncRegistry>,
    base_url: String,
    auth: AuthMethod,
    settings: AccountSettings,
    on_unauthorized: Option<UnauthorizedCallback>,
    on_invalid_resource: Option<InvalidResourceCallback>,
}

impl SyncService {
    /// Creates a service for one account's server and credentials.
    #[must_use]
    pub fn new(
        registry: Arc<SyncRegistry>,
        base_url: impl Into<String>,
        auth: AuthMethod,
        settings: AccountSettings,
    ) -> Self {
        Self {
            registry,
            base_url: base_url.into(),
            auth,
            settings,
            on_unauthorized: None,
            on_invalid_resource: None,
        }
    }

    /// Registers the bad-credentials callback.
    #[must_use]
    pub fn with_unauthorized_callback(mut self, callback: UnauthorizedCallback) -> Self {
        self.on_unauthorized = Some(callback);
        self
    }

    /// Registers the invalid-resource callback passed to every pass.
    #[must_use]
    pub fn with_invalid_resource_callback(mut self, callback: Arc<dyn Fn(&Href) + Send + Sync>) -> Self {
        self.on_invalid_resource = Some(callback);
        self
    }

    /// Syncs every enabled collection of `authority`, sequentially.
    ///
    /// Failures of one collection are recorded and the next collection
    /// still runs, except bad credentials and cancellation, which abort
    /// the rest of the batch.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store provider fails; everything
    /// else is reported per collection in the outcome.
    #[tracing::instrument(skip_all, fields(account = %account.name, ?authority))]
    pub async fn sync_account(
        &self,
        account: &Account,
        authority: Authority,
        extras: &SyncExtras,
        provider: &dyn StoreProvider,
        collections: &[Collection],
    ) -> Result<AccountSyncOutcome, SyncError> {
        let key = SyncKey::new(account, authority);
        let Some(guard) = self.registry.try_begin(key) else {
            tracing::info!("sync already running or paused, skipping");
            return Ok(AccountSyncOutcome {
                ran: false,
                results: Vec::new(),
            });
        };

        let enabled: Vec<&Collection> = collections
            .iter()
            .filter(|c| c.sync_enabled && c.kind.authority() == authority)
            .collect();

        let mut stores = provider.stores(account, authority).await?;

        // Stores of disabled or removed collections go away, enabled
        // collections without a store get one.
        let mut kept = Vec::with_capacity(stores.len());
        for store in stores.drain(..) {
            let id = store.collection().id.clone();
            if enabled.iter().any(|c| c.id == id) {
                kept.push(store);
            } else {
                tracing::info!(collection = %id, "collection no longer synced, deleting local store");
                provider.delete_store(account, &id).await?;
            }
        }
        for collection in &enabled {
            if !kept.iter().any(|s| s.collection().id == collection.id) {
                kept.push(provider.create_store(account, collection).await?);
            }
        }

        kept.sort_by_key(|store| {
            extras
                .priority_collections
                .iter()
                .position(|id| *id == store.collection().id)
                .unwrap_or(usize::MAX)
        });

        let mut results = Vec::with_capacity(kept.len());
        for store in kept {
            let Some(collection) = enabled.iter().find(|c| c.id == store.collection().id) else {
                continue;
            };
            let id = collection.id.clone();

            let outcome = self
                .run_collection(collection, store, extras, guard.token())
                .await;
            let abort = matches!(
                outcome,
                Err(SyncError::Unauthorized | SyncError::Cancelled)
            );
            match &outcome {
                Ok(stats) => tracing::info!(collection = %id, ?stats, "collection synced"),
                Err(SyncError::Unauthorized) => {
                    tracing::error!(collection = %id, "credentials rejected, aborting account sync");
                    if let Some(callback) = &self.on_unauthorized {
                        callback(account);
                    }
                }
                Err(SyncError::Cancelled) => tracing::info!(collection = %id, "sync cancelled"),
                Err(e) => tracing::error!(collection = %id, error = %e, "collection sync failed"),
            }
            results.push((id, outcome));
            if abort {
                break;
            }
        }

        Ok(AccountSyncOutcome { ran: true, results })
    }

    async fn run_collection(
        &self,
        collection: &Collection,
        store: Arc<dyn LocalStore>,
        extras: &SyncExtras,
        cancel: CancelToken,
    ) -> Result<SyncStats, SyncError> {
        let config = DavConfig {
            base_url: self.base_url.clone(),
            collection_path: collection.path.clone(),
            auth: self.auth.clone(),
            ..Default::default()
        };
        let dav = DavClient::new(config)?;

        let flavor: Box<dyn SyncFlavor> = match collection.kind {
            CollectionKind::Calendar | CollectionKind::WebCal => {
                Box::new(CalendarFlavor::new(&self.settings))
            }
            CollectionKind::AddressBook => Box::new(ContactsFlavor::new(&self.settings)),
        };

        let mut manager = SyncManager::new(dav, store, flavor, cancel);
        if let Some(callback) = &self.on_invalid_resource {
            manager = manager.with_invalid_resource_callback(Arc::clone(callback));
        }
        manager.perform_sync(extras).await
    }
}
