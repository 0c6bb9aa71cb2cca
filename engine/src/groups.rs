// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Contact group reconciliation strategies.
//!
//! Two representations exist in the wild. `CATEGORIES` keeps membership
//! inside each contact and has no group resources on the server; vCard
//! groups are separate `KIND:group` resources holding `MEMBER` URIs. The
//! strategy owns every membership side effect so the sync pass itself
//! stays representation-agnostic.

use std::collections::{BTreeSet, HashMap};

use syncplus_vobject::{Component, Property};

use crate::entry::LocalEntry;
use crate::error::SyncError;
use crate::settings::GroupMethod;
use crate::store::LocalStore;

/// A group-membership reconciliation strategy.
#[derive(Debug)]
pub enum GroupStrategy {
    /// Membership lives in each contact's `CATEGORIES`. Group rows are
    /// local-only and materialized from the categories in use.
    Categories,
    /// Groups are server-side vCards; membership edits mark the affected
    /// groups dirty instead of the contacts.
    VcardGroups(VcardGroupState),
}

/// Download-time buffer of the vCard-groups strategy.
///
/// Member URIs seen in downloaded group vCards are resolved against the
/// store only after the whole download phase, because members may arrive
/// after their group.
#[derive(Debug, Default)]
pub struct VcardGroupState {
    pending: HashMap<String, Vec<String>>,
}

impl GroupStrategy {
    /// Picks the strategy configured for the account.
    #[must_use]
    pub fn from_method(method: GroupMethod) -> Self {
        match method {
            GroupMethod::Categories => Self::Categories,
            GroupMethod::VcardGroups => Self::VcardGroups(VcardGroupState::default()),
        }
    }

    /// Whether group entries have server-side resources of their own.
    #[must_use]
    pub fn uploads_groups(&self) -> bool {
        matches!(self, Self::VcardGroups(_))
    }

    /// Hook for every downloaded entry, before it is saved.
    pub fn verify_before_saving(&mut self, entry: &mut LocalEntry) {
        match self {
            Self::Categories => {
                if !entry.is_group {
                    let memberships: BTreeSet<String> =
                        entry.payload.categories().into_iter().collect();
                    entry.group_memberships = memberships.clone();
                    entry.cached_memberships = memberships;
                }
            }
            Self::VcardGroups(state) => {
                if entry.is_group {
                    state
                        .pending
                        .insert(entry.uid.clone(), entry.payload.group_member_uids());
                }
            }
        }
    }

    /// Hook before local changes are pushed: translates membership edits
    /// into the right set of dirty entries.
    pub async fn before_upload_dirty(&mut self, store: &dyn LocalStore) -> Result<(), SyncError> {
        match self {
            Self::Categories => categories_before_upload(store).await,
            Self::VcardGroups(_) => vcard_groups_before_upload(store).await,
        }
    }

    /// Hook at the end of the pass: settles derived group data and
    /// refreshes membership snapshots.
    pub async fn post_process(&mut self, store: &dyn LocalStore) -> Result<(), SyncError> {
        match self {
            Self::Categories => categories_post_process(store).await?,
            Self::VcardGroups(state) => {
                let pending = std::mem::take(&mut state.pending);
                vcard_groups_post_process(store, pending).await?;
            }
        }
        refresh_snapshots(store).await
    }
}

/// Category edits propagate to member contacts: a renamed or deleted
/// group means every member must be re-uploaded with its new category
/// set.
async fn categories_before_upload(store: &dyn LocalStore) -> Result<(), SyncError> {
    let entries = store.all().await?;

    for group in entries.iter().filter(|e| e.is_group) {
        if group.deleted {
            tracing::debug!(group = %group.uid, "category group deleted, rewriting members");
            for contact in entries
                .iter()
                .filter(|e| !e.is_group && !e.deleted && e.group_memberships.contains(&group.uid))
            {
                let mut contact = contact.clone();
                contact.group_memberships.remove(&group.uid);
                contact
                    .payload
                    .set_categories(contact.group_memberships.iter().cloned());
                contact.dirty = true;
                store.upsert(contact).await?;
            }
        } else if group.dirty {
            for contact in entries
                .iter()
                .filter(|e| !e.is_group && !e.deleted && e.group_memberships.contains(&group.uid))
            {
                let mut contact = contact.clone();
                contact
                    .payload
                    .set_categories(contact.group_memberships.iter().cloned());
                contact.dirty = true;
                store.upsert(contact).await?;
            }
        }
    }
    Ok(())
}

/// Membership edits under vCard groups dirty the groups, never the
/// contacts: the contact resource on the server does not change when it
/// joins or leaves a group.
async fn vcard_groups_before_upload(store: &dyn LocalStore) -> Result<(), SyncError> {
    let entries = store.all().await?;

    for contact in entries.iter().filter(|e| !e.is_group) {
        let changed = if contact.deleted {
            contact.cached_memberships.clone()
        } else {
            contact.membership_changes()
        };
        for group_uid in changed {
            if entries.iter().any(|e| e.is_group && e.uid == group_uid) {
                tracing::debug!(group = %group_uid, contact = %contact.uid, "membership changed, marking group dirty");
                store.mark_dirty(&group_uid).await?;
            }
        }
    }
    Ok(())
}

/// Materializes a local group row for every category in use and drops
/// rows whose category no longer appears on any contact.
async fn categories_post_process(store: &dyn LocalStore) -> Result<(), SyncError> {
    let entries = store.all().await?;

    let mut in_use: BTreeSet<String> = BTreeSet::new();
    for contact in entries.iter().filter(|e| !e.is_group && !e.deleted) {
        in_use.extend(contact.group_memberships.iter().cloned());
    }

    for name in &in_use {
        if !entries.iter().any(|e| e.is_group && e.uid == *name) {
            tracing::debug!(group = %name, "materializing category group");
            store.upsert(make_category_group(name)).await?;
        }
    }

    for group in entries.iter().filter(|e| e.is_group && !e.dirty) {
        if !in_use.contains(&group.uid) {
            tracing::debug!(group = %group.uid, "removing empty category group");
            store.remove(&group.uid).await?;
        }
    }
    Ok(())
}

/// Resolves the member lists buffered during download against the store
/// and rewrites contact memberships to match the server.
async fn vcard_groups_post_process(
    store: &dyn LocalStore,
    pending: HashMap<String, Vec<String>>,
) -> Result<(), SyncError> {
    for (group_uid, member_uids) in pending {
        let members: BTreeSet<String> = member_uids.into_iter().collect();

        for contact in store.all().await? {
            if contact.is_group || contact.deleted {
                continue;
            }
            let should_belong = members.contains(&contact.uid);
            let belongs = contact.group_memberships.contains(&group_uid);
            if should_belong == belongs {
                continue;
            }
            let mut contact = contact;
            if should_belong {
                contact.group_memberships.insert(group_uid.clone());
                contact.cached_memberships.insert(group_uid.clone());
            } else {
                contact.group_memberships.remove(&group_uid);
                contact.cached_memberships.remove(&group_uid);
            }
            store.upsert(contact).await?;
        }
    }
    Ok(())
}

/// Snapshots of clean contacts follow their current memberships once the
/// pass has settled; dirty contacts keep their old snapshot so the next
/// pass still sees the difference.
async fn refresh_snapshots(store: &dyn LocalStore) -> Result<(), SyncError> {
    for entry in store.all().await? {
        if entry.is_group || entry.dirty || entry.deleted {
            continue;
        }
        if entry.cached_memberships != entry.group_memberships {
            let mut entry = entry;
            entry.cached_memberships = entry.group_memberships.clone();
            store.upsert(entry).await?;
        }
    }
    Ok(())
}

fn make_category_group(name: &str) -> LocalEntry {
    let mut payload = Component::new("VCARD");
    payload.properties.push(Property::new("VERSION", "3.0"));
    payload.properties.push(Property::new("UID", name));
    payload.properties.push(Property::new("FN", name));
    payload
        .properties
        .push(Property::new("X-ADDRESSBOOKSERVER-KIND", "group"));

    let mut entry = LocalEntry::new(name, payload);
    entry.is_group = true;
    entry
}
