// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Contact (CardDAV) flavor of the sync pass.

use async_trait::async_trait;
use syncplus_dav::{Capabilities, DavClient, MultigetKind, ResourceRef, VCardVersion};
use syncplus_vobject::Component;

use crate::entry::LocalEntry;
use crate::error::{InvalidResource, SyncError};
use crate::flavor::SyncFlavor;
use crate::groups::GroupStrategy;
use crate::settings::AccountSettings;
use crate::store::LocalStore;

/// Syncs an address book: vCard parsing, version negotiation and group
/// reconciliation via the configured [`GroupStrategy`].
pub struct ContactsFlavor {
    strategy: GroupStrategy,
    version: VCardVersion,
}

impl ContactsFlavor {
    /// Creates the flavor for the account's group method. The upload
    /// format starts at the vCard 3 baseline until capabilities are known.
    #[must_use]
    pub fn new(settings: &AccountSettings) -> Self {
        Self {
            strategy: GroupStrategy::from_method(settings.group_method),
            version: VCardVersion::V3,
        }
    }

    /// The negotiated upload format.
    #[must_use]
    pub fn version(&self) -> VCardVersion {
        self.version
    }
}

#[async_trait]
impl SyncFlavor for ContactsFlavor {
    fn multiget_kind(&self) -> MultigetKind {
        MultigetKind::AddressBook
    }

    fn file_extension(&self) -> &'static str {
        ".vcf"
    }

    fn apply_capabilities(&mut self, caps: &Capabilities) {
        self.version = VCardVersion::negotiate(&caps.vcard_versions);
        tracing::debug!(version = ?self.version, "negotiated vCard format");
    }

    async fn list_remote(&self, dav: &DavClient) -> Result<Vec<ResourceRef>, SyncError> {
        Ok(dav.list_resources().await?)
    }

    fn parse_resource(&self, data: &str) -> Result<Component, InvalidResource> {
        let components =
            syncplus_vobject::parse(data).map_err(|e| InvalidResource(e.to_string()))?;
        components
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case("VCARD"))
            .ok_or_else(|| InvalidResource("no VCARD component".to_string()))
    }

    async fn verify_before_saving(
        &mut self,
        entry: &mut LocalEntry,
        _store: &dyn LocalStore,
    ) -> Result<(), SyncError> {
        entry.is_group = entry.payload.is_group();
        self.strategy.verify_before_saving(entry);
        Ok(())
    }

    async fn before_upload_dirty(&mut self, store: &dyn LocalStore) -> Result<(), SyncError> {
        self.strategy.before_upload_dirty(store).await
    }

    fn uploads_entry(&self, entry: &LocalEntry) -> bool {
        if entry.is_group {
            self.strategy.uploads_groups()
        } else {
            true
        }
    }

    async fn generate_upload(
        &self,
        entry: &LocalEntry,
        store: &dyn LocalStore,
    ) -> Result<(String, &'static str), SyncError> {
        let mut payload = entry.payload.clone();

        if entry.is_group {
            // The member list on the wire always reflects the current
            // local memberships, not whatever the payload last held.
            let members: Vec<String> = store
                .all()
                .await?
                .into_iter()
                .filter(|c| {
                    !c.is_group && !c.deleted && c.group_memberships.contains(&entry.uid)
                })
                .map(|c| c.uid)
                .collect();
            let vcard4 = self.version != VCardVersion::V3;
            payload.set_group_member_uids(&members, vcard4);
        }

        let body = match self.version {
            VCardVersion::JCard => {
                payload.set_version("4.0");
                serde_json::to_string(&syncplus_vobject::write_jcard(&payload))
                    .map_err(|e| SyncError::Protocol(format!("jCard serialization: {e}")))?
            }
            VCardVersion::V4 => {
                payload.set_version("4.0");
                syncplus_vobject::write(&payload)
            }
            VCardVersion::V3 => {
                payload.set_version("3.0");
                syncplus_vobject::write(&payload)
            }
        };
        Ok((body, self.version.content_type()))
    }

    async fn post_process(&mut self, store: &dyn LocalStore) -> Result<(), SyncError> {
        self.strategy.post_process(store).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Collection, CollectionKind, GroupMethod};
    use crate::store::MemoryStore;

    fn flavor(method: GroupMethod) -> ContactsFlavor {
        ContactsFlavor::new(&AccountSettings {
            group_method: method,
            time_range_past_days: None,
        })
    }

    fn book() -> MemoryStore {
        MemoryStore::new(Collection::new(
            "book-1",
            "/dav/book/",
            CollectionKind::AddressBook,
        ))
    }

    fn entry(data: &str) -> LocalEntry {
        let payload = syncplus_vobject::parse(data).unwrap().remove(0);
        let uid = payload.uid().unwrap();
        LocalEntry::new(uid, payload)
    }

    #[test]
    fn rejects_non_vcard_payloads() {
        let flavor = flavor(GroupMethod::Categories);
        assert!(flavor.parse_resource("BEGIN:VCARD\r\nUID:a\r\nEND:VCARD\r\n").is_ok());
        assert!(flavor
            .parse_resource("BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n")
            .is_err());
        assert!(flavor.parse_resource("garbage").is_err());
    }

    #[test]
    fn category_groups_are_never_uploaded() {
        let flavor = flavor(GroupMethod::Categories);
        let mut group = entry("BEGIN:VCARD\r\nVERSION:3.0\r\nUID:g\r\nFN:G\r\nX-ADDRESSBOOKSERVER-KIND:group\r\nEND:VCARD\r\n");
        group.is_group = true;
        assert!(!flavor.uploads_entry(&group));
        assert!(self::flavor(GroupMethod::VcardGroups).uploads_entry(&group));
    }

    #[tokio::test]
    async fn group_upload_rewrites_member_list_from_store() {
        let store = book();
        let mut member = entry("BEGIN:VCARD\r\nVERSION:3.0\r\nUID:alice\r\nFN:Alice\r\nEND:VCARD\r\n");
        member.group_memberships = ["g".to_string()].into();
        store.seed(member);

        let mut group = entry("BEGIN:VCARD\r\nVERSION:3.0\r\nUID:g\r\nFN:G\r\nX-ADDRESSBOOKSERVER-KIND:group\r\nX-ADDRESSBOOKSERVER-MEMBER:urn:uuid:stale\r\nEND:VCARD\r\n");
        group.is_group = true;

        let flavor = flavor(GroupMethod::VcardGroups);
        let (body, _) = flavor.generate_upload(&group, &store).await.unwrap();
        assert!(body.contains("urn:uuid:alice"));
        assert!(!body.contains("urn:uuid:stale"));
    }

    #[tokio::test]
    async fn jcard_negotiation_changes_body_format() {
        let store = book();
        let contact = entry("BEGIN:VCARD\r\nVERSION:3.0\r\nUID:a\r\nFN:A\r\nEND:VCARD\r\n");

        let mut flavor = flavor(GroupMethod::Categories);
        flavor.apply_capabilities(&Capabilities {
            vcard_versions: vec![VCardVersion::V3, VCardVersion::JCard],
            ..Capabilities::default()
        });
        assert_eq!(flavor.version(), VCardVersion::JCard);

        let (body, content_type) = flavor.generate_upload(&contact, &store).await.unwrap();
        assert_eq!(content_type, "application/vcard+json");
        assert!(body.starts_with("[\"vcard\""));
        assert!(body.contains("\"4.0\""));
    }
}
