// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Calendar (CalDAV) flavor of the sync pass.
//!
//! Recurrence exceptions are stored as rows of their own, keyed
//! `<master-uid>#<recurrence-id>`, but on the wire they travel inside the
//! master's resource. The flavor promotes exception edits to the master
//! and folds exception rows back into the upload body.

use async_trait::async_trait;
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Timestamp};
use syncplus_dav::{DavClient, MultigetKind, ResourceRef};
use syncplus_vobject::Component;

use crate::entry::LocalEntry;
use crate::error::{InvalidResource, SyncError};
use crate::flavor::SyncFlavor;
use crate::settings::AccountSettings;
use crate::store::LocalStore;

const ICAL_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Syncs a calendar collection of VEVENT resources.
pub struct CalendarFlavor {
    window_start: Option<String>,
}

impl CalendarFlavor {
    /// Creates the flavor, resolving the account's past-days limit into a
    /// UTC window start.
    #[must_use]
    pub fn new(settings: &AccountSettings) -> Self {
        Self {
            window_start: settings.time_range_past_days.and_then(past_window_start),
        }
    }
}

/// Formats "now minus N days" the way `time-range` filters expect.
fn past_window_start(days: u32) -> Option<String> {
    let back = SignedDuration::from_hours(i64::from(days) * 24);
    let start = Timestamp::now().checked_sub(back).ok()?;
    Some(
        start
            .to_zoned(TimeZone::UTC)
            .strftime("%Y%m%dT%H%M%SZ")
            .to_string(),
    )
}

/// Whether a store key names an exception row rather than a master.
fn is_exception_key(uid: &str) -> bool {
    uid.contains('#')
}

fn master_of(uid: &str) -> Option<&str> {
    uid.split_once('#').map(|(master, _)| master)
}

fn recurrence_id(event: &Component) -> Option<String> {
    event.property("RECURRENCE-ID").map(|p| p.text())
}

#[async_trait]
impl SyncFlavor for CalendarFlavor {
    fn multiget_kind(&self) -> MultigetKind {
        MultigetKind::Calendar
    }

    fn file_extension(&self) -> &'static str {
        ".ics"
    }

    fn time_window_start(&self) -> Option<&str> {
        self.window_start.as_deref()
    }

    /// Any edited or deleted exception row makes its master dirty, so the
    /// whole resource is re-uploaded.
    async fn prepare(&mut self, store: &dyn LocalStore) -> Result<(), SyncError> {
        let entries = store.all().await?;
        for entry in &entries {
            if !(entry.dirty || entry.deleted) {
                continue;
            }
            let Some(master_uid) = master_of(&entry.uid) else {
                continue;
            };
            if entries.iter().any(|e| e.uid == master_uid && !e.deleted) {
                tracing::debug!(master = master_uid, exception = %entry.uid, "exception changed, marking master dirty");
                store.mark_dirty(master_uid).await?;
            }
        }
        Ok(())
    }

    async fn list_remote(&self, dav: &DavClient) -> Result<Vec<ResourceRef>, SyncError> {
        match &self.window_start {
            Some(start) => Ok(dav.calendar_query(start, None).await?),
            None => Ok(dav.list_resources().await?),
        }
    }

    fn parse_resource(&self, data: &str) -> Result<Component, InvalidResource> {
        let components =
            syncplus_vobject::parse(data).map_err(|e| InvalidResource(e.to_string()))?;
        components
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case("VCALENDAR"))
            .ok_or_else(|| InvalidResource("no VCALENDAR component".to_string()))
    }

    fn uploads_entry(&self, entry: &LocalEntry) -> bool {
        !is_exception_key(&entry.uid)
    }

    /// Folds exception rows into the master's VCALENDAR. An exception row
    /// replaces an embedded VEVENT with the same RECURRENCE-ID.
    async fn generate_upload(
        &self,
        entry: &LocalEntry,
        store: &dyn LocalStore,
    ) -> Result<(String, &'static str), SyncError> {
        let mut payload = entry.payload.clone();
        let prefix = format!("{}#", entry.uid);

        for row in store.all().await? {
            if row.deleted || !row.uid.starts_with(&prefix) {
                continue;
            }
            for event in row
                .payload
                .components
                .iter()
                .filter(|c| c.name.eq_ignore_ascii_case("VEVENT"))
            {
                if let Some(rid) = recurrence_id(event) {
                    payload
                        .components
                        .retain(|c| recurrence_id(c).as_deref() != Some(rid.as_str()));
                }
                payload.components.push(event.clone());
            }
        }

        Ok((syncplus_vobject::write(&payload), ICAL_CONTENT_TYPE))
    }
}
