// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::ops::Deref;

/// Resource href (path).
///
/// A `Href` represents the path to a resource on a DAV server, such as
/// `/dav/addressbooks/user/default/contact1.vcf`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Href(String);

impl Href {
    /// Creates a new `Href` from a string.
    #[must_use]
    pub const fn new(href: String) -> Self {
        Self(href)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last path segment (the resource file name).
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
    }
}

impl Deref for Href {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Href {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Href {
    fn from(href: String) -> Self {
        Self(href)
    }
}

impl From<&str> for Href {
    fn from(href: &str) -> Self {
        Self(href.to_string())
    }
}

/// Entity tag for change detection.
///
/// An `ETag` represents an entity tag returned by the server, used for
/// optimistic concurrency control and change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ETag(String);

impl ETag {
    /// Creates a new `ETag` from a string.
    #[must_use]
    pub const fn new(etag: String) -> Self {
        Self(etag)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ETag {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ETag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ETag {
    fn from(etag: String) -> Self {
        Self(etag)
    }
}

impl From<&str> for ETag {
    fn from(etag: &str) -> Self {
        Self(etag.to_string())
    }
}

/// A remote resource reference from a listing: href plus its current `ETag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    /// The href of the resource.
    pub href: Href,
    /// The entity tag, if the server reported one.
    pub etag: Option<ETag>,
}

/// A resource fetched via multiget.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// The href of the resource.
    pub href: Href,
    /// The entity tag, if the server reported one.
    pub etag: Option<ETag>,
    /// `CALDAV:schedule-tag` (RFC 6638), if the server reported one.
    pub schedule_tag: Option<String>,
    /// The payload (iCalendar or vCard text), if the item succeeded.
    pub data: Option<String>,
    /// Whether the multistatus item reported a 2xx status.
    pub status_ok: bool,
}

/// Headers the server reported back from a PUT.
#[derive(Debug, Clone, Default)]
pub struct PutResponse {
    /// The new entity tag; when absent, callers re-fetch to learn it.
    pub etag: Option<ETag>,
    /// `Schedule-Tag` (RFC 6638), sent by scheduling-aware calendar
    /// servers.
    pub schedule_tag: Option<String>,
}

/// A resource fetched with a plain GET.
#[derive(Debug, Clone)]
pub struct GetResponse {
    /// The current entity tag.
    pub etag: ETag,
    /// `Schedule-Tag` (RFC 6638), if the server reported one.
    pub schedule_tag: Option<String>,
    /// The resource body.
    pub data: String,
}

/// Which multiget REPORT dialect to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultigetKind {
    /// `C:calendar-multiget` with `C:calendar-data`.
    Calendar,
    /// `CARD:addressbook-multiget` with `CARD:address-data`.
    AddressBook,
}

/// vCard wire format, in server-preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VCardVersion {
    /// jCard (RFC 7095), `application/vcard+json`.
    JCard,
    /// vCard 4.0, `text/vcard; version=4.0`.
    V4,
    /// vCard 3.0, `text/vcard`.
    V3,
}

impl VCardVersion {
    /// Content type sent with PUT requests for this version.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::JCard => "application/vcard+json",
            Self::V4 => "text/vcard; version=4.0; charset=utf-8",
            Self::V3 => "text/vcard; charset=utf-8",
        }
    }

    /// Picks the best supported version: jCard > vCard 4 > vCard 3.
    ///
    /// Falls back to vCard 3 when the list is empty, the baseline every
    /// CardDAV server must accept.
    #[must_use]
    pub fn negotiate(supported: &[Self]) -> Self {
        for preferred in [Self::JCard, Self::V4, Self::V3] {
            if supported.contains(&preferred) {
                return preferred;
            }
        }
        Self::V3
    }
}

/// Collection capabilities discovered via a depth-0 PROPFIND.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    /// Whether the server advertises the RFC 6578 `sync-collection` REPORT.
    pub supports_sync_collection: bool,
    /// Collection tag (calendarserver.org `getctag`), if reported.
    pub ctag: Option<String>,
    /// Current sync token (RFC 6578), if reported.
    pub sync_token: Option<String>,
    /// Whether the server denies write privileges on this collection.
    pub read_only: bool,
    /// vCard formats the server accepts (CardDAV only; empty for calendars).
    pub vcard_versions: Vec<VCardVersion>,
    /// Display name of the collection.
    pub display_name: Option<String>,
}

/// Result of an RFC 6578 `sync-collection` REPORT.
#[derive(Debug, Clone, Default)]
pub struct SyncCollectionResult {
    /// Resources added or changed since the supplied token.
    pub changed: Vec<ResourceRef>,
    /// Resources removed since the supplied token.
    pub removed: Vec<Href>,
    /// The token to persist for the next delta.
    pub new_token: Option<String>,
    /// Whether the server truncated the listing (HTTP 507 member); the
    /// caller must resume from `new_token` instead of assuming completeness.
    pub truncated: bool,
}
