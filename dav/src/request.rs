// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Request builders for WebDAV/CalDAV/CardDAV operations.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::DavError;
use crate::types::MultigetKind;
use crate::xml::ns;

/// Namespace prefixes declared on every request root element.
fn declare_namespaces(root: &mut BytesStart) {
    root.push_attribute(("xmlns:D", ns::DAV));
    root.push_attribute(("xmlns:C", ns::CALDAV));
    root.push_attribute(("xmlns:CARD", ns::CARDDAV));
    root.push_attribute(("xmlns:CS", ns::CALENDARSERVER));
}

fn into_xml(writer: Writer<Cursor<Vec<u8>>>) -> Result<String, DavError> {
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| DavError::Xml(format!("UTF-8 error: {e}")))
}

fn write_empty(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str) -> Result<(), DavError> {
    writer.write_event(Event::Empty(BytesStart::new(name)))?;
    Ok(())
}

/// PROPFIND request builder.
#[derive(Debug)]
pub struct PropFindRequest {
    props: Vec<Prop>,
}

/// Properties to request in PROPFIND.
#[derive(Debug, Clone, Copy)]
pub enum Prop {
    /// Display name.
    DisplayName,
    /// Resource type.
    ResourceType,
    /// `ETag`.
    GetETag,
    /// Collection tag (calendarserver.org extension).
    GetCTag,
    /// RFC 6578 sync token.
    SyncToken,
    /// Supported REPORTs.
    SupportedReportSet,
    /// Privileges of the authenticated principal.
    CurrentUserPrivilegeSet,
    /// vCard formats the server accepts (CardDAV).
    SupportedAddressData,
}

impl Prop {
    const fn qualified_name(self) -> &'static str {
        match self {
            Self::DisplayName => "D:displayname",
            Self::ResourceType => "D:resourcetype",
            Self::GetETag => "D:getetag",
            Self::GetCTag => "CS:getctag",
            Self::SyncToken => "D:sync-token",
            Self::SupportedReportSet => "D:supported-report-set",
            Self::CurrentUserPrivilegeSet => "D:current-user-privilege-set",
            Self::SupportedAddressData => "CARD:supported-address-data",
        }
    }
}

impl PropFindRequest {
    /// Creates a new PROPFIND request.
    #[must_use]
    pub fn new() -> Self {
        Self { props: Vec::new() }
    }

    /// The property set a capability query (depth 0) asks for.
    #[must_use]
    pub fn capabilities() -> Self {
        let mut req = Self::new();
        req.add_property(Prop::DisplayName)
            .add_property(Prop::ResourceType)
            .add_property(Prop::GetCTag)
            .add_property(Prop::SyncToken)
            .add_property(Prop::SupportedReportSet)
            .add_property(Prop::CurrentUserPrivilegeSet)
            .add_property(Prop::SupportedAddressData);
        req
    }

    /// Adds a property to the request.
    pub fn add_property(&mut self, prop: Prop) -> &mut Self {
        self.props.push(prop);
        self
    }

    /// Builds the XML body for the PROPFIND request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let mut propfind = BytesStart::new("D:propfind");
        declare_namespaces(&mut propfind);
        writer.write_event(Event::Start(propfind))?;

        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        for prop in &self.props {
            write_empty(&mut writer, prop.qualified_name())?;
        }
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        writer.write_event(Event::End(BytesEnd::new("D:propfind")))?;
        into_xml(writer)
    }
}

impl Default for PropFindRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// `calendar-query` REPORT builder, listing event refs in a time range.
///
/// Only `getetag` is requested; bodies are fetched separately via multiget
/// so the listing stays cheap.
#[derive(Debug)]
pub struct CalendarQueryRequest {
    component: String,
    start: Option<String>,
    end: Option<String>,
}

impl CalendarQueryRequest {
    /// Creates a query for the given component (VEVENT, VTODO, ...).
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            start: None,
            end: None,
        }
    }

    /// Sets the time range filter (UTC strings like `20260101T000000Z`).
    #[must_use]
    pub fn time_range(mut self, start: String, end: Option<String>) -> Self {
        self.start = Some(start);
        self.end = end;
        self
    }

    /// Builds the XML body for the calendar query request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let mut query = BytesStart::new("C:calendar-query");
        declare_namespaces(&mut query);
        writer.write_event(Event::Start(query))?;

        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        write_empty(&mut writer, "D:getetag")?;
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        writer.write_event(Event::Start(BytesStart::new("C:filter")))?;

        let mut outer = BytesStart::new("C:comp-filter");
        outer.push_attribute(("name", "VCALENDAR"));
        writer.write_event(Event::Start(outer))?;

        let mut inner = BytesStart::new("C:comp-filter");
        inner.push_attribute(("name", self.component.as_str()));
        if let Some(start) = &self.start {
            writer.write_event(Event::Start(inner))?;
            let mut time_range = BytesStart::new("C:time-range");
            time_range.push_attribute(("start", start.as_str()));
            if let Some(end) = &self.end {
                time_range.push_attribute(("end", end.as_str()));
            }
            writer.write_event(Event::Empty(time_range))?;
            writer.write_event(Event::End(BytesEnd::new("C:comp-filter")))?;
        } else {
            writer.write_event(Event::Empty(inner))?;
        }

        writer.write_event(Event::End(BytesEnd::new("C:comp-filter")))?;
        writer.write_event(Event::End(BytesEnd::new("C:filter")))?;
        writer.write_event(Event::End(BytesEnd::new("C:calendar-query")))?;
        into_xml(writer)
    }
}

/// Multiget REPORT builder (calendar or addressbook dialect).
#[derive(Debug)]
pub struct MultiGetRequest {
    kind: MultigetKind,
    hrefs: Vec<String>,
}

impl MultiGetRequest {
    /// Creates a new multiget request.
    #[must_use]
    pub fn new(kind: MultigetKind) -> Self {
        Self {
            kind,
            hrefs: Vec::new(),
        }
    }

    /// Adds an href to the request.
    pub fn add_href(&mut self, href: String) -> &mut Self {
        self.hrefs.push(href);
        self
    }

    /// Builds the XML body for the multiget request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let (root, data_prop) = match self.kind {
            MultigetKind::Calendar => ("C:calendar-multiget", "C:calendar-data"),
            MultigetKind::AddressBook => ("CARD:addressbook-multiget", "CARD:address-data"),
        };

        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let mut multiget = BytesStart::new(root);
        declare_namespaces(&mut multiget);
        writer.write_event(Event::Start(multiget))?;

        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        write_empty(&mut writer, "D:getetag")?;
        write_empty(&mut writer, data_prop)?;
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        for href in &self.hrefs {
            writer.write_event(Event::Start(BytesStart::new("D:href")))?;
            writer.write_event(Event::Text(BytesText::new(href.as_str())))?;
            writer.write_event(Event::End(BytesEnd::new("D:href")))?;
        }

        writer.write_event(Event::End(BytesEnd::new(root)))?;
        into_xml(writer)
    }
}

/// RFC 6578 `sync-collection` REPORT builder.
#[derive(Debug)]
pub struct SyncCollectionRequest {
    sync_token: Option<String>,
}

impl SyncCollectionRequest {
    /// Creates a delta request from the given token; `None` asks for the
    /// initial (full) delta.
    #[must_use]
    pub const fn new(sync_token: Option<String>) -> Self {
        Self { sync_token }
    }

    /// Builds the XML body for the sync-collection request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let mut report = BytesStart::new("D:sync-collection");
        declare_namespaces(&mut report);
        writer.write_event(Event::Start(report))?;

        writer.write_event(Event::Start(BytesStart::new("D:sync-token")))?;
        if let Some(token) = &self.sync_token {
            writer.write_event(Event::Text(BytesText::new(token.as_str())))?;
        }
        writer.write_event(Event::End(BytesEnd::new("D:sync-token")))?;

        writer.write_event(Event::Start(BytesStart::new("D:sync-level")))?;
        writer.write_event(Event::Text(BytesText::new("1")))?;
        writer.write_event(Event::End(BytesEnd::new("D:sync-level")))?;

        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        write_empty(&mut writer, "D:getetag")?;
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        writer.write_event(Event::End(BytesEnd::new("D:sync-collection")))?;
        into_xml(writer)
    }
}
