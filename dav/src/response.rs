// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Response parsers for WebDAV/CalDAV/CardDAV operations.

use quick_xml::events::Event;

use crate::error::DavError;
use crate::types::{Capabilities, ETag, FetchedResource, Href, ResourceRef, VCardVersion};

/// `WebDAV` multistatus response.
#[derive(Debug, Clone, Default)]
pub struct MultiStatusResponse {
    /// The response items.
    pub responses: Vec<ResponseItem>,
    /// Top-level sync token (present in `sync-collection` REPORTs).
    pub sync_token: Option<String>,
}

/// Individual response in multistatus.
#[derive(Debug, Clone)]
pub struct ResponseItem {
    /// The href of the member resource.
    pub href: Href,
    /// Property stats for the member.
    pub prop_stats: Vec<PropStat>,
    /// Per-response status (used by `sync-collection` for removed members).
    pub status: Option<String>,
}

impl ResponseItem {
    /// The first propstat whose status is a success.
    #[must_use]
    pub fn ok_props(&self) -> Option<&Properties> {
        self.prop_stats
            .iter()
            .find(|p| is_success(&p.status))
            .map(|p| &p.props)
    }

    /// Whether the per-response status (if any) reports the member gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status.as_deref().is_some_and(|s| s.contains("404"))
    }

    /// Whether the per-response status reports a truncated listing (507).
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.status.as_deref().is_some_and(|s| s.contains("507"))
    }
}

/// Property stat with status and value.
#[derive(Debug, Clone)]
pub struct PropStat {
    /// Parsed property values.
    pub props: Properties,
    /// Status line of this propstat.
    pub status: String,
}

/// WebDAV/CalDAV/CardDAV properties.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    /// `D:displayname`.
    pub display_name: Option<String>,
    /// `D:getetag`.
    pub get_etag: Option<ETag>,
    /// `C:schedule-tag`.
    pub schedule_tag: Option<String>,
    /// `CS:getctag`.
    pub get_ctag: Option<String>,
    /// `D:sync-token` reported as a property.
    pub sync_token: Option<String>,
    /// `C:calendar-data` payload.
    pub calendar_data: Option<String>,
    /// `CARD:address-data` payload.
    pub address_data: Option<String>,
    /// Whether `D:supported-report-set` lists `sync-collection`.
    pub supports_sync_collection: bool,
    /// Whether `D:supported-report-set` was present at all.
    pub has_report_set: bool,
    /// Privilege names from `D:current-user-privilege-set`.
    pub privileges: Vec<String>,
    /// Whether the privilege set was present at all.
    pub has_privilege_set: bool,
    /// Accepted vCard formats from `CARD:supported-address-data`.
    pub vcard_versions: Vec<VCardVersion>,
    /// Whether the resource type includes `D:collection`.
    pub is_collection: bool,
}

fn is_success(status: &str) -> bool {
    status.contains("200") || status.contains("207")
}

impl MultiStatusResponse {
    /// Parses a multistatus response from XML.
    ///
    /// # Errors
    ///
    /// Returns an error if XML parsing fails.
    #[expect(clippy::too_many_lines)]
    pub fn from_xml(xml: &str) -> Result<Self, DavError> {
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        reader.config_mut().check_end_names = true;

        let mut result = Self::default();
        let mut current_response: Option<ResponseItem> = None;
        let mut current_prop_stats: Vec<PropStat> = Vec::new();
        let mut current_props = Properties::default();
        let mut in_prop = false;
        let mut in_response = false;
        let mut in_propstat = false;

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::End(ref e) if e.name().local_name().into_inner() == b"multistatus" => break,
                Event::Eof => break,

                Event::Start(ref e) => {
                    match e.name().local_name().into_inner() {
                        b"response" => {
                            in_response = true;
                            current_response = Some(ResponseItem {
                                href: Href::new(String::new()),
                                prop_stats: Vec::new(),
                                status: None,
                            });
                        }
                        b"href" if in_response && !in_prop => {
                            if let Event::Text(text) = reader.read_event_into(&mut buf)? {
                                let href = text.unescape()?.to_string();
                                if let Some(resp) = current_response.as_mut() {
                                    resp.href = Href::new(href);
                                }
                            }
                        }
                        b"propstat" if in_response => {
                            in_propstat = true;
                            current_props = Properties::default();
                        }

                        b"prop" => in_prop = true,

                        b"displayname" if in_prop => {
                            if let Event::Text(text) = reader.read_event_into(&mut buf)? {
                                current_props.display_name = Some(text.unescape()?.to_string());
                            }
                        }
                        b"resourcetype" if in_prop => {
                            read_resource_type(&mut reader, &mut buf, &mut current_props)?;
                        }
                        b"getetag" if in_prop => {
                            if let Event::Text(text) = reader.read_event_into(&mut buf)? {
                                current_props.get_etag =
                                    Some(ETag::new(text.unescape()?.to_string()));
                            }
                        }
                        b"schedule-tag" if in_prop => {
                            if let Event::Text(text) = reader.read_event_into(&mut buf)? {
                                current_props.schedule_tag = Some(text.unescape()?.to_string());
                            }
                        }
                        b"getctag" if in_prop => {
                            if let Event::Text(text) = reader.read_event_into(&mut buf)? {
                                current_props.get_ctag = Some(text.unescape()?.to_string());
                            }
                        }
                        b"sync-token" => {
                            if let Event::Text(text) = reader.read_event_into(&mut buf)? {
                                let token = text.unescape()?.to_string();
                                if in_prop {
                                    current_props.sync_token = Some(token);
                                } else if !in_response {
                                    result.sync_token = Some(token);
                                }
                            }
                        }
                        b"calendar-data" if in_prop => {
                            if let Event::Text(text) = reader.read_event_into(&mut buf)? {
                                current_props.calendar_data = Some(text.unescape()?.to_string());
                            }
                        }
                        b"address-data" if in_prop => {
                            if let Event::Text(text) = reader.read_event_into(&mut buf)? {
                                current_props.address_data = Some(text.unescape()?.to_string());
                            }
                        }
                        b"supported-report-set" if in_prop => {
                            read_report_set(&mut reader, &mut buf, &mut current_props)?;
                        }
                        b"current-user-privilege-set" if in_prop => {
                            read_privilege_set(&mut reader, &mut buf, &mut current_props)?;
                        }
                        b"supported-address-data" if in_prop => {
                            read_address_data_types(&mut reader, &mut buf, &mut current_props)?;
                        }
                        b"status" if in_propstat => {
                            if let Event::Text(text) = reader.read_event_into(&mut buf)? {
                                current_prop_stats.push(PropStat {
                                    props: current_props.clone(),
                                    status: text.unescape()?.to_string(),
                                });
                            }
                        }
                        b"status" if in_response => {
                            if let Event::Text(text) = reader.read_event_into(&mut buf)? {
                                if let Some(resp) = current_response.as_mut() {
                                    resp.status = Some(text.unescape()?.to_string());
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => match e.name().local_name().into_inner() {
                    b"response" if in_response => {
                        in_response = false;
                        if let Some(mut resp) = current_response.take() {
                            resp.prop_stats.clone_from(&current_prop_stats);
                            current_prop_stats.clear();
                            result.responses.push(resp);
                        }
                    }
                    b"propstat" if in_propstat => {
                        in_propstat = false;
                    }
                    b"prop" => {
                        in_prop = false;
                    }
                    _ => {}
                },
                _ => {}
            }
            buf.clear();
        }

        Ok(result)
    }

    /// Converts listing responses to resource refs, skipping the collection
    /// itself and any member whose propstat is not a success.
    #[must_use]
    pub fn into_resource_refs(self, collection_href: &str) -> Vec<ResourceRef> {
        let collection = collection_href.trim_end_matches('/');
        let mut refs = Vec::new();

        for response in self.responses {
            if response.href.trim_end_matches('/') == collection {
                continue;
            }
            match response.ok_props() {
                Some(props) => refs.push(ResourceRef {
                    href: response.href.clone(),
                    etag: props.get_etag.clone(),
                }),
                None => {
                    tracing::warn!(href = %response.href, "skipping listing member without successful propstat");
                }
            }
        }

        refs
    }

    /// Converts multiget responses to fetched resources.
    #[must_use]
    pub fn into_fetched(self) -> Vec<FetchedResource> {
        let mut fetched = Vec::new();

        for response in self.responses {
            let props = response.ok_props();
            let status_ok = props.is_some() && !response.is_not_found();
            let (etag, schedule_tag, data) = match props {
                Some(p) => (
                    p.get_etag.clone(),
                    p.schedule_tag.clone(),
                    p.calendar_data.clone().or_else(|| p.address_data.clone()),
                ),
                None => (None, None, None),
            };
            fetched.push(FetchedResource {
                href: response.href.clone(),
                etag,
                schedule_tag,
                data,
                status_ok,
            });
        }

        fetched
    }

    /// Assembles collection capabilities from a depth-0 PROPFIND.
    ///
    /// Every successful propstat contributes; servers commonly split
    /// properties across several propstats.
    #[must_use]
    pub fn into_capabilities(self) -> Capabilities {
        let mut caps = Capabilities::default();

        for response in &self.responses {
            for prop_stat in &response.prop_stats {
                if !is_success(&prop_stat.status) {
                    continue;
                }
                let props = &prop_stat.props;
                if props.display_name.is_some() {
                    caps.display_name.clone_from(&props.display_name);
                }
                if props.get_ctag.is_some() {
                    caps.ctag.clone_from(&props.get_ctag);
                }
                if props.sync_token.is_some() {
                    caps.sync_token.clone_from(&props.sync_token);
                }
                if props.has_report_set {
                    caps.supports_sync_collection |= props.supports_sync_collection;
                }
                if props.has_privilege_set {
                    // Read-only unless the server grants a write privilege.
                    let writable = props.privileges.iter().any(|p| {
                        p == "write" || p == "write-content" || p == "all"
                    });
                    caps.read_only = !writable;
                }
                if !props.vcard_versions.is_empty() {
                    caps.vcard_versions.clone_from(&props.vcard_versions);
                }
            }
        }

        caps
    }
}

fn read_resource_type<R: std::io::BufRead>(
    reader: &mut quick_xml::Reader<R>,
    buf: &mut Vec<u8>,
    props: &mut Properties,
) -> Result<(), DavError> {
    loop {
        match reader.read_event_into(buf)? {
            Event::End(ref e) if e.name().local_name().into_inner() == b"resourcetype" => {
                return Ok(());
            }
            Event::Start(ref e) | Event::Empty(ref e) => {
                if e.name().local_name().into_inner() == b"collection" {
                    props.is_collection = true;
                }
            }
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }
}

fn read_report_set<R: std::io::BufRead>(
    reader: &mut quick_xml::Reader<R>,
    buf: &mut Vec<u8>,
    props: &mut Properties,
) -> Result<(), DavError> {
    props.has_report_set = true;
    loop {
        match reader.read_event_into(buf)? {
            Event::End(ref e)
                if e.name().local_name().into_inner() == b"supported-report-set" =>
            {
                return Ok(());
            }
            Event::Start(ref e) | Event::Empty(ref e) => {
                if e.name().local_name().into_inner() == b"sync-collection" {
                    props.supports_sync_collection = true;
                }
            }
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }
}

fn read_privilege_set<R: std::io::BufRead>(
    reader: &mut quick_xml::Reader<R>,
    buf: &mut Vec<u8>,
    props: &mut Properties,
) -> Result<(), DavError> {
    props.has_privilege_set = true;
    loop {
        match reader.read_event_into(buf)? {
            Event::End(ref e)
                if e.name().local_name().into_inner() == b"current-user-privilege-set" =>
            {
                return Ok(());
            }
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = e.name();
                let local = name.local_name().into_inner();
                if local != b"privilege" {
                    let name = String::from_utf8_lossy(local).to_string();
                    props.privileges.push(name);
                }
            }
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }
}

fn read_address_data_types<R: std::io::BufRead>(
    reader: &mut quick_xml::Reader<R>,
    buf: &mut Vec<u8>,
    props: &mut Properties,
) -> Result<(), DavError> {
    loop {
        match reader.read_event_into(buf)? {
            Event::End(ref e)
                if e.name().local_name().into_inner() == b"supported-address-data" =>
            {
                return Ok(());
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if e.name().local_name().into_inner() == b"address-data-type" =>
            {
                let mut content_type = None;
                let mut version = None;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.local_name().into_inner() {
                        b"content-type" => content_type = Some(value),
                        b"version" => version = Some(value),
                        _ => {}
                    }
                }
                let parsed = match (content_type.as_deref(), version.as_deref()) {
                    (Some("application/vcard+json"), _) => Some(VCardVersion::JCard),
                    (_, Some("4.0")) => Some(VCardVersion::V4),
                    (_, Some("3.0")) => Some(VCardVersion::V3),
                    _ => None,
                };
                if let Some(v) = parsed {
                    if !props.vcard_versions.contains(&v) {
                        props.vcard_versions.push(v);
                    }
                }
            }
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPS_XML: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:CS="http://calendarserver.org/ns/" xmlns:CARD="urn:ietf:params:xml:ns:carddav">
  <D:response>
    <D:href>/dav/addressbooks/user/default/</D:href>
    <D:propstat>
      <D:prop>
        <D:displayname>Default</D:displayname>
        <CS:getctag>ctag-7</CS:getctag>
        <D:sync-token>https://example.com/sync/42</D:sync-token>
        <D:supported-report-set>
          <D:supported-report><D:report><D:sync-collection/></D:report></D:supported-report>
          <D:supported-report><D:report><CARD:addressbook-multiget/></D:report></D:supported-report>
        </D:supported-report-set>
        <D:current-user-privilege-set>
          <D:privilege><D:read/></D:privilege>
          <D:privilege><D:write/></D:privilege>
        </D:current-user-privilege-set>
        <CARD:supported-address-data>
          <CARD:address-data-type content-type="text/vcard" version="3.0"/>
          <CARD:address-data-type content-type="text/vcard" version="4.0"/>
        </CARD:supported-address-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    #[test]
    fn parses_capabilities() {
        let caps = MultiStatusResponse::from_xml(CAPS_XML)
            .unwrap()
            .into_capabilities();
        assert!(caps.supports_sync_collection);
        assert!(!caps.read_only);
        assert_eq!(caps.ctag.as_deref(), Some("ctag-7"));
        assert_eq!(caps.sync_token.as_deref(), Some("https://example.com/sync/42"));
        assert_eq!(caps.vcard_versions, vec![VCardVersion::V3, VCardVersion::V4]);
        assert_eq!(caps.display_name.as_deref(), Some("Default"));
    }

    #[test]
    fn read_only_without_write_privilege() {
        let xml = CAPS_XML.replace("<D:privilege><D:write/></D:privilege>", "");
        let caps = MultiStatusResponse::from_xml(&xml)
            .unwrap()
            .into_capabilities();
        assert!(caps.read_only);
    }

    #[test]
    fn listing_skips_collection_and_failed_members() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/dav/book/</D:href>
    <D:propstat>
      <D:prop><D:getetag>"c"</D:getetag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/book/a.vcf</D:href>
    <D:propstat>
      <D:prop><D:getetag>"1"</D:getetag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/book/broken.vcf</D:href>
    <D:propstat>
      <D:prop><D:getetag>"2"</D:getetag></D:prop>
      <D:status>HTTP/1.1 404 Not Found</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;
        let refs = MultiStatusResponse::from_xml(xml)
            .unwrap()
            .into_resource_refs("/dav/book/");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].href.as_str(), "/dav/book/a.vcf");
        assert_eq!(refs[0].etag.as_ref().unwrap().as_str(), "\"1\"");
    }

    #[test]
    fn sync_collection_response_parts() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/dav/book/changed.vcf</D:href>
    <D:propstat>
      <D:prop><D:getetag>"9"</D:getetag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/book/gone.vcf</D:href>
    <D:status>HTTP/1.1 404 Not Found</D:status>
  </D:response>
  <D:sync-token>https://example.com/sync/43</D:sync-token>
</D:multistatus>"#;
        let parsed = MultiStatusResponse::from_xml(xml).unwrap();
        assert_eq!(parsed.sync_token.as_deref(), Some("https://example.com/sync/43"));
        assert_eq!(parsed.responses.len(), 2);
        assert!(!parsed.responses[0].is_not_found());
        assert!(parsed.responses[1].is_not_found());
    }

    #[test]
    fn fetched_resources_carry_payloads_and_failures() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:CARD="urn:ietf:params:xml:ns:carddav">
  <D:response>
    <D:href>/dav/book/a.vcf</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>"1"</D:getetag>
        <CARD:address-data>BEGIN:VCARD&#13;&#10;VERSION:3.0&#13;&#10;UID:a&#13;&#10;END:VCARD&#13;&#10;</CARD:address-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/book/b.vcf</D:href>
    <D:propstat>
      <D:prop><D:getetag>"2"</D:getetag></D:prop>
      <D:status>HTTP/1.1 404 Not Found</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;
        let fetched = MultiStatusResponse::from_xml(xml).unwrap().into_fetched();
        assert_eq!(fetched.len(), 2);
        assert!(fetched[0].status_ok);
        assert!(fetched[0].data.as_deref().unwrap().contains("UID:a"));
        assert!(!fetched[1].status_ok);
    }

    #[test]
    fn fetched_resources_carry_schedule_tags() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/dav/cal/ev.ics</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>"1"</D:getetag>
        <C:schedule-tag>"st-9"</C:schedule-tag>
        <C:calendar-data>BEGIN:VCALENDAR&#13;&#10;END:VCALENDAR&#13;&#10;</C:calendar-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;
        let fetched = MultiStatusResponse::from_xml(xml).unwrap().into_fetched();
        assert_eq!(fetched[0].schedule_tag.as_deref(), Some("\"st-9\""));
    }
}
