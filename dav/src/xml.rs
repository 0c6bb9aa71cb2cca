// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! XML namespaces used in WebDAV/CalDAV/CardDAV processing.

/// XML namespaces.
pub mod ns {
    /// `WebDAV` namespace.
    pub const DAV: &str = "DAV:";

    /// `CalDAV` namespace.
    pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";

    /// `CardDAV` namespace.
    pub const CARDDAV: &str = "urn:ietf:params:xml:ns:carddav";

    /// calendarserver.org extensions (getctag).
    pub const CALENDARSERVER: &str = "http://calendarserver.org/ns/";
}
