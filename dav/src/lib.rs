// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! WebDAV client for CalDAV (RFC 4791) and CardDAV (RFC 6352) collections,
//! including RFC 6578 collection synchronization.
//!
//! A [`DavClient`] is bound to exactly one remote collection (a calendar or
//! an address book) and exposes the operations the sync engine needs:
//! capability discovery, full and delta listings, chunked multiget, and
//! conditional PUT/GET/DELETE.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool
)]

mod client;
mod config;
mod error;
mod http;
mod request;
mod response;
mod types;
mod xml;

pub use crate::client::{DavClient, PutPrecondition};
pub use crate::config::{AuthMethod, DavConfig};
pub use crate::error::DavError;
pub use crate::request::{
    CalendarQueryRequest, MultiGetRequest, Prop, PropFindRequest, SyncCollectionRequest,
};
pub use crate::response::MultiStatusResponse;
pub use crate::types::{
    Capabilities, ETag, FetchedResource, GetResponse, Href, MultigetKind, PutResponse,
    ResourceRef, SyncCollectionResult, VCardVersion,
};
