// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! ETag-based two-way synchronization between local calendar/contact
//! stores and CalDAV/CardDAV collections.
//!
//! The [`SyncManager`] runs one pass for one collection; a
//! [`SyncService`] fans an account-level request out over its enabled
//! collections, guarded by the [`SyncRegistry`]. Domain specifics
//! (iCalendar vs vCard, group handling) plug in through [`SyncFlavor`].

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
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
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::single_match_else
)]

mod calendar;
mod contacts;
mod entry;
mod error;
mod flavor;
mod groups;
mod manager;
mod registry;
mod service;
mod settings;
mod sqlite;
mod state;
mod store;

pub use crate::calendar::CalendarFlavor;
pub use crate::contacts::ContactsFlavor;
pub use crate::entry::LocalEntry;
pub use crate::error::{InvalidResource, SyncError};
pub use crate::flavor::SyncFlavor;
pub use crate::groups::{GroupStrategy, VcardGroupState};
pub use crate::manager::{
    InvalidResourceCallback, SyncAlgorithm, SyncManager, SyncStats, choose_algorithm,
};
pub use crate::registry::{CancelToken, RunGuard, SyncKey, SyncRegistry};
pub use crate::service::{
    AccountSyncOutcome, StoreProvider, SyncService, UnauthorizedCallback,
};
pub use crate::settings::{
    Account, AccountSettings, Authority, Collection, CollectionId, CollectionKind, GroupMethod,
    SyncExtras,
};
pub use crate::sqlite::SqliteStore;
pub use crate::state::{SyncState, SyncTokenKind};
pub use crate::store::{LocalStore, MemoryStore};
