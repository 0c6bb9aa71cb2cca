// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Content-line model for iCalendar (RFC 5545) and vCard (RFC 6350/2426)
//! payloads, plus jCard (RFC 7095) serialization.
//!
//! The sync engine treats resource bodies as near-opaque: it needs UIDs,
//! CATEGORIES, group member lists and version switching, not full calendar
//! semantics. This crate provides exactly that property-level access.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::pedantic
)]
#![allow(clippy::single_match_else, clippy::similar_names)]

mod component;
mod formatter;
mod jcard;
mod parser;

pub use crate::component::{Component, Property};
pub use crate::formatter::write;
pub use crate::jcard::write_jcard;
pub use crate::parser::parse;

/// Errors produced while parsing or serializing content lines.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum VObjectError {
    /// A content line has no `:` separating name from value.
    #[error("line {0}: missing ':' delimiter in content line")]
    MissingDelimiter(usize),

    /// `END:<name>` does not close the innermost open component.
    #[error("line {line}: END:{found} does not match open component {expected}")]
    MismatchedEnd {
        /// 1-based line number of the offending `END`.
        line: usize,
        /// Component name found in the `END` line.
        found: String,
        /// Component name that was expected.
        expected: String,
    },

    /// Input ended while a component was still open.
    #[error("unexpected end of input inside component {0}")]
    UnexpectedEof(String),

    /// A property appeared before any `BEGIN:` line.
    #[error("line {0}: content line outside of any component")]
    OutsideComponent(usize),

    /// `END:` without a matching `BEGIN:`.
    #[error("line {0}: END without matching BEGIN")]
    UnmatchedEnd(usize),
}
