// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::types::Href;

/// DAV client errors.
#[non_exhaustive]
#[derive(Debug)]
pub enum DavError {
    /// Network-level failure (connection, TLS, timeout).
    Transport(String),

    /// Server rejected the credentials (HTTP 401).
    Unauthorized,

    /// Unexpected HTTP status.
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// Precondition failed (`ETag` mismatch on a conditional request).
    PreconditionFailed(String),

    /// The collection sync token is no longer valid on the server.
    SyncTokenInvalid,

    /// Resource not found.
    NotFound(Href),

    /// XML parsing/writing error.
    Xml(String),

    /// Response violated protocol expectations.
    InvalidResponse(String),
}

impl fmt::Display for DavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Unauthorized => write!(f, "authorization failed"),
            Self::Http { status, body } => write!(f, "HTTP error {status}: {body}"),
            Self::PreconditionFailed(e) => write!(f, "precondition failed: {e}"),
            Self::SyncTokenInvalid => write!(f, "sync token no longer valid"),
            Self::NotFound(href) => write!(f, "resource not found: {href}"),
            Self::Xml(e) => write!(f, "XML error: {e}"),
            Self::InvalidResponse(e) => write!(f, "invalid server response: {e}"),
        }
    }
}

impl std::error::Error for DavError {}

impl From<reqwest::Error> for DavError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<quick_xml::Error> for DavError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<std::io::Error> for DavError {
    fn from(e: std::io::Error) -> Self {
        Self::Xml(format!("IO error: {e}"))
    }
}
