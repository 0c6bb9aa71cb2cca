// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! DAV client bound to one remote collection.

use std::sync::Arc;

use reqwest::Method;

use crate::config::DavConfig;
use crate::error::DavError;
use crate::http::HttpClient;
use crate::request::{
    CalendarQueryRequest, MultiGetRequest, PropFindRequest, SyncCollectionRequest,
};
use crate::response::MultiStatusResponse;
use crate::types::{
    Capabilities, ETag, FetchedResource, GetResponse, Href, MultigetKind, PutResponse,
    ResourceRef, SyncCollectionResult,
};

/// Upper bound of hrefs per multiget REPORT, sized against server URL and
/// body limits. All requested hrefs are still fetched; the client chunks.
const MULTIGET_CHUNK: usize = 90;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Precondition attached to a PUT.
#[derive(Debug, Clone)]
pub enum PutPrecondition {
    /// `If-Match`: update only if the remote version still matches.
    IfMatch(ETag),
    /// `If-None-Match: *`: create only, never overwrite.
    IfNoneMatchAny,
}

/// Client for one CalDAV/CardDAV collection.
///
/// # Example
///
/// ```ignore
/// use syncplus_dav::{AuthMethod, DavClient, DavConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DavConfig {
///     base_url: "https://dav.example.com".to_string(),
///     collection_path: "/dav/addressbooks/user/default/".to_string(),
///     auth: AuthMethod::Basic {
///         username: "user".to_string(),
///         password: "pass".to_string(),
///     },
///     ..Default::default()
/// };
///
/// let client = DavClient::new(config)?;
/// let caps = client.query_capabilities().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DavClient {
    http: Arc<HttpClient>,
    config: DavConfig,
}

impl DavClient {
    /// Creates a new client bound to the configured collection.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client initialization fails.
    pub fn new(config: DavConfig) -> Result<Self, DavError> {
        let http = HttpClient::new(config.clone())?;
        Ok(Self {
            http: Arc::new(http),
            config,
        })
    }

    /// The href of the collection this client is bound to.
    #[must_use]
    pub fn collection_href(&self) -> &str {
        &self.config.collection_path
    }

    /// Queries collection capabilities with a depth-0 PROPFIND.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or response parsing fails.
    pub async fn query_capabilities(&self) -> Result<Capabilities, DavError> {
        let xml = self
            .report_like(
                Method::from_bytes(b"PROPFIND").map_err(invalid_method)?,
                self.collection_url(),
                PropFindRequest::capabilities().build()?,
                Some("0"),
            )
            .await?;

        let caps = MultiStatusResponse::from_xml(&xml)?.into_capabilities();
        tracing::debug!(
            supports_sync_collection = caps.supports_sync_collection,
            read_only = caps.read_only,
            "queried collection capabilities"
        );
        Ok(caps)
    }

    /// Enumerates all member resources with a depth-1 PROPFIND for `getetag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or response parsing fails.
    pub async fn list_resources(&self) -> Result<Vec<ResourceRef>, DavError> {
        let mut propfind = PropFindRequest::new();
        propfind.add_property(crate::request::Prop::GetETag);

        let xml = self
            .report_like(
                Method::from_bytes(b"PROPFIND").map_err(invalid_method)?,
                self.collection_url(),
                propfind.build()?,
                Some("1"),
            )
            .await?;

        Ok(MultiStatusResponse::from_xml(&xml)?
            .into_resource_refs(&self.config.collection_path))
    }

    /// Enumerates event refs in a time range with a `calendar-query` REPORT.
    ///
    /// `start`/`end` are UTC strings like `20260101T000000Z`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or response parsing fails.
    pub async fn calendar_query(
        &self,
        start: &str,
        end: Option<&str>,
    ) -> Result<Vec<ResourceRef>, DavError> {
        let request = CalendarQueryRequest::new("VEVENT")
            .time_range(start.to_string(), end.map(str::to_string));

        let xml = self
            .report_like(
                Method::from_bytes(b"REPORT").map_err(invalid_method)?,
                self.collection_url(),
                request.build()?,
                Some("1"),
            )
            .await?;

        Ok(MultiStatusResponse::from_xml(&xml)?
            .into_resource_refs(&self.config.collection_path))
    }

    /// Runs an RFC 6578 `sync-collection` REPORT.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::SyncTokenInvalid`] when the server rejected the
    /// supplied token (the caller falls back to a full listing), or
    /// [`DavError::InvalidResponse`] when the report succeeded without
    /// returning a new token.
    pub async fn sync_collection(
        &self,
        token: Option<&str>,
    ) -> Result<SyncCollectionResult, DavError> {
        let request = SyncCollectionRequest::new(token.map(str::to_string));

        let xml = match self
            .report_like(
                Method::from_bytes(b"REPORT").map_err(invalid_method)?,
                self.collection_url(),
                request.build()?,
                Some("0"),
            )
            .await
        {
            Ok(xml) => xml,
            Err(DavError::Http { status, .. }) if matches!(status, 403 | 409 | 410) => {
                tracing::info!(status, "server rejected sync token");
                return Err(DavError::SyncTokenInvalid);
            }
            Err(e) => return Err(e),
        };

        let parsed = MultiStatusResponse::from_xml(&xml)?;
        let mut result = SyncCollectionResult {
            new_token: parsed.sync_token.clone(),
            ..SyncCollectionResult::default()
        };

        let collection = self.config.collection_path.trim_end_matches('/');
        for response in parsed.responses {
            if response.href.trim_end_matches('/') == collection {
                result.truncated |= response.is_truncated();
                continue;
            }
            if response.is_not_found() {
                result.removed.push(response.href.clone());
            } else if response.is_truncated() {
                result.truncated = true;
            } else if let Some(props) = response.ok_props() {
                result.changed.push(ResourceRef {
                    href: response.href.clone(),
                    etag: props.get_etag.clone(),
                });
            } else {
                tracing::warn!(href = %response.href, "skipping sync-collection member without usable status");
            }
        }

        if result.new_token.is_none() {
            return Err(DavError::InvalidResponse(
                "sync-collection response without sync-token".to_string(),
            ));
        }
        Ok(result)
    }

    /// Fetches resource bodies via multiget, chunked to respect server
    /// request-size limits.
    ///
    /// # Errors
    ///
    /// Returns an error if any chunk's request or parsing fails; per-item
    /// failures inside a chunk are reported via `status_ok` instead.
    pub async fn multiget(
        &self,
        hrefs: &[Href],
        kind: MultigetKind,
    ) -> Result<Vec<FetchedResource>, DavError> {
        let mut fetched = Vec::with_capacity(hrefs.len());

        for chunk in hrefs.chunks(MULTIGET_CHUNK) {
            let mut request = MultiGetRequest::new(kind);
            for href in chunk {
                request.add_href(href.as_str().to_string());
            }

            let xml = self
                .report_like(
                    Method::from_bytes(b"REPORT").map_err(invalid_method)?,
                    self.collection_url(),
                    request.build()?,
                    Some("1"),
                )
                .await?;

            fetched.extend(MultiStatusResponse::from_xml(&xml)?.into_fetched());
        }

        Ok(fetched)
    }

    /// Uploads a resource body with the given precondition.
    ///
    /// The result carries the new `ETag` if the server reported one
    /// (callers re-fetch otherwise) and the `Schedule-Tag`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::PreconditionFailed`] on an `ETag` mismatch, or
    /// any transport/HTTP error.
    pub async fn put(
        &self,
        href: &Href,
        body: String,
        content_type: &str,
        precondition: &PutPrecondition,
    ) -> Result<PutResponse, DavError> {
        let url = self.full_url(href.as_str());
        let mut req = self
            .http
            .build_request(Method::PUT, &url)
            .header("Content-Type", content_type)
            .body(body);

        req = match precondition {
            PutPrecondition::IfMatch(etag) => HttpClient::if_match(req, etag),
            PutPrecondition::IfNoneMatchAny => HttpClient::if_none_match_any(req),
        };

        let resp = self.http.execute(req).await?;
        Ok(PutResponse {
            etag: HttpClient::etag_of(&resp),
            schedule_tag: HttpClient::schedule_tag_of(&resp),
        })
    }

    /// Fetches a single resource body with its `ETag` and `Schedule-Tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource is missing, the request fails, or
    /// the server omits the `ETag` header.
    pub async fn get(&self, href: &Href) -> Result<GetResponse, DavError> {
        let url = self.full_url(href.as_str());
        let resp = match self
            .http
            .execute(self.http.build_request(Method::GET, &url))
            .await
        {
            Ok(resp) => resp,
            Err(DavError::Http { status: 404, .. }) => {
                return Err(DavError::NotFound(href.clone()));
            }
            Err(e) => return Err(e),
        };

        let etag = HttpClient::etag_of(&resp).ok_or_else(|| {
            DavError::InvalidResponse("GET response without ETag header".to_string())
        })?;
        let schedule_tag = HttpClient::schedule_tag_of(&resp);
        let data = resp.text().await?;
        Ok(GetResponse {
            etag,
            schedule_tag,
            data,
        })
    }

    /// Deletes a resource, conditionally when an `ETag` is supplied.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::NotFound`] if the resource is already gone
    /// (callers typically tolerate this), or any transport/HTTP error.
    pub async fn delete(&self, href: &Href, etag: Option<&ETag>) -> Result<(), DavError> {
        let url = self.full_url(href.as_str());
        let mut req = self.http.build_request(Method::DELETE, &url);
        if let Some(etag) = etag {
            req = HttpClient::if_match(req, etag);
        }

        match self.http.execute(req).await {
            Ok(_) => Ok(()),
            Err(DavError::Http { status: 404, .. }) => Err(DavError::NotFound(href.clone())),
            Err(e) => Err(e),
        }
    }

    async fn report_like(
        &self,
        method: Method,
        url: String,
        body: String,
        depth: Option<&str>,
    ) -> Result<String, DavError> {
        let mut req = self
            .http
            .build_request(method, &url)
            .header("Content-Type", XML_CONTENT_TYPE)
            .body(body);
        if let Some(depth) = depth {
            req = req.header("Depth", depth);
        }

        let resp = self.http.execute(req).await?;
        Ok(resp.text().await?)
    }

    fn collection_url(&self) -> String {
        self.full_url(&self.config.collection_path)
    }

    /// Builds full URL from href.
    fn full_url(&self, href: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), href)
    }
}

fn invalid_method<E: std::fmt::Display>(e: E) -> DavError {
    DavError::Transport(format!("Invalid method: {e}"))
}
