//! Content extraction for pages being recreated.
//!
//! The network is reached only through the [`PageFetcher`] capability so the rest of
//! the pipeline stays testable offline. [`HttpFetcher`] is the production
//! implementation; [`ExtractionService`] runs extractions on a bounded worker pool.

mod html;
mod http_client;
mod service;

pub use html::{extract_page, ExtractLimits, PageContent};
pub use http_client::{resolve_user_agent, HttpFetcher, USER_AGENT};
pub use service::{
    ExtractionConfig, ExtractionEvent, ExtractionJob, ExtractionOutcome, ExtractionService,
};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::models::ExtractedContent;

/// A fetched page: status and decoded body.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport failure reported by a fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,
}

/// Single-method capability for retrieving a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Why extraction produced no content for one URL.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("document had no extractable content")]
    Unparseable,

    #[error("cannot resolve {url:?} against production origin: {reason}")]
    Unresolvable { url: String, reason: String },
}

/// Resolve the URL to fetch for an entry: absolute raw URLs are used as-is, anything
/// else is joined onto the production origin.
pub fn resolve_fetch_url(
    raw_url: &str,
    normalized_key: &str,
    origin: Option<&Url>,
) -> Result<String, ExtractError> {
    if let Ok(url) = Url::parse(raw_url) {
        if matches!(url.scheme(), "http" | "https") {
            return Ok(url.to_string());
        }
    }

    let origin = origin.ok_or_else(|| ExtractError::Unresolvable {
        url: raw_url.to_string(),
        reason: "no production origin configured".to_string(),
    })?;

    origin
        .join(normalized_key)
        .map(|u| u.to_string())
        .map_err(|e| ExtractError::Unresolvable {
            url: raw_url.to_string(),
            reason: e.to_string(),
        })
}

/// Fetches a page and turns it into [`ExtractedContent`].
#[derive(Clone)]
pub struct ContentExtractor {
    fetcher: Arc<dyn PageFetcher>,
    limits: ExtractLimits,
    timeout: Duration,
}

impl ContentExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, limits: ExtractLimits, timeout: Duration) -> Self {
        Self {
            fetcher,
            limits,
            timeout,
        }
    }

    /// One GET, no retry. Non-2xx, timeouts and empty documents are errors.
    pub async fn extract(&self, key: &str, url: &str) -> Result<ExtractedContent, ExtractError> {
        let page = tokio::time::timeout(self.timeout, self.fetcher.fetch(url))
            .await
            .map_err(|_| ExtractError::Timeout(self.timeout))??;

        if !page.is_success() {
            return Err(ExtractError::Status(page.status));
        }

        let content = extract_page(&page.body, &self.limits).ok_or(ExtractError::Unparseable)?;

        Ok(ExtractedContent {
            key: key.to_string(),
            source_url: url.to_string(),
            title: content.title,
            description: content.description,
            body_text: content.body_text,
            truncated: content.truncated,
            headings: content.headings,
        })
    }
}
