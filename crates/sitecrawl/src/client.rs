//! Page fetching entry points
//!
//! This module provides the fetch options and single-page entry points.
//! The actual fetch logic is implemented by fetchers in the [`fetchers`](crate::fetchers) module.

use crate::error::CrawlError;
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::prune::PruningFilter;
use crate::types::CrawlResult;

/// Page-fetch options shared by every URL of a crawl
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Fetch without a visible browser window
    pub headless: bool,
    /// Log request and response details at info level
    pub verbose: bool,
    /// Boilerplate filter used to produce fit markdown
    pub pruning: Option<PruningFilter>,
    /// Custom User-Agent
    pub user_agent: Option<String>,
    /// Stop reading a page body after this many bytes
    pub max_page_bytes: Option<usize>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            verbose: false,
            pruning: Some(PruningFilter::default()),
            user_agent: None,
            max_page_bytes: None,
        }
    }
}

/// Fetch a single page with default options
///
/// For custom options, use [`fetch_page_with_options`].
pub async fn fetch_page(url: &str) -> Result<CrawlResult, CrawlError> {
    fetch_page_with_options(url, &FetchOptions::default()).await
}

/// Fetch a single page with custom options using the HTTP fetcher
pub async fn fetch_page_with_options(
    url: &str,
    options: &FetchOptions,
) -> Result<CrawlResult, CrawlError> {
    if url.is_empty() {
        return Err(CrawlError::MissingUrl);
    }

    HttpFetcher::new().fetch(url, options).await
}
