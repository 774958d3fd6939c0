//! Page-fetch capability
//!
//! Design: the crawl loop only depends on the [`Fetcher`] trait, so the way
//! pages are retrieved and rendered can be swapped without touching it.

mod http;

pub use http::HttpFetcher;

use crate::client::FetchOptions;
use crate::error::CrawlError;
use crate::types::CrawlResult;
use async_trait::async_trait;

/// Trait for page fetchers
///
/// Implementations turn a URL into a [`CrawlResult`]. Problems with the page
/// itself (HTTP errors, unreachable hosts, unsupported content) belong in
/// [`CrawlResult::error_message`]; `Err` is reserved for requests that could
/// not be attempted at all.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Unique identifier for this fetcher (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Fetch one page and extract its markdown
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<CrawlResult, CrawlError>;
}
