//! Sitecrawl - batch web page to markdown crawler and sitemap URL extractor
//!
//! This crate provides two utilities:
//!
//! - A sequential crawler that reads a newline-delimited URL list, fetches
//!   each page and writes its markdown to a file named after the URL.
//! - A sitemap parser that turns a sitemaps.org XML document into the
//!   ordered list of page URLs it declares.
//!
//! ## Fetcher System
//!
//! The crawl loop talks to pages through the [`Fetcher`] trait. The
//! built-in [`HttpFetcher`] fetches over HTTP/HTTPS, converts HTML to
//! markdown and, when a [`PruningFilter`] is configured, also produces a
//! pruned variant with navigation and other boilerplate removed.
//!
//! ```no_run
//! # async fn run() -> Result<(), sitecrawl::CrawlError> {
//! use sitecrawl::{Crawler, DEFAULT_OUTPUT_DIR};
//!
//! let crawler = Crawler::builder().build();
//! let summary = crawler.crawl_file("urls.txt", DEFAULT_OUTPUT_DIR).await?;
//! println!("saved {} of {}", summary.saved, summary.total);
//! # Ok(())
//! # }
//! ```

pub mod client;
mod convert;
mod crawler;
mod error;
pub mod fetchers;
mod filename;
#[cfg(test)]
mod log_capture;
mod prune;
pub mod sitemap;
mod types;
mod urls;

pub use client::{fetch_page, fetch_page_with_options, FetchOptions};
pub use convert::html_to_markdown;
pub use crawler::{CrawlSummary, Crawler, CrawlerBuilder, CrawlerConfig, DEFAULT_OUTPUT_DIR};
pub use error::CrawlError;
pub use fetchers::{Fetcher, HttpFetcher};
pub use filename::markdown_filename;
pub use prune::PruningFilter;
pub use sitemap::{
    extract_urls_from_sitemap, load_sitemap, parse_sitemap, read_sitemap, Sitemap, SITEMAP_NS,
};
pub use types::{CrawlResult, MarkdownResult, MarkdownVariant};
pub use urls::{load_urls, parse_url_list, read_urls};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "sitecrawl/0.1";
