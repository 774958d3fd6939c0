//! Batch crawl loop
//!
//! Fetches a list of URLs one at a time and writes each page's markdown to
//! its own file. A failure on one URL is logged and the loop moves on.

use crate::client::FetchOptions;
use crate::error::CrawlError;
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::filename::markdown_filename;
use crate::prune::PruningFilter;
use crate::types::MarkdownVariant;
use crate::urls::load_urls;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Output directory used when none is given
pub const DEFAULT_OUTPUT_DIR: &str = "crawled_markdown_content";

/// Crawl configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlerConfig {
    /// Options passed to the fetcher for every URL
    pub fetch: FetchOptions,
    /// Pause between consecutive requests
    pub delay: Option<Duration>,
    /// Markdown variant written to disk
    pub variant: MarkdownVariant,
}

/// Builder for configuring a [`Crawler`]
#[derive(Debug, Clone, Default)]
pub struct CrawlerBuilder {
    config: CrawlerConfig,
}

impl CrawlerBuilder {
    /// Create a builder with headless, non-verbose, pruned defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch without a visible browser window
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.fetch.headless = headless;
        self
    }

    /// Log fetch details at info level
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.fetch.verbose = verbose;
        self
    }

    /// Set or disable the pruning filter
    pub fn pruning(mut self, filter: Option<PruningFilter>) -> Self {
        self.config.fetch.pruning = filter;
        self
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.fetch.user_agent = Some(ua.into());
        self
    }

    /// Cap the number of body bytes read per page
    pub fn max_page_bytes(mut self, limit: usize) -> Self {
        self.config.fetch.max_page_bytes = Some(limit);
        self
    }

    /// Wait this long between requests
    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay = Some(delay);
        self
    }

    /// Choose which markdown variant gets written
    pub fn variant(mut self, variant: MarkdownVariant) -> Self {
        self.config.variant = variant;
        self
    }

    /// Build a crawler backed by [`HttpFetcher`]
    pub fn build(self) -> Crawler {
        self.build_with_fetcher(HttpFetcher::new())
    }

    /// Build a crawler backed by a custom fetcher
    pub fn build_with_fetcher(self, fetcher: impl Fetcher + 'static) -> Crawler {
        Crawler {
            config: self.config,
            fetcher: Box::new(fetcher),
        }
    }
}

/// Counts reported at the end of a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// URLs attempted
    pub total: usize,
    /// Pages written to disk
    pub saved: usize,
    /// Pages the fetcher reported an error for
    pub failed: usize,
    /// Pages with neither content nor an error
    pub empty: usize,
    /// URLs that raised an error while being processed
    pub critical: usize,
    /// Files written, in crawl order
    pub written: Vec<PathBuf>,
}

enum Outcome {
    Saved(PathBuf),
    Failed,
    Empty,
}

/// Sequential markdown crawler
pub struct Crawler {
    config: CrawlerConfig,
    fetcher: Box<dyn Fetcher>,
}

impl Default for Crawler {
    fn default() -> Self {
        CrawlerBuilder::new().build()
    }
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher.name())
            .finish()
    }
}

impl Crawler {
    /// Create a new crawler builder
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::new()
    }

    /// Active configuration
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Load URLs from a file and crawl them.
    ///
    /// A missing or empty list is logged and yields an empty summary without
    /// touching the output directory.
    pub async fn crawl_file(
        &self,
        urls_path: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<CrawlSummary, CrawlError> {
        let urls = load_urls(urls_path);
        if urls.is_empty() {
            info!("No URLs to crawl. Exiting.");
            return Ok(CrawlSummary::default());
        }
        self.crawl_urls(&urls, output_dir).await
    }

    /// Crawl URLs in order, writing one markdown file per successful page.
    ///
    /// Only failing to create the output directory aborts the crawl.
    pub async fn crawl_urls(
        &self,
        urls: &[String],
        output_dir: impl AsRef<Path>,
    ) -> Result<CrawlSummary, CrawlError> {
        let output_dir = output_dir.as_ref();
        ensure_output_dir(output_dir).await?;

        debug!(
            fetcher = self.fetcher.name(),
            headless = self.config.fetch.headless,
            verbose = self.config.fetch.verbose,
            pruning = self.config.fetch.pruning.is_some(),
            variant = %self.config.variant,
            "Starting crawl"
        );

        let mut summary = CrawlSummary {
            total: urls.len(),
            ..Default::default()
        };

        for (index, url) in urls.iter().enumerate() {
            if index > 0 {
                if let Some(delay) = self.config.delay {
                    tokio::time::sleep(delay).await;
                }
            }

            info!("Crawling URL {}/{}: {}", index + 1, urls.len(), url);
            match self.crawl_one(url, output_dir).await {
                Ok(Outcome::Saved(path)) => {
                    summary.saved += 1;
                    summary.written.push(path);
                }
                Ok(Outcome::Failed) => summary.failed += 1,
                Ok(Outcome::Empty) => summary.empty += 1,
                Err(e) => {
                    error!("CRITICAL ERROR during crawling {}: {}", url, e);
                    summary.critical += 1;
                }
            }
        }

        info!("Finished crawling {} URLs.", urls.len());
        Ok(summary)
    }

    async fn crawl_one(&self, url: &str, output_dir: &Path) -> Result<Outcome, CrawlError> {
        let result = self.fetcher.fetch(url, &self.config.fetch).await?;

        let selected = result
            .markdown
            .as_ref()
            .and_then(|markdown| markdown.select(self.config.variant));

        if let Some(text) = selected {
            let path = output_dir.join(markdown_filename(url));
            tokio::fs::write(&path, text)
                .await
                .map_err(|e| CrawlError::io(&path, e))?;
            info!("SUCCESS: Saved Markdown for {} to {}", url, path.display());
            return Ok(Outcome::Saved(path));
        }

        if let Some(message) = &result.error_message {
            warn!(
                "CRAWL ERROR for {}: {} (Status: {})",
                url,
                message,
                result.status_label()
            );
            return Ok(Outcome::Failed);
        }

        warn!(
            "No Markdown content or unexpected result for {} (Status: {})",
            url,
            result.status_label()
        );
        Ok(Outcome::Empty)
    }
}

async fn ensure_output_dir(dir: &Path) -> Result<(), CrawlError> {
    if tokio::fs::try_exists(dir).await.unwrap_or(false) {
        return Ok(());
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| CrawlError::io(dir, e))?;
    info!("Created output directory: {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_capture::capture_logs;
    use crate::types::{CrawlResult, MarkdownResult};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Fetcher answering from a fixed table and recording call order
    struct CannedFetcher {
        pages: HashMap<String, CrawlResult>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl CannedFetcher {
        fn new(results: Vec<CrawlResult>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let pages = results.into_iter().map(|r| (r.url.clone(), r)).collect();
            (
                Self {
                    pages,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl Fetcher for CannedFetcher {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn fetch(
            &self,
            url: &str,
            _options: &FetchOptions,
        ) -> Result<CrawlResult, CrawlError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or(CrawlError::InvalidUrlScheme)
        }
    }

    fn page(url: &str, raw: &str) -> CrawlResult {
        CrawlResult {
            status_code: Some(200),
            markdown: Some(MarkdownResult::raw(raw)),
            ..CrawlResult::new(url)
        }
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builder_defaults() {
        let crawler = Crawler::builder().build();
        let config = crawler.config();
        assert!(config.fetch.headless);
        assert!(!config.fetch.verbose);
        assert!(config.fetch.pruning.is_some());
        assert!(config.delay.is_none());
        assert_eq!(config.variant, MarkdownVariant::Raw);
    }

    #[test]
    fn test_builder_overrides() {
        let crawler = Crawler::builder()
            .verbose(true)
            .pruning(None)
            .user_agent("TestAgent/1.0")
            .max_page_bytes(1024)
            .delay(Duration::from_millis(5))
            .variant(MarkdownVariant::Fit)
            .build();
        let config = crawler.config();
        assert!(config.fetch.verbose);
        assert!(config.fetch.pruning.is_none());
        assert_eq!(config.fetch.user_agent.as_deref(), Some("TestAgent/1.0"));
        assert_eq!(config.fetch.max_page_bytes, Some(1024));
        assert_eq!(config.delay, Some(Duration::from_millis(5)));
        assert_eq!(config.variant, MarkdownVariant::Fit);
    }

    #[tokio::test]
    async fn test_crawl_writes_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let (fetcher, calls) = CannedFetcher::new(vec![
            page("https://a.example/page1", "# One"),
            page("https://b.example/x/y", "# Two"),
        ]);
        let crawler = Crawler::builder().build_with_fetcher(fetcher);

        let list = urls(&["https://a.example/page1", "https://b.example/x/y"]);
        let summary = crawler.crawl_urls(&list, &out).await.unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.saved, 2);
        assert_eq!(*calls.lock().unwrap(), list);
        assert_eq!(
            std::fs::read_to_string(out.join("a_example_page1.md")).unwrap(),
            "# One"
        );
        assert_eq!(
            std::fs::read_to_string(out.join("b_example_x_y.md")).unwrap(),
            "# Two"
        );
        assert_eq!(summary.written[0], out.join("a_example_page1.md"));
    }

    #[tokio::test]
    async fn test_crawl_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let (fetcher, calls) = CannedFetcher::new(vec![
            CrawlResult::failed("https://a.example/missing", Some(404), "HTTP 404 Not Found"),
            CrawlResult {
                status_code: Some(200),
                ..CrawlResult::new("https://a.example/blank")
            },
            page("https://a.example/ok", "Body"),
        ]);
        let crawler = Crawler::builder().build_with_fetcher(fetcher);

        let list = urls(&[
            "https://a.example/missing",
            "not-a-url",
            "https://a.example/blank",
            "https://a.example/ok",
        ]);
        let summary = crawler.crawl_urls(&list, dir.path()).await.unwrap();

        assert_eq!(calls.lock().unwrap().len(), 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.saved, 1);
        assert!(dir.path().join("a_example_ok.md").exists());
        assert!(!dir.path().join("a_example_missing.md").exists());
    }

    #[tokio::test]
    async fn test_crawl_fit_variant() {
        let dir = tempfile::tempdir().unwrap();
        let (fetcher, _) = CannedFetcher::new(vec![CrawlResult {
            markdown: Some(MarkdownResult::raw("Menu\n\nArticle").with_fit("Article")),
            ..page("https://a.example/fit", "")
        }]);
        let crawler = Crawler::builder()
            .variant(MarkdownVariant::Fit)
            .build_with_fetcher(fetcher);

        crawler
            .crawl_urls(&urls(&["https://a.example/fit"]), dir.path())
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("a_example_fit.md")).unwrap(),
            "Article"
        );
    }

    #[tokio::test]
    async fn test_crawl_file_missing_list() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never");
        let (fetcher, calls) = CannedFetcher::new(Vec::new());
        let crawler = Crawler::builder().build_with_fetcher(fetcher);

        let summary = crawler
            .crawl_file(dir.path().join("urls.txt"), &out)
            .await
            .unwrap();

        assert_eq!(summary, CrawlSummary::default());
        assert!(calls.lock().unwrap().is_empty());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_crawl_file_reads_list() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("urls.txt");
        std::fs::write(&list, "https://a.example/page1\n\n  https://a.example/ok  \n").unwrap();
        let (fetcher, calls) = CannedFetcher::new(vec![
            page("https://a.example/page1", "One"),
            page("https://a.example/ok", "Two"),
        ]);
        let crawler = Crawler::builder().build_with_fetcher(fetcher);

        let summary = crawler
            .crawl_file(&list, dir.path().join("out"))
            .await
            .unwrap();

        assert_eq!(summary.saved, 2);
        assert_eq!(
            *calls.lock().unwrap(),
            urls(&["https://a.example/page1", "https://a.example/ok"])
        );
    }

    #[test]
    fn test_crawl_logs_per_url_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let (fetcher, _) = CannedFetcher::new(vec![
            CrawlResult::failed("https://a.example/down", None, "connection refused"),
            CrawlResult::new("https://a.example/blank"),
            page("https://a.example/ok", "Body"),
        ]);
        let crawler = Crawler::builder().build_with_fetcher(fetcher);
        let list = urls(&[
            "https://a.example/down",
            "https://a.example/blank",
            "https://a.example/ok",
        ]);

        let (summary, logs) = capture_logs(|| {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
                .block_on(crawler.crawl_urls(&list, dir.path()))
        });

        assert_eq!(summary.unwrap().saved, 1);
        assert!(logs.contains("Crawling URL 1/3: https://a.example/down"));
        assert!(logs.contains(
            "CRAWL ERROR for https://a.example/down: connection refused (Status: None)"
        ));
        assert!(logs.contains(
            "No Markdown content or unexpected result for https://a.example/blank (Status: None)"
        ));
        assert!(logs.contains("SUCCESS: Saved Markdown for https://a.example/ok to "));
        assert!(logs.contains("Finished crawling 3 URLs."));
    }

    #[test]
    fn test_summary_serialization() {
        let summary = CrawlSummary {
            total: 3,
            saved: 1,
            failed: 1,
            empty: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total"], 3);
        assert_eq!(json["critical"], 0);
        assert!(json["written"].as_array().unwrap().is_empty());
    }
}
