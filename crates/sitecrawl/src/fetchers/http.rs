//! HTTP page fetcher
//!
//! Fetches pages over plain HTTP/HTTPS and converts HTML to markdown.
//! No browser is involved, so every fetch is headless.

use crate::client::FetchOptions;
use crate::convert::{filter_excessive_newlines, html_to_markdown, is_html};
use crate::error::CrawlError;
use crate::fetchers::Fetcher;
use crate::types::{CrawlResult, MarkdownResult};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Binary content type prefixes
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-tar",
    "application/x-rar",
    "application/x-7z",
    "application/vnd.ms-",
    "application/vnd.openxmlformats",
    "font/",
];

/// Content types written out as-is
const MARKDOWN_PASSTHROUGH: &[&str] = &["text/plain", "text/markdown", "text/x-markdown"];

/// Accept header: pages first, text second
const ACCEPT_PAGES: &str = "text/html, application/xhtml+xml, text/markdown, text/plain;q=0.9, */*;q=0.8";

/// First-byte timeout (connect + response headers)
const FIRST_BYTE_TIMEOUT: Duration = Duration::from_secs(15);

/// Body timeout (total)
const BODY_TIMEOUT: Duration = Duration::from_secs(30);

/// Log at info when verbose, debug otherwise
macro_rules! fetch_log {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

/// HTTP page fetcher
///
/// Handles HTTP/HTTPS URLs with:
/// - HTML to markdown conversion, plus pruned markdown when a filter is set
/// - text and markdown passthrough
/// - Binary content detection
/// - Timeout handling with partial content
pub struct HttpFetcher {
    first_byte_timeout: Duration,
    body_timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeouts
    pub fn new() -> Self {
        Self {
            first_byte_timeout: FIRST_BYTE_TIMEOUT,
            body_timeout: BODY_TIMEOUT,
        }
    }

    /// Override the first-byte and body timeouts
    pub fn with_timeouts(first_byte_timeout: Duration, body_timeout: Duration) -> Self {
        Self {
            first_byte_timeout,
            body_timeout,
        }
    }

    fn client(&self, options: &FetchOptions) -> Result<reqwest::Client, CrawlError> {
        let mut headers = HeaderMap::new();
        let user_agent = options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_PAGES));

        reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(self.first_byte_timeout)
            .build()
            .map_err(CrawlError::ClientBuildError)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<CrawlResult, CrawlError> {
        if url.is_empty() {
            return Err(CrawlError::MissingUrl);
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CrawlError::InvalidUrlScheme);
        }
        Url::parse(url).map_err(|_| CrawlError::InvalidUrlScheme)?;

        if !options.headless {
            warn!(url, "Headed mode is not available over HTTP, fetching headless");
        }

        let client = self.client(options)?;
        fetch_log!(options.verbose, fetcher = self.name(), url, "Sending request");

        let response =
            match tokio::time::timeout(self.first_byte_timeout, client.get(url).send()).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    let err = CrawlError::from_reqwest(e);
                    return Ok(CrawlResult::failed(url, None, err.to_string()));
                }
                Err(_) => {
                    let err = CrawlError::FirstByteTimeout(self.first_byte_timeout.as_secs());
                    return Ok(CrawlResult::failed(url, None, err.to_string()));
                }
            };

        let status = response.status();
        let status_code = status.as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        fetch_log!(
            options.verbose,
            url,
            status_code,
            content_type = ?content_type,
            "Received response"
        );

        if status.is_client_error() || status.is_server_error() {
            return Ok(CrawlResult {
                content_type,
                ..CrawlResult::failed(url, Some(status_code), format!("HTTP {}", status))
            });
        }

        if let Some(ref ct) = content_type {
            if is_binary_content_type(ct) {
                return Ok(CrawlResult {
                    content_type,
                    ..CrawlResult::failed(
                        url,
                        Some(status_code),
                        "Binary content is not supported. Only HTML and text pages can be converted to markdown.",
                    )
                });
            }
        }

        let (body, truncated) =
            read_body_with_limits(response, self.body_timeout, options.max_page_bytes).await;
        let content = String::from_utf8_lossy(&body).into_owned();

        let markdown = if is_html(content_type.as_deref(), &content) {
            let mut markdown = MarkdownResult::raw(html_to_markdown(&content));
            if let Some(filter) = &options.pruning {
                markdown = markdown.with_fit(filter.html_to_fit_markdown(&content));
            }
            Some(markdown)
        } else if is_markdown_passthrough(content_type.as_deref()) {
            Some(MarkdownResult::raw(filter_excessive_newlines(content.trim())))
        } else {
            None
        };

        fetch_log!(
            options.verbose,
            url,
            bytes = body.len(),
            truncated,
            converted = markdown.is_some(),
            "Processed body"
        );

        Ok(CrawlResult {
            url: url.to_string(),
            status_code: Some(status_code),
            content_type,
            markdown,
            truncated: truncated.then_some(true),
            error_message: None,
        })
    }
}

/// Check if content type indicates binary content
fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// Plain text and markdown are written without conversion; a missing
/// content type is treated as text
fn is_markdown_passthrough(content_type: Option<&str>) -> bool {
    match content_type {
        Some(ct) => {
            let ct_lower = ct.to_lowercase();
            MARKDOWN_PASSTHROUGH
                .iter()
                .any(|prefix| ct_lower.starts_with(prefix))
        }
        None => true,
    }
}

/// Read response body, returning partial content on timeout or size limit
async fn read_body_with_limits(
    response: reqwest::Response,
    timeout: Duration,
    max_bytes: Option<usize>,
) -> (Bytes, bool) {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let chunk_future = stream.next();
        let timeout_future = tokio::time::sleep_until(deadline);

        tokio::select! {
            chunk = chunk_future => {
                match chunk {
                    Some(Ok(bytes)) => {
                        body.extend_from_slice(&bytes);
                        if let Some(limit) = max_bytes {
                            if body.len() >= limit {
                                body.truncate(limit);
                                warn!(limit, "Page size limit reached, keeping partial content");
                                return (Bytes::from(body), true);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("Error reading body chunk: {}", e);
                        let has_content = !body.is_empty();
                        return (Bytes::from(body), has_content);
                    }
                    None => {
                        // Stream complete
                        return (Bytes::from(body), false);
                    }
                }
            }
            _ = timeout_future => {
                warn!("Body timeout reached, returning partial content");
                return (Bytes::from(body), true);
            }
        }
    }
}
