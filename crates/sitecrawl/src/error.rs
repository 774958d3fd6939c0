//! Error types for sitecrawl

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading inputs, fetching pages or writing output
#[derive(Debug, Error)]
pub enum CrawlError {
    /// URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL has invalid scheme or cannot be parsed
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client: {0}")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request timed out waiting for first byte
    #[error("Request timed out: server did not respond within {0} seconds")]
    FirstByteTimeout(u64),

    /// Failed to connect to server
    #[error("Failed to connect to server: {0}")]
    ConnectError(#[source] reqwest::Error),

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Filesystem error on an input or output path
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sitemap document is not well-formed XML
    #[error("XML parse error at position {position}: {message}")]
    SitemapParse { position: u64, message: String },
}

impl CrawlError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_connect() {
            CrawlError::ConnectError(err)
        } else {
            CrawlError::RequestError(err.to_string())
        }
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CrawlError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when this is an I/O error for a path that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CrawlError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
