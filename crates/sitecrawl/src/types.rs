//! Core types for sitecrawl

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Markdown produced for one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownResult {
    /// Full conversion of the page
    pub raw_markdown: String,

    /// Conversion after the pruning filter removed boilerplate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_markdown: Option<String>,
}

impl MarkdownResult {
    /// Create a result holding only raw markdown
    pub fn raw(markdown: impl Into<String>) -> Self {
        Self {
            raw_markdown: markdown.into(),
            fit_markdown: None,
        }
    }

    /// Attach a pruned variant
    pub fn with_fit(mut self, markdown: impl Into<String>) -> Self {
        self.fit_markdown = Some(markdown.into());
        self
    }

    /// Pick the variant to persist, `None` when it is empty
    pub fn select(&self, variant: MarkdownVariant) -> Option<&str> {
        let text = match variant {
            MarkdownVariant::Raw => self.raw_markdown.as_str(),
            MarkdownVariant::Fit => self
                .fit_markdown
                .as_deref()
                .filter(|fit| !fit.trim().is_empty())
                .unwrap_or(&self.raw_markdown),
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Which markdown variant gets written to disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkdownVariant {
    /// Full conversion
    #[default]
    Raw,
    /// Pruned conversion, falling back to raw
    Fit,
}

impl FromStr for MarkdownVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(MarkdownVariant::Raw),
            "fit" => Ok(MarkdownVariant::Fit),
            _ => Err("Invalid markdown variant: must be raw or fit".to_string()),
        }
    }
}

impl std::fmt::Display for MarkdownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkdownVariant::Raw => write!(f, "raw"),
            MarkdownVariant::Fit => write!(f, "fit"),
        }
    }
}

/// Outcome of fetching a single page
///
/// Either `markdown` or `error_message` is normally set. A result with
/// neither is reported as unexpected by the crawl loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResult {
    /// The requested URL
    pub url: String,

    /// HTTP status code, absent when no response was received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Content-Type header value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Extracted markdown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<MarkdownResult>,

    /// True if the body was cut short by timeout or size limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,

    /// Error message reported by the fetcher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CrawlResult {
    /// Create an empty result for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Create a failed result
    pub fn failed(
        url: impl Into<String>,
        status_code: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            status_code,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Status code formatted for log lines
    pub fn status_label(&self) -> String {
        match self.status_code {
            Some(code) => code.to_string(),
            None => "None".to_string(),
        }
    }
}
