//! Content pruning filter
//!
//! Produces the "fit" markdown variant: the page converted without its
//! boilerplate. Pruning happens in two passes:
//!
//! 1. While converting, elements that are boilerplate by tag (`nav`,
//!    `footer`, ...) or by `class`/`id` (`sidebar`, `cookie-banner`, ...)
//!    are dropped together with their content.
//! 2. The resulting markdown is split into blocks and blocks that are
//!    mostly links or too short to carry content are removed. Headings and
//!    code blocks always survive.

use crate::convert::{convert, Tag};

/// Elements dropped by default
const DEFAULT_EXCLUDED_TAGS: &[&str] = &["nav", "header", "footer", "aside", "form", "menu"];

/// `class`/`id` prefixes that mark boilerplate containers
const DEFAULT_BOILERPLATE_MARKERS: &[&str] = &[
    "nav",
    "menu",
    "footer",
    "sidebar",
    "cookie",
    "banner",
    "breadcrumb",
    "advert",
    "social",
    "share",
    "popup",
    "newsletter",
];

/// Containers that are never dropped by marker, whatever their class says
const STRUCTURAL_TAGS: &[&str] = &["html", "body", "main", "article"];

/// Default minimum number of words for a block to be kept
pub const DEFAULT_MIN_WORD_THRESHOLD: usize = 3;

/// Default maximum share of link text in a kept block
pub const DEFAULT_MAX_LINK_DENSITY: f64 = 0.5;

/// Boilerplate remover applied on top of the markdown conversion
#[derive(Debug, Clone, PartialEq)]
pub struct PruningFilter {
    excluded_tags: Vec<String>,
    boilerplate_markers: Vec<String>,
    min_word_threshold: usize,
    max_link_density: f64,
}

impl Default for PruningFilter {
    fn default() -> Self {
        Self {
            excluded_tags: DEFAULT_EXCLUDED_TAGS.iter().map(|t| t.to_string()).collect(),
            boilerplate_markers: DEFAULT_BOILERPLATE_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            min_word_threshold: DEFAULT_MIN_WORD_THRESHOLD,
            max_link_density: DEFAULT_MAX_LINK_DENSITY,
        }
    }
}

impl PruningFilter {
    /// Create a filter with the default rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum number of words for a block to be kept
    pub fn min_word_threshold(mut self, words: usize) -> Self {
        self.min_word_threshold = words;
        self
    }

    /// Maximum share of link text (0.0 - 1.0) in a kept block
    pub fn max_link_density(mut self, density: f64) -> Self {
        self.max_link_density = density.clamp(0.0, 1.0);
        self
    }

    /// Drop an additional element type
    pub fn exclude_tag(mut self, tag: impl Into<String>) -> Self {
        self.excluded_tags.push(tag.into().to_ascii_lowercase());
        self
    }

    /// Convert HTML to pruned markdown
    pub fn html_to_fit_markdown(&self, html: &str) -> String {
        let markdown = convert(html, |tag| self.is_boilerplate(tag));
        self.prune_blocks(&markdown)
    }

    fn is_boilerplate(&self, tag: &Tag) -> bool {
        if self.excluded_tags.iter().any(|t| *t == tag.name) {
            return true;
        }
        if STRUCTURAL_TAGS.contains(&tag.name.as_str()) {
            return false;
        }

        ["class", "id"]
            .iter()
            .filter_map(|attr| tag.attribute(attr))
            .any(|value| {
                value
                    .to_ascii_lowercase()
                    .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
                    .any(|token| {
                        self.boilerplate_markers
                            .iter()
                            .any(|marker| token.starts_with(marker.as_str()))
                    })
            })
    }

    /// Remove link-heavy and near-empty blocks from markdown
    fn prune_blocks(&self, markdown: &str) -> String {
        split_blocks(markdown)
            .into_iter()
            .filter(|block| self.keep_block(block))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn keep_block(&self, block: &str) -> bool {
        let first = block.trim_start();
        if first.starts_with('#') || first.starts_with("```") {
            return true;
        }

        let (visible, linked) = split_links(block);
        let words = visible
            .split_whitespace()
            .filter(|word| word.chars().any(char::is_alphanumeric))
            .count();
        if words < self.min_word_threshold {
            return false;
        }

        let total = visible.chars().filter(|c| !c.is_whitespace()).count();
        if total == 0 {
            return false;
        }
        (linked as f64 / total as f64) <= self.max_link_density
    }
}

/// Split markdown into blank-line separated blocks, keeping fenced code intact
fn split_blocks(markdown: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if line.trim().is_empty() && !in_fence {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
            continue;
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
}

/// Replace `[text](url)` with `text`, returning the visible text and the
/// number of non-whitespace characters that sat inside links.
/// Image alt text counts as visible but not linked.
fn split_links(block: &str) -> (String, usize) {
    let mut visible = String::with_capacity(block.len());
    let mut linked = 0;
    let mut rest = block;

    while let Some(open) = rest.find('[') {
        let is_image = rest[..open].ends_with('!');
        let before = if is_image { &rest[..open - 1] } else { &rest[..open] };
        visible.push_str(before);

        let after = &rest[open + 1..];
        let target = after.find("](").and_then(|close| {
            after[close + 2..]
                .find(')')
                .map(|end| (close, close + 2 + end))
        });

        match target {
            Some((close, end)) => {
                let text = &after[..close];
                visible.push_str(text);
                if !is_image {
                    linked += text.chars().filter(|c| !c.is_whitespace()).count();
                }
                rest = &after[end + 1..];
            }
            None => {
                visible.push('[');
                rest = after;
            }
        }
    }
    visible.push_str(rest);

    (visible, linked)
}
