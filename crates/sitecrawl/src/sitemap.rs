//! Sitemap URL extraction.
//!
//! Reads a local sitemap file and lists the `<loc>` of every `<url>` entry.
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/</loc>
//!     <lastmod>2025-01-01</lastmod>
//!   </url>
//! </urlset>
//! ```
//!
//! Elements are looked up in the sitemaps.org namespace first. Documents
//! that never declare it are handled by a second, unprefixed lookup.
//! Sitemap index documents (`<sitemapindex><sitemap><loc>`) are detected and
//! their entries reported, but the referenced sitemaps are not fetched.

use crate::error::CrawlError;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info};

/// Sitemap protocol namespace
pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// URLs listed by a sitemap document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sitemap {
    /// `<url><loc>` values in document order
    pub urls: Vec<String>,

    /// One entry per `<sitemap>` element of an index document
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_sitemaps: Vec<Option<String>>,
}

impl Sitemap {
    /// True when the document lists other sitemaps
    pub fn is_index(&self) -> bool {
        !self.sub_sitemaps.is_empty()
    }

    /// Locations of the listed sub-sitemaps, skipping entries without one
    pub fn sub_sitemap_locs(&self) -> Vec<&str> {
        self.sub_sitemaps.iter().flatten().map(String::as_str).collect()
    }
}

/// How an element name must be qualified to match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameForm {
    /// Bound to [`SITEMAP_NS`], by default namespace or prefix
    Namespaced,
    /// No namespace at all
    Unprefixed,
}

impl NameForm {
    fn of(resolved: &ResolveResult<'_>) -> Option<Self> {
        match resolved {
            ResolveResult::Bound(Namespace(ns)) if *ns == SITEMAP_NS.as_bytes() => {
                Some(NameForm::Namespaced)
            }
            ResolveResult::Unbound => Some(NameForm::Unprefixed),
            _ => None,
        }
    }
}

/// `<loc>` candidates of the entry being read
#[derive(Default)]
struct Locs {
    namespaced: Option<String>,
    unprefixed: Option<String>,
}

impl Locs {
    /// Keep the first `<loc>` of each form
    fn record(&mut self, form: NameForm, text: &str) {
        let slot = match form {
            NameForm::Namespaced => &mut self.namespaced,
            NameForm::Unprefixed => &mut self.unprefixed,
        };
        slot.get_or_insert_with(|| text.trim().to_string());
    }

    /// Namespaced `<loc>` wins; empty text counts as no location
    fn take(&mut self) -> Option<String> {
        let loc = self.namespaced.take();
        let fallback = self.unprefixed.take();
        loc.or(fallback).filter(|loc| !loc.is_empty())
    }
}

/// Parse sitemap XML.
///
/// Fails only when the document is not well-formed.
pub fn parse_sitemap(xml: &str) -> Result<Sitemap, CrawlError> {
    let mut urls = collect_entries(xml, b"url", NameForm::Namespaced)?;
    if urls.is_empty() {
        urls = collect_entries(xml, b"url", NameForm::Unprefixed)?;
    }

    let mut sub_sitemaps = collect_entries(xml, b"sitemap", NameForm::Namespaced)?;
    if sub_sitemaps.is_empty() {
        sub_sitemaps = collect_entries(xml, b"sitemap", NameForm::Unprefixed)?;
    }

    Ok(Sitemap {
        urls: urls.into_iter().flatten().collect(),
        sub_sitemaps,
    })
}

/// Read and parse a sitemap file
pub fn read_sitemap(path: impl AsRef<Path>) -> Result<Sitemap, CrawlError> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path).map_err(|e| CrawlError::io(path, e))?;
    parse_sitemap(&xml)
}

/// Read a sitemap file, reporting failures instead of returning them.
///
/// Sitemap index entries are logged. A file that cannot be read or parsed
/// yields an empty sitemap.
pub fn load_sitemap(path: impl AsRef<Path>) -> Sitemap {
    let path = path.as_ref();
    match read_sitemap(path) {
        Ok(sitemap) => {
            if sitemap.is_index() {
                info!(
                    "Sitemap index detected. You'll need to parse these sub-sitemaps: {:?}",
                    sitemap.sub_sitemap_locs()
                );
            }
            sitemap
        }
        Err(e @ CrawlError::SitemapParse { .. }) => {
            error!("Error parsing sitemap XML at {}: {}", path.display(), e);
            Sitemap::default()
        }
        Err(e) => {
            error!("An unexpected error occurred during sitemap parsing: {}", e);
            Sitemap::default()
        }
    }
}

/// Extract the page URLs listed by a sitemap file.
///
/// Returns an empty list when the file cannot be read or parsed.
pub fn extract_urls_from_sitemap(path: impl AsRef<Path>) -> Vec<String> {
    load_sitemap(path).urls
}

/// Walk the document and return one entry per `container` element in the
/// given form, holding its `<loc>` text when present.
fn collect_entries(
    xml: &str,
    container: &[u8],
    form: NameForm,
) -> Result<Vec<Option<String>>, CrawlError> {
    let mut reader = NsReader::from_str(xml);
    let mut entries = Vec::new();
    let mut depth: usize = 0;
    let mut saw_root = false;
    let mut root_closed = false;
    // Depth of the open container element
    let mut open_entry: Option<usize> = None;
    let mut locs = Locs::default();
    // Text of a `<loc>` that is a direct child of the open container
    let mut loc: Option<(NameForm, String)> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(parse_error(reader.error_position() as u64, e)),
        };

        if root_closed && !allowed_after_root(&event) {
            return Err(parse_error(
                reader.buffer_position() as u64,
                "junk after document element",
            ));
        }

        match event {
            Event::Start(e) => {
                depth += 1;
                saw_root = true;
                let (resolved, local) = reader.resolve_element(e.name());
                let element_form = NameForm::of(&resolved);
                match open_entry {
                    None if local.as_ref() == container && element_form == Some(form) => {
                        open_entry = Some(depth);
                        locs = Locs::default();
                    }
                    Some(open) if depth == open + 1 && local.as_ref() == b"loc" => {
                        loc = element_form.map(|f| (f, String::new()));
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                saw_root = true;
                if depth == 0 {
                    root_closed = true;
                }
                let (resolved, local) = reader.resolve_element(e.name());
                let element_form = NameForm::of(&resolved);
                match open_entry {
                    None if local.as_ref() == container && element_form == Some(form) => {
                        entries.push(None);
                    }
                    Some(open) if depth == open && local.as_ref() == b"loc" => {
                        if let Some(f) = element_form {
                            locs.record(f, "");
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                if let Some((_, text)) = loc.as_mut() {
                    let decoded = t
                        .decode()
                        .map_err(|e| parse_error(reader.buffer_position() as u64, e))?;
                    text.push_str(&decoded);
                }
            }
            Event::CData(t) => {
                if let Some((_, text)) = loc.as_mut() {
                    let decoded = t
                        .decode()
                        .map_err(|e| parse_error(reader.buffer_position() as u64, e))?;
                    text.push_str(&decoded);
                }
            }
            Event::GeneralRef(r) => {
                if let Some((_, text)) = loc.as_mut() {
                    let resolved = resolve_reference(&r)
                        .map_err(|e| parse_error(reader.buffer_position() as u64, e))?;
                    text.push_str(&resolved);
                }
            }
            Event::End(_) => {
                if let Some(open) = open_entry {
                    if depth == open + 1 {
                        if let Some((f, text)) = loc.take() {
                            locs.record(f, &text);
                        }
                    } else if depth == open {
                        entries.push(locs.take());
                        open_entry = None;
                    }
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    root_closed = true;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(parse_error(0, "document has no root element"));
    }
    if depth != 0 {
        return Err(parse_error(
            xml.len() as u64,
            "unexpected end of document: unclosed element",
        ));
    }

    Ok(entries)
}

/// Only whitespace, comments and processing instructions may follow the root
fn allowed_after_root(event: &Event<'_>) -> bool {
    match event {
        Event::Text(t) => t.iter().all(u8::is_ascii_whitespace),
        Event::Comment(_) | Event::PI(_) | Event::Eof => true,
        _ => false,
    }
}

/// Resolve a character or predefined entity reference
fn resolve_reference(r: &BytesRef<'_>) -> Result<String, String> {
    if let Some(ch) = r.resolve_char_ref().map_err(|e| e.to_string())? {
        return Ok(ch.to_string());
    }
    let name = r.decode().map_err(|e| e.to_string())?;
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| format!("unknown entity reference &{};", name))
}

fn parse_error(position: u64, message: impl std::fmt::Display) -> CrawlError {
    CrawlError::SitemapParse {
        position,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_capture::capture_logs;

    const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/</loc>
    <lastmod>2025-01-01</lastmod>
  </url>
  <url>
    <loc>
      https://example.com/about
    </loc>
  </url>
  <url><loc>https://example.com/blog/first-post</loc></url>
</urlset>"#;

    #[test]
    fn test_namespaced_urlset() {
        let sitemap = parse_sitemap(URLSET).unwrap();
        assert_eq!(
            sitemap.urls,
            vec![
                "https://example.com/",
                "https://example.com/about",
                "https://example.com/blog/first-post",
            ]
        );
        assert!(!sitemap.is_index());
    }

    #[test]
    fn test_unprefixed_urlset() {
        let xml = URLSET.replace(r#" xmlns="http://www.sitemaps.org/schemas/sitemap/0.9""#, "");
        let sitemap = parse_sitemap(&xml).unwrap();
        assert_eq!(sitemap, parse_sitemap(URLSET).unwrap());
    }

    #[test]
    fn test_prefixed_urlset() {
        let xml = r#"<sm:urlset xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sm:url><sm:loc>https://example.com/a</sm:loc></sm:url>
  <sm:url><sm:loc>https://example.com/b</sm:loc></sm:url>
</sm:urlset>"#;
        let sitemap = parse_sitemap(xml).unwrap();
        assert_eq!(sitemap.urls, vec!["https://example.com/a", "https://example.com/b"]);
    }

    #[test]
    fn test_foreign_namespace_ignored() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
        xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
  <url>
    <loc>https://example.com/gallery</loc>
    <image:image><image:loc>https://example.com/photo.jpg</image:loc></image:image>
  </url>
</urlset>"#;
        let sitemap = parse_sitemap(xml).unwrap();
        assert_eq!(sitemap.urls, vec!["https://example.com/gallery"]);
    }

    #[test]
    fn test_unqualified_loc_fallback() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc xmlns="">https://example.com/plain</loc></url>
</urlset>"#;
        let sitemap = parse_sitemap(xml).unwrap();
        assert_eq!(sitemap.urls, vec!["https://example.com/plain"]);
    }

    #[test]
    fn test_entities_and_cdata() {
        let xml = r#"<urlset>
  <url><loc>https://example.com/search?q=rust&amp;page=2</loc></url>
  <url><loc><![CDATA[https://example.com/?a=1&b=2]]></loc></url>
  <url><loc>https://example.com/caf&#233;</loc></url>
</urlset>"#;
        let sitemap = parse_sitemap(xml).unwrap();
        assert_eq!(
            sitemap.urls,
            vec![
                "https://example.com/search?q=rust&page=2",
                "https://example.com/?a=1&b=2",
                "https://example.com/café",
            ]
        );
    }

    #[test]
    fn test_entries_without_location_skipped() {
        let xml = r#"<urlset>
  <url><lastmod>2025-01-01</lastmod></url>
  <url><loc>   </loc></url>
  <url><loc/></url>
  <url/>
  <url><loc>https://example.com/kept</loc></url>
</urlset>"#;
        let sitemap = parse_sitemap(xml).unwrap();
        assert_eq!(sitemap.urls, vec!["https://example.com/kept"]);
    }

    #[test]
    fn test_sitemap_index_detected() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap>
    <loc>https://example.com/sitemap-pages.xml</loc>
    <lastmod>2025-01-01</lastmod>
  </sitemap>
  <sitemap><loc>https://example.com/sitemap-posts.xml</loc></sitemap>
</sitemapindex>"#;
        let sitemap = parse_sitemap(xml).unwrap();
        assert!(sitemap.urls.is_empty());
        assert!(sitemap.is_index());
        assert_eq!(
            sitemap.sub_sitemap_locs(),
            vec![
                "https://example.com/sitemap-pages.xml",
                "https://example.com/sitemap-posts.xml",
            ]
        );
    }

    #[test]
    fn test_malformed_xml() {
        let err = parse_sitemap("<urlset><url><loc>x</url></urlset>").unwrap_err();
        assert!(matches!(err, CrawlError::SitemapParse { .. }));

        let err = parse_sitemap("<urlset><url><loc>https://example.com</loc></url>").unwrap_err();
        assert!(matches!(err, CrawlError::SitemapParse { .. }));

        let err = parse_sitemap("this is not xml").unwrap_err();
        assert!(matches!(err, CrawlError::SitemapParse { .. }));
    }

    #[test]
    fn test_content_after_root_rejected() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>https://a.example/</loc></url></urlset><url><loc>https://b.example/</loc></url>"#;
        let err = parse_sitemap(xml).unwrap_err();
        assert!(matches!(err, CrawlError::SitemapParse { .. }));
        assert!(err.to_string().contains("junk after document element"));

        for xml in [
            "<urlset></urlset><urlset></urlset>",
            "<urlset></urlset>junk",
            "<urlset/><url/>",
            "<urlset></urlset><![CDATA[x]]>",
            "<urlset></urlset>&amp;",
        ] {
            assert!(
                matches!(parse_sitemap(xml), Err(CrawlError::SitemapParse { .. })),
                "accepted {xml:?}"
            );
        }
    }

    #[test]
    fn test_trailing_whitespace_and_comments_allowed() {
        let xml = format!("{URLSET}\n\n<!-- generated -->\n<?pi data?>\n");
        let sitemap = parse_sitemap(&xml).unwrap();
        assert_eq!(sitemap.urls.len(), 3);
    }

    #[test]
    fn test_extract_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.xml");
        std::fs::write(&path, URLSET).unwrap();

        let urls = extract_urls_from_sitemap(&path);
        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], "https://example.com/");
    }

    #[test]
    fn test_extract_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xml");
        std::fs::write(&path, "<urlset><url><loc>https://example.com</url>").unwrap();

        let (urls, logs) = capture_logs(|| extract_urls_from_sitemap(&path));
        assert!(urls.is_empty());
        assert!(logs.contains(&format!(
            "Error parsing sitemap XML at {}: XML parse error at position",
            path.display()
        )));
    }

    #[test]
    fn test_load_index_logs_sub_sitemaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.xml");
        std::fs::write(
            &path,
            r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/sitemap-pages.xml</loc></sitemap>
</sitemapindex>"#,
        )
        .unwrap();

        let (sitemap, logs) = capture_logs(|| load_sitemap(&path));
        assert!(sitemap.urls.is_empty());
        assert!(logs.contains(
            "Sitemap index detected. You'll need to parse these sub-sitemaps: [\"https://example.com/sitemap-pages.xml\"]"
        ));
    }

    #[test]
    fn test_extract_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (urls, logs) =
            capture_logs(|| extract_urls_from_sitemap(dir.path().join("missing.xml")));
        assert!(urls.is_empty());
        assert!(logs.contains("An unexpected error occurred during sitemap parsing: I/O error at"));
        assert!(read_sitemap(dir.path().join("missing.xml"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_sitemap_serialization() {
        let sitemap = parse_sitemap(URLSET).unwrap();
        let json = serde_json::to_string(&sitemap).unwrap();
        assert!(json.contains("\"urls\":[\"https://example.com/\""));
        assert!(!json.contains("sub_sitemaps"));
    }
}
