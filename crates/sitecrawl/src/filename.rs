//! Output filenames derived from page URLs

/// Maximum number of characters kept before the extension
pub const MAX_STEM_CHARS: usize = 150;

/// Extension of written pages
pub const MARKDOWN_EXTENSION: &str = ".md";

/// Derive the markdown filename for a URL.
///
/// Scheme prefixes are removed, path separators and every character that is
/// not alphanumeric, `_` or `-` become `_`, the stem is capped at
/// [`MAX_STEM_CHARS`] characters and `.md` is appended.
pub fn markdown_filename(url: &str) -> String {
    let stem: String = url
        .replace("http://", "")
        .replace("https://", "")
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_CHARS)
        .collect();

    format!("{}{}", stem, MARKDOWN_EXTENSION)
}
