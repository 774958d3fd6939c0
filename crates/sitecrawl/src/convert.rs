//! HTML to markdown conversion

use std::iter::Peekable;
use std::str::Chars;

/// Elements whose content never reaches the output
const SKIP_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "iframe", "svg", "template",
];

/// Elements without a closing tag
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Check if content is HTML based on content type and body
pub fn is_html(content_type: Option<&str>, body: &str) -> bool {
    if let Some(ct) = content_type {
        let ct_lower = ct.to_lowercase();
        if ct_lower.contains("text/html") || ct_lower.contains("application/xhtml") {
            return true;
        }
    }

    let head: String = body.trim_start().chars().take(15).collect();
    let head = head.to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Convert HTML to markdown
pub fn html_to_markdown(html: &str) -> String {
    convert(html, |_| false)
}

/// A parsed start or end tag
#[derive(Debug)]
pub(crate) struct Tag {
    /// Lowercased element name
    pub(crate) name: String,
    raw: String,
    pub(crate) closing: bool,
    pub(crate) self_closing: bool,
}

impl Tag {
    fn parse(raw: &str) -> Option<Tag> {
        let closing = raw.starts_with('/');
        let name: String = raw
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect::<String>()
            .to_ascii_lowercase();

        // Doctype, comments and processing instructions carry no name
        if name.is_empty() {
            return None;
        }

        Some(Tag {
            self_closing: raw.trim_end().ends_with('/') || VOID_TAGS.contains(&name.as_str()),
            name,
            raw: raw.to_string(),
            closing,
        })
    }

    /// Attribute value, if present
    pub(crate) fn attribute(&self, attr: &str) -> Option<String> {
        extract_attribute(&self.raw, attr)
    }
}

/// Convert HTML to markdown, dropping every element for which
/// `drop_element` returns true together with its content.
pub(crate) fn convert<F>(html: &str, mut drop_element: F) -> String
where
    F: FnMut(&Tag) -> bool,
{
    let mut output = String::new();
    let mut skip: Option<(String, usize)> = None;
    let mut list_depth: usize = 0;
    let mut in_pre = false;
    let mut links: Vec<Option<String>> = Vec::new();

    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '<' {
            if skip.is_some() {
                continue;
            }
            let decoded = if c == '&' {
                decode_entity(&mut chars).unwrap_or('&')
            } else {
                c
            };
            if !in_pre && decoded.is_whitespace() {
                if !output.is_empty() && !output.ends_with([' ', '\n']) {
                    output.push(' ');
                }
            } else {
                output.push(decoded);
            }
            continue;
        }

        let raw = read_tag(&mut chars);
        let Some(tag) = Tag::parse(&raw) else {
            continue;
        };

        // Inside a dropped element only its own nesting matters
        if let Some((name, mut depth)) = skip.take() {
            if tag.name == name && !tag.self_closing {
                if tag.closing {
                    depth -= 1;
                } else {
                    depth += 1;
                }
            }
            if depth > 0 {
                skip = Some((name, depth));
            }
            continue;
        }

        let skipped = SKIP_TAGS.contains(&tag.name.as_str());
        if !tag.closing && (skipped || drop_element(&tag)) {
            if !tag.self_closing {
                skip = Some((tag.name.clone(), 1));
            }
            continue;
        }
        if skipped {
            continue;
        }

        let is_closing = tag.closing;
        match tag.name.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if !is_closing {
                    let level = usize::from(tag.name.as_bytes()[1] - b'0');
                    output.push('\n');
                    output.push_str(&"#".repeat(level));
                    output.push(' ');
                } else {
                    output.push_str("\n\n");
                }
            }
            "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "nav"
            | "aside" | "table" => {
                if is_closing {
                    output.push_str("\n\n");
                }
            }
            "tr" => {
                if is_closing {
                    output.push('\n');
                }
            }
            "td" | "th" => {
                if !is_closing && !output.ends_with([' ', '\n']) {
                    output.push(' ');
                }
            }
            "br" => {
                output.push('\n');
            }
            "hr" => {
                output.push_str("\n---\n");
            }
            "ul" | "ol" => {
                if is_closing {
                    list_depth = list_depth.saturating_sub(1);
                    if list_depth == 0 {
                        output.push('\n');
                    }
                } else {
                    list_depth += 1;
                }
            }
            "li" => {
                if !is_closing {
                    output.push('\n');
                    for _ in 0..list_depth.saturating_sub(1) {
                        output.push_str("  ");
                    }
                    output.push_str("- ");
                }
            }
            "strong" | "b" => {
                output.push_str("**");
            }
            "em" | "i" => {
                output.push('*');
            }
            "pre" => {
                output.push_str("\n```\n");
                in_pre = !is_closing;
            }
            "code" => {
                if !in_pre {
                    output.push('`');
                }
            }
            "blockquote" => {
                if !is_closing {
                    output.push_str("\n> ");
                } else {
                    output.push('\n');
                }
            }
            "a" => {
                if !is_closing {
                    if !tag.self_closing {
                        let href = tag.attribute("href").filter(|href| !href.is_empty());
                        if href.is_some() {
                            output.push('[');
                        }
                        links.push(href);
                    }
                } else if let Some(href) = links.pop().flatten() {
                    output.push_str("](");
                    output.push_str(&href);
                    output.push(')');
                }
            }
            "img" => {
                if let Some(src) = tag.attribute("src") {
                    let alt = tag.attribute("alt").unwrap_or_default();
                    output.push_str(&format!("![{}]({})", alt, src));
                }
            }
            _ => {}
        }
    }

    tidy_lines(&output)
}

/// Read the rest of a tag after `<`, comments included
fn read_tag(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut tag = String::new();
    for next in chars.by_ref() {
        if next == '>' && !(tag.starts_with("!--") && !tag.ends_with("--")) {
            break;
        }
        tag.push(next);
    }
    tag
}

/// Extract attribute value from tag
fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let pattern = format!("{}=", attr.to_ascii_lowercase());
    let tag_lower = tag.to_ascii_lowercase();

    // Only whole attribute names: `id=` must not match `data-id=`
    let start = tag_lower.match_indices(&pattern).find_map(|(idx, _)| {
        let preceded_by_space = tag_lower[..idx]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        preceded_by_space.then_some(idx)
    })?;

    let rest = tag[start + pattern.len()..].trim_start();

    if let Some(rest) = rest.strip_prefix('"') {
        rest.find('"').map(|end| rest[..end].to_string())
    } else if let Some(rest) = rest.strip_prefix('\'') {
        rest.find('\'').map(|end| rest[..end].to_string())
    } else {
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        Some(rest[..end].to_string())
    }
}

/// Decode the HTML entity following an ampersand.
///
/// Consumes the entity only when it is recognised; otherwise the iterator
/// is left untouched and the caller keeps the literal `&`.
fn decode_entity(chars: &mut Peekable<Chars<'_>>) -> Option<char> {
    let mut lookahead = chars.clone();
    let mut entity = String::new();

    while let Some(&next) = lookahead.peek() {
        if next == ';' {
            break;
        }
        if !(next.is_ascii_alphanumeric() || next == '#') || entity.len() >= 10 {
            return None;
        }
        entity.push(next);
        lookahead.next();
    }
    if lookahead.peek() != Some(&';') {
        return None;
    }

    let decoded = match entity.as_str() {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "mdash" => '—',
        "ndash" => '–',
        "hellip" => '…',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "copy" => '©',
        "reg" => '®',
        _ => {
            let num_str = entity.strip_prefix('#')?;
            let code = match num_str.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num_str.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        }
    };

    // Entity name plus the terminating semicolon
    for _ in 0..=entity.len() {
        chars.next();
    }
    Some(decoded)
}

/// Trim line ends, keep at most one blank line in a row, trim the ends.
/// Leading indentation inside the text is preserved.
pub fn tidy_lines(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut blank_run = 0;

    for line in s.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run == 1 {
                result.push('\n');
            }
            continue;
        }
        blank_run = 0;
        result.push_str(line);
        result.push('\n');
    }

    result.trim().to_string()
}

/// Filter excessive newlines: keep at most 2 consecutive newlines
pub fn filter_excessive_newlines(s: &str) -> String {
    let mut result = String::new();
    let mut newline_count = 0;

    for c in s.chars() {
        if c == '\n' {
            newline_count += 1;
            if newline_count <= 2 {
                result.push(c);
            }
        } else {
            newline_count = 0;
            result.push(c);
        }
    }

    result
}
