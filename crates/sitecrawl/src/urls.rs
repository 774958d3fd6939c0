//! URL list loading

use crate::error::CrawlError;
use std::path::Path;
use tracing::{error, info};

/// Read a newline-delimited URL list.
///
/// Lines are trimmed and blank lines skipped; order and duplicates are kept.
pub fn read_urls(path: impl AsRef<Path>) -> Result<Vec<String>, CrawlError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| CrawlError::io(path, e))?;
    Ok(parse_url_list(&content))
}

/// Parse URL list text into its non-blank, trimmed lines
pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load a URL list, reporting failures instead of returning them.
///
/// A missing or unreadable file yields an empty list.
pub fn load_urls(path: impl AsRef<Path>) -> Vec<String> {
    let path = path.as_ref();
    match read_urls(path) {
        Ok(urls) => {
            info!("Loaded {} URLs from {}", urls.len(), path.display());
            urls
        }
        Err(e) if e.is_not_found() => {
            error!("URLs file not found at {}", path.display());
            Vec::new()
        }
        Err(e) => {
            error!("Could not read URLs from {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_capture::capture_logs;
    use std::io::Write;

    #[test]
    fn test_parse_url_list() {
        let content = "https://a.example/page1\n\n  https://b.example/x/y  \r\n\t\nhttps://a.example/page1\n";
        assert_eq!(
            parse_url_list(content),
            vec![
                "https://a.example/page1",
                "https://b.example/x/y",
                "https://a.example/page1",
            ]
        );
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_url_list("").is_empty());
        assert!(parse_url_list("\n \n\t\n").is_empty());
    }

    #[test]
    fn test_load_urls_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "https://a.example/page1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "https://b.example/x/y").unwrap();

        let (urls, logs) = capture_logs(|| load_urls(file.path()));
        assert_eq!(urls, vec!["https://a.example/page1", "https://b.example/x/y"]);
        assert!(logs.contains(&format!("Loaded 2 URLs from {}", file.path().display())));
    }

    #[test]
    fn test_load_urls_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        let (urls, logs) = capture_logs(|| load_urls(&path));
        assert!(urls.is_empty());
        assert!(logs.contains(&format!("URLs file not found at {}", path.display())));
    }

    #[test]
    fn test_read_urls_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_urls(dir.path().join("nope.txt")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_load_urls_unreadable_path() {
        // A directory cannot be read as a URL list
        let dir = tempfile::tempdir().unwrap();
        assert!(load_urls(dir.path()).is_empty());
        assert!(!read_urls(dir.path()).unwrap_err().is_not_found());
    }
}
