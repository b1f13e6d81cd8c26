//! Directory listing parsing

use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

/// Unique archive names matching `pattern` in an HTML directory listing, sorted
pub fn parse_listing(html: &str, pattern: &Regex) -> Vec<String> {
    pattern
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Names from `listing` with no file of that name in `data_dir` yet
pub fn pending_files(listing: &[String], data_dir: &Path) -> Vec<String> {
    listing
        .iter()
        .filter(|name| !data_dir.join(name.as_str()).exists())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<html><body><pre>
<a href="frwiki-latest-pages-articles1.xml-p1p306134.bz2">frwiki-latest-pages-articles1.xml-p1p306134.bz2</a>   21-Oct-2026 12:00  281474976
<a href="frwiki-latest-pages-articles1.xml-p1p306134.bz2-rss.xml">frwiki-latest-pages-articles1.xml-p1p306134.bz2-rss.xml</a>
<a href="frwiki-latest-pages-articles-multistream.xml.bz2">frwiki-latest-pages-articles-multistream.xml.bz2</a>
<a href="frwiki-latest-pages-articles2.xml-p306135p1050822.bz2">frwiki-latest-pages-articles2.xml-p306135p1050822.bz2</a>
<a href="frwiki-latest-abstract.xml.gz">frwiki-latest-abstract.xml.gz</a>
</pre></body></html>"#;

    fn pattern() -> Regex {
        Regex::new(r"frwiki-latest-pages-articles\w+\.xml-\w+\.bz2").unwrap()
    }

    #[test]
    fn test_parse_listing_unique_and_sorted() {
        let names = parse_listing(LISTING, &pattern());
        assert_eq!(
            names,
            vec![
                "frwiki-latest-pages-articles1.xml-p1p306134.bz2".to_string(),
                "frwiki-latest-pages-articles2.xml-p306135p1050822.bz2".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_listing_no_match() {
        assert!(parse_listing("<html></html>", &pattern()).is_empty());
    }

    #[test]
    fn test_pending_skips_present_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("frwiki-latest-pages-articles1.xml-p1p306134.bz2"),
            b"already here",
        )
        .unwrap();

        let listing = parse_listing(LISTING, &pattern());
        let pending = pending_files(&listing, dir.path());
        assert_eq!(
            pending,
            vec!["frwiki-latest-pages-articles2.xml-p306135p1050822.bz2".to_string()]
        );
    }

    #[test]
    fn test_partial_download_does_not_count_as_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.xml-p1.bz2.part"), b"half").unwrap();

        let listing = vec!["a.xml-p1.bz2".to_string()];
        assert_eq!(pending_files(&listing, dir.path()), listing);
    }
}
