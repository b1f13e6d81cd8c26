//! Core types and traits for dump extraction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Classification of a page by its title prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamespaceClass {
    /// Main namespace article
    Article,
    /// Portal pages (`Portail:`)
    Portal,
    /// Project pages (`Projet:`)
    Project,
    /// Category pages (`Catégorie:`)
    Category,
    /// Encyclopedia meta pages (`Wikipédia:`)
    Meta,
    /// Any other non-article namespace
    Other,
}

impl NamespaceClass {
    /// Only articles are cleaned and emitted
    pub fn is_article(self) -> bool {
        matches!(self, NamespaceClass::Article)
    }
}

/// One `page` element as read from the dump, before any filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub title: String,
    pub namespace_class: NamespaceClass,
    /// Verbatim wiki markup
    pub body: String,
    pub is_redirect: bool,
}

/// An accepted article, ready to be written to the corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedDocument {
    pub title: String,
    /// Title, a newline, then the cleaned body
    pub text: String,
}

impl CleanedDocument {
    /// Build a document from a title and an already cleaned body
    pub fn new(title: impl Into<String>, cleaned_body: &str) -> Self {
        let title = title.into();
        let mut text = String::with_capacity(title.len() + cleaned_body.len() + 1);
        text.push_str(&title);
        text.push('\n');
        text.push_str(cleaned_body);
        Self { title, text }
    }

    /// The cleaned body without the leading title line
    pub fn body(&self) -> &str {
        self.text
            .split_once('\n')
            .map(|(_, body)| body)
            .unwrap_or_default()
    }
}

/// Why a page or a cleaned document was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// Title or body missing or empty
    MissingField,
    /// Body is a redirect to another page
    Redirect,
    /// Title carries a non-article namespace prefix
    ExcludedNamespace,
    /// Cleaned text still contains markup residue
    BlacklistedResidue,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::Redirect => "redirect",
            Self::ExcludedNamespace => "excluded_namespace",
            Self::BlacklistedResidue => "blacklisted_residue",
        }
    }

    /// Malformed records are worth a warning; the rest are plain filtering
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MissingField)
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction statistics for one archive or a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportStats {
    /// Completed `page` elements seen
    pub pages_seen: usize,
    /// Documents emitted to the corpus
    pub documents_accepted: usize,
    /// Pages dropped for a missing title or body
    pub missing_field: usize,
    /// Redirect pages dropped
    pub redirects: usize,
    /// Non-article pages dropped
    pub excluded_namespace: usize,
    /// Documents rejected by the residue gate
    pub blacklisted_residue: usize,
    /// Decompressed XML bytes consumed
    pub bytes_processed: u64,
    /// Processing time in seconds
    pub elapsed_seconds: f64,
    /// Accepted documents per second
    pub docs_per_second: f64,
}

impl ImportStats {
    /// Count one rejection under its reason
    pub fn record_rejection(&mut self, reason: RejectionReason) {
        match reason {
            RejectionReason::MissingField => self.missing_field += 1,
            RejectionReason::Redirect => self.redirects += 1,
            RejectionReason::ExcludedNamespace => self.excluded_namespace += 1,
            RejectionReason::BlacklistedResidue => self.blacklisted_residue += 1,
        }
    }

    /// Total pages or documents discarded for any reason
    pub fn rejected(&self) -> usize {
        self.missing_field + self.redirects + self.excluded_namespace + self.blacklisted_residue
    }

    /// Count for a single rejection reason
    pub fn rejected_for(&self, reason: RejectionReason) -> usize {
        match reason {
            RejectionReason::MissingField => self.missing_field,
            RejectionReason::Redirect => self.redirects,
            RejectionReason::ExcludedNamespace => self.excluded_namespace,
            RejectionReason::BlacklistedResidue => self.blacklisted_residue,
        }
    }

    /// Calculate documents per second
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.docs_per_second = self.documents_accepted as f64 / self.elapsed_seconds;
        }
    }

    /// Fold another archive's counts into this one.
    ///
    /// Elapsed time is left alone: archives may run concurrently, so the
    /// caller sets the wall-clock time of the whole run.
    pub fn merge(&mut self, other: &ImportStats) {
        self.pages_seen += other.pages_seen;
        self.documents_accepted += other.documents_accepted;
        self.missing_field += other.missing_field;
        self.redirects += other.redirects;
        self.excluded_namespace += other.excluded_namespace;
        self.blacklisted_residue += other.blacklisted_residue;
        self.bytes_processed += other.bytes_processed;
    }
}

/// Trait for dump sources that yield cleaned documents
pub trait DumpSource: Send {
    /// Lazily iterate over accepted documents
    fn iter_documents(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<CleanedDocument, ImportError>> + '_>;

    /// Reopen the dump from its first byte and reset counters
    fn restart(&mut self) -> Result<(), ImportError>;

    /// Counts for this source so far
    fn stats(&self) -> &ImportStats;

    /// Get the source name for display
    fn source_name(&self) -> &str;
}

/// Errors that can occur during extraction
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("Invalid dump format: {0}")]
    InvalidFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Output {} is already claimed by {}", output.display(), claimed_by.display())]
    OutputConflict { output: PathBuf, claimed_by: PathBuf },
}

impl From<quick_xml::Error> for ImportError {
    fn from(e: quick_xml::Error) -> Self {
        match e {
            // Decompressor failures reach us wrapped by the XML reader
            quick_xml::Error::Io(io) => {
                ImportError::Io(std::io::Error::new(io.kind(), io.to_string()))
            }
            other => ImportError::XmlParse(other.to_string()),
        }
    }
}

/// On-disk encoding of a dump file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DumpFormat {
    /// bzip2 compressed XML (`.xml.bz2`, `.xml-p1p2.bz2`)
    Bzip2Xml,
    /// Uncompressed XML
    PlainXml,
}

impl DumpFormat {
    /// Detect format from file path
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_lowercase();

        if name.ends_with(".bz2") {
            Some(DumpFormat::Bzip2Xml)
        } else if name.ends_with(".xml") {
            Some(DumpFormat::PlainXml)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleaned_document_layout() {
        let doc = CleanedDocument::new("Paris", "Paris est la capitale de la France.");
        assert_eq!(doc.text, "Paris\nParis est la capitale de la France.");
        assert_eq!(doc.body(), "Paris est la capitale de la France.");
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            DumpFormat::detect(Path::new("frwiki-latest-pages-articles.xml.bz2")),
            Some(DumpFormat::Bzip2Xml)
        );
        assert_eq!(
            DumpFormat::detect(Path::new(
                "frwiki-latest-pages-articles3.xml-p2550823p2977214.bz2"
            )),
            Some(DumpFormat::Bzip2Xml)
        );
        assert_eq!(
            DumpFormat::detect(Path::new("sample.xml")),
            Some(DumpFormat::PlainXml)
        );
        assert_eq!(DumpFormat::detect(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_stats_rejections_and_merge() {
        let mut a = ImportStats::default();
        a.record_rejection(RejectionReason::Redirect);
        a.record_rejection(RejectionReason::Redirect);
        a.record_rejection(RejectionReason::MissingField);
        a.documents_accepted = 4;

        let mut b = ImportStats::default();
        b.record_rejection(RejectionReason::BlacklistedResidue);
        b.documents_accepted = 1;

        a.merge(&b);
        assert_eq!(a.documents_accepted, 5);
        assert_eq!(a.rejected(), 4);
        assert_eq!(a.rejected_for(RejectionReason::Redirect), 2);
        assert_eq!(a.rejected_for(RejectionReason::BlacklistedResidue), 1);
    }

    #[test]
    fn test_only_missing_fields_are_malformed() {
        assert!(RejectionReason::MissingField.is_malformed());
        assert!(!RejectionReason::Redirect.is_malformed());
        assert!(!RejectionReason::ExcludedNamespace.is_malformed());
        assert!(!RejectionReason::BlacklistedResidue.is_malformed());
    }

    #[test]
    fn test_merge_keeps_elapsed_time() {
        let mut totals = ImportStats::default();
        for _ in 0..2 {
            totals.merge(&ImportStats {
                documents_accepted: 10,
                elapsed_seconds: 5.0,
                ..Default::default()
            });
        }
        totals.elapsed_seconds = 5.0;
        totals.update_rate();
        assert_eq!(totals.documents_accepted, 20);
        assert_eq!(totals.docs_per_second, 4.0);
    }

    #[test]
    fn test_quick_xml_io_error_maps_to_io() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        let err: ImportError = quick_xml::Error::Io(std::sync::Arc::new(io)).into();
        assert!(matches!(err, ImportError::Io(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    }
}
