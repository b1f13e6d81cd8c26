//! Wikimedia XML dump parser
//!
//! Pulls XML events from an archive one at a time and rebuilds one `page`
//! element at a time. Only the fields needed downstream are buffered, and the
//! partial page is dropped as soon as it has been judged, so memory stays
//! bounded by the largest single page rather than by the archive.

use super::archive::ArchiveReader;
use super::filter::{PageFilter, ResidueGate};
use super::progress::ImportProgress;
use super::source::{
    CleanedDocument, DumpFormat, DumpSource, ImportError, ImportStats, RawPage, RejectionReason,
};
use super::wikitext::WikiTextCleaner;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Wikimedia XML dump source
pub struct WikimediaSource {
    /// Path to the dump file
    path: PathBuf,
    /// Display name (file name)
    name: String,
    format: DumpFormat,
    reader: Reader<ArchiveReader>,
    cleaner: WikiTextCleaner,
    filter: PageFilter,
    gate: ResidueGate,
    /// Run-wide diagnostics, shared with the coordinator
    progress: Option<Arc<ImportProgress>>,
    /// Stop after this many accepted documents
    max_pages: Option<usize>,
    /// Page currently being assembled
    current_page: Option<PartialPage>,
    stats: ImportStats,
    started: Instant,
    /// Set after EOF or an error; the iterator is fused from then on
    finished: bool,
}

/// Child element whose text is being captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Ns,
    Text,
}

/// Partial page being built from XML events
#[derive(Debug, Default)]
struct PartialPage {
    title: Option<String>,
    namespace: Option<i32>,
    text: Option<String>,
    redirect: bool,
    capturing: Option<Field>,
    buffer: String,
}

impl PartialPage {
    fn start_capture(&mut self, field: Field) {
        // Dumps may carry several revisions; keep the first of each field
        let already_set = match field {
            Field::Title => self.title.is_some(),
            Field::Ns => self.namespace.is_some(),
            Field::Text => self.text.is_some(),
        };
        if !already_set {
            self.capturing = Some(field);
            self.buffer.clear();
        }
    }

    fn end_capture(&mut self, field: Field) {
        if self.capturing != Some(field) {
            return;
        }
        self.capturing = None;
        let value = std::mem::take(&mut self.buffer);
        match field {
            Field::Title => self.title = Some(value),
            Field::Ns => self.namespace = value.trim().parse().ok(),
            Field::Text => self.text = Some(value),
        }
    }

    /// Field presence check; hands the title back (if any) on failure for logging
    fn into_raw(self, filter: &PageFilter) -> Result<RawPage, Option<String>> {
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let body = self.text.filter(|t| !t.trim().is_empty());

        match (title, body) {
            (Some(title), Some(body)) => Ok(RawPage {
                namespace_class: filter.classify(&title, self.namespace),
                title,
                body,
                is_redirect: self.redirect,
            }),
            (title, _) => Err(title),
        }
    }
}

/// Result of parsing a page from the XML stream
enum ParseResult {
    /// Page accepted and cleaned
    Document(CleanedDocument),
    /// Page was rejected
    Skipped,
    /// End of file reached
    Eof,
}

fn field_for(local_name: &[u8]) -> Option<Field> {
    match local_name {
        b"title" => Some(Field::Title),
        b"ns" => Some(Field::Ns),
        b"text" => Some(Field::Text),
        _ => None,
    }
}

impl WikimediaSource {
    /// Open a dump file, detecting compression from its name
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let path = path.as_ref().to_path_buf();
        let archive = ArchiveReader::open(&path)?;
        let format = archive.format();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "wikimedia dump".to_string());

        Ok(Self {
            path,
            name,
            format,
            reader: Reader::from_reader(archive),
            cleaner: WikiTextCleaner::default(),
            filter: PageFilter::default(),
            gate: ResidueGate::default(),
            progress: None,
            max_pages: None,
            current_page: None,
            stats: ImportStats::default(),
            started: Instant::now(),
            finished: false,
        })
    }

    /// Set the markup cleaner
    pub fn with_cleaner(mut self, cleaner: WikiTextCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    /// Set the namespace/redirect filter
    pub fn with_filter(mut self, filter: PageFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the post-cleaning residue gate
    pub fn with_residue_gate(mut self, gate: ResidueGate) -> Self {
        self.gate = gate;
        self
    }

    /// Cap the number of accepted documents (sampling / testing)
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Report rejections and accepted documents to a run-wide tracker
    pub fn with_progress(mut self, progress: Arc<ImportProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn limit_reached(&self) -> bool {
        self.max_pages
            .is_some_and(|max| self.stats.documents_accepted >= max)
    }

    /// Parse the next page from the XML stream
    fn parse_next_page(&mut self) -> Result<ParseResult, ImportError> {
        let mut buf = Vec::with_capacity(8192);

        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let local = e.local_name();
                    match local.as_ref() {
                        b"page" => self.current_page = Some(PartialPage::default()),
                        b"redirect" => {
                            if let Some(ref mut page) = self.current_page {
                                page.redirect = true;
                            }
                        }
                        name => {
                            if let (Some(field), Some(page)) =
                                (field_for(name), self.current_page.as_mut())
                            {
                                page.start_capture(field);
                            }
                        }
                    }
                }
                Event::Empty(ref e) => {
                    if e.local_name().as_ref() == b"redirect" {
                        if let Some(ref mut page) = self.current_page {
                            page.redirect = true;
                        }
                    }
                }
                Event::Text(ref e) => {
                    if let Some(page) = self.current_page.as_mut() {
                        if page.capturing.is_some() {
                            page.buffer.push_str(&e.unescape()?);
                        }
                    }
                }
                Event::CData(ref e) => {
                    if let Some(page) = self.current_page.as_mut() {
                        if page.capturing.is_some() {
                            page.buffer.push_str(&String::from_utf8_lossy(e));
                        }
                    }
                }
                Event::End(ref e) => {
                    let local = e.local_name();
                    if local.as_ref() == b"page" {
                        if let Some(page) = self.current_page.take() {
                            return Ok(self.finish_page(page));
                        }
                    } else if let (Some(field), Some(page)) =
                        (field_for(local.as_ref()), self.current_page.as_mut())
                    {
                        page.end_capture(field);
                    }
                }
                Event::Eof => {
                    self.refresh_counters();
                    return Ok(ParseResult::Eof);
                }
                _ => {}
            }
        }
    }

    /// Apply field, redirect and namespace checks, clean, then run the residue gate
    fn finish_page(&mut self, page: PartialPage) -> ParseResult {
        self.stats.pages_seen += 1;
        if let Some(ref progress) = self.progress {
            progress.page_seen();
        }
        self.refresh_counters();

        let raw = match page.into_raw(&self.filter) {
            Ok(raw) => raw,
            Err(title) => {
                return self.reject(
                    RejectionReason::MissingField,
                    title.as_deref().unwrap_or("<none>"),
                );
            }
        };

        if let Err(reason) = self.filter.check(&raw) {
            return self.reject(reason, &raw.title);
        }

        let body = self.cleaner.clean(&raw.body);
        let doc = CleanedDocument::new(raw.title, &body);

        if let Some(token) = self.gate.find(&doc.text) {
            trace!("Residue token '{}' in '{}'", token, doc.title);
            return self.reject(RejectionReason::BlacklistedResidue, &doc.title);
        }

        self.stats.documents_accepted += 1;
        if let Some(ref progress) = self.progress {
            progress.document_accepted(&doc.title);
        }
        ParseResult::Document(doc)
    }

    fn reject(&mut self, reason: RejectionReason, title: &str) -> ParseResult {
        if reason.is_malformed() {
            warn!("Skipping malformed page '{}': {}", title, reason);
        } else {
            debug!("Skipped page '{}': {}", title, reason);
        }
        self.stats.record_rejection(reason);
        if let Some(ref progress) = self.progress {
            progress.document_rejected(reason);
        }
        ParseResult::Skipped
    }

    fn refresh_counters(&mut self) {
        self.stats.bytes_processed = self.reader.buffer_position() as u64;
        self.stats.elapsed_seconds = self.started.elapsed().as_secs_f64();
        self.stats.update_rate();
    }
}

impl DumpSource for WikimediaSource {
    fn iter_documents(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<CleanedDocument, ImportError>> + '_> {
        Box::new(WikimediaIterator { source: self })
    }

    fn restart(&mut self) -> Result<(), ImportError> {
        let archive = ArchiveReader::open_as(&self.path, self.format)?;
        self.reader = Reader::from_reader(archive);
        self.current_page = None;
        self.stats = ImportStats::default();
        self.started = Instant::now();
        self.finished = false;
        Ok(())
    }

    fn stats(&self) -> &ImportStats {
        &self.stats
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// Iterator over documents in a Wikimedia dump
struct WikimediaIterator<'a> {
    source: &'a mut WikimediaSource,
}

impl<'a> Iterator for WikimediaIterator<'a> {
    type Item = Result<CleanedDocument, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.source.finished || self.source.limit_reached() {
                return None;
            }
            match self.source.parse_next_page() {
                Ok(ParseResult::Document(doc)) => return Some(Ok(doc)),
                Ok(ParseResult::Skipped) => continue,
                Ok(ParseResult::Eof) => {
                    self.source.finished = true;
                    return None;
                }
                Err(e) => {
                    self.source.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
