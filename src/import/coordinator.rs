//! Import coordinator that orchestrates an extraction run
//!
//! Discovers the archives in an input directory and drives each one through
//! extraction and batched writing. A failing archive is reported and the run
//! moves on to the next one.

use super::filter::{PageFilter, ResidueGate};
use super::progress::ImportProgress;
use super::source::{DumpFormat, DumpSource, ImportError, ImportStats};
use super::wikimedia::WikimediaSource;
use super::wikitext::WikiTextCleaner;
use super::writer::{output_path_for, CorpusWriter};
use crate::config::{CleanerConfig, ExtractConfig, FilterConfig};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::{Entry, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Outcome of one archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveReport {
    pub archive: PathBuf,
    pub output: PathBuf,
    pub stats: ImportStats,
    /// Set when the archive stopped early
    pub error: Option<String>,
}

impl ArchiveReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub archives: Vec<ArchiveReport>,
    pub totals: ImportStats,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.archives.iter().filter(|r| !r.succeeded()).count()
    }

    pub fn documents_written(&self) -> usize {
        self.totals.documents_accepted
    }
}

/// Import coordinator for extraction runs
pub struct ImportCoordinator {
    output_dir: PathBuf,
    batch_size: usize,
    max_pages: Option<usize>,
    jobs: usize,
    cleaner: WikiTextCleaner,
    filter: PageFilter,
    gate: ResidueGate,
    progress: Arc<ImportProgress>,
}

impl ImportCoordinator {
    /// Find the dump archives directly inside `input`, sorted by name.
    ///
    /// A path to a single dump file yields just that file.
    pub fn discover_archives(input: &Path) -> Result<Vec<PathBuf>, ImportError> {
        if input.is_file() {
            return match DumpFormat::detect(input) {
                Some(_) => Ok(vec![input.to_path_buf()]),
                None => Err(ImportError::InvalidFormat(format!(
                    "{} is not a dump archive",
                    input.display()
                ))),
            };
        }

        let mut archives = Vec::new();
        for entry in WalkDir::new(input).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| ImportError::Io(e.into()))?;
            if entry.file_type().is_file() && DumpFormat::detect(entry.path()).is_some() {
                archives.push(entry.into_path());
            }
        }
        archives.sort();
        Ok(archives)
    }

    /// Run-wide diagnostics
    pub fn progress(&self) -> &Arc<ImportProgress> {
        &self.progress
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Open an archive with this run's cleaner, filters and cap
    pub fn open_source(&self, archive: &Path) -> Result<WikimediaSource, ImportError> {
        Ok(WikimediaSource::open(archive)?
            .with_cleaner(self.cleaner.clone())
            .with_filter(self.filter.clone())
            .with_residue_gate(self.gate.clone())
            .with_max_pages(self.max_pages)
            .with_progress(self.progress.clone()))
    }

    /// Drive a source into a writer in batches.
    ///
    /// Documents cleaned before a read error are still written.
    pub fn import<S: DumpSource>(
        &self,
        source: &mut S,
        writer: &mut CorpusWriter,
    ) -> Result<ImportStats, ImportError> {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut failure = None;

        for doc_result in source.iter_documents() {
            match doc_result {
                Ok(doc) => {
                    batch.push(doc);
                    if batch.len() >= self.batch_size {
                        writer.append_batch(&batch)?;
                        batch.clear();
                    }
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        writer.append_batch(&batch)?;

        match failure {
            Some(e) => Err(e),
            None => Ok(source.stats().clone()),
        }
    }

    /// Extract one archive into its output file
    pub fn process_archive(&self, archive: &Path) -> ArchiveReport {
        let output = output_path_for(archive, &self.output_dir);
        let name = archive_name(archive);
        info!("Processing {} -> {}", name, output.display());

        let mut report = ArchiveReport {
            archive: archive.to_path_buf(),
            output: output.clone(),
            stats: ImportStats::default(),
            error: None,
        };

        let result = self.open_source(archive).and_then(|mut source| {
            let mut writer = CorpusWriter::new(&output);
            let imported = self.import(&mut source, &mut writer);
            let finished = writer.finish();
            report.stats = source.stats().clone();
            imported.and(finished.map(|_| ()))
        });

        match result {
            Ok(()) => self.progress.archive_finished(&name, &report.stats),
            Err(e) => {
                self.progress.archive_failed(&name, &e);
                report.error = Some(e.to_string());
            }
        }

        report
    }

    /// Process every archive; per-archive failures end up in the summary.
    ///
    /// Archives whose output name collides with an earlier archive's
    /// (`dump.xml` and `dump.xml.bz2`) are reported as failed and left alone.
    pub fn run(&self, archives: &[PathBuf]) -> RunSummary {
        let started_at = Utc::now();
        info!(
            "Extracting {} archive(s) into {}",
            archives.len(),
            self.output_dir.display()
        );

        let claims = self.output_claims(archives);
        let archives_out: Vec<ArchiveReport> = if self.jobs > 1 && archives.len() > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.jobs)
                .build()
            {
                Ok(pool) => pool.install(|| {
                    archives
                        .par_iter()
                        .zip(claims.par_iter())
                        .map(|(archive, claimed_by)| {
                            self.process_claimed(archive, claimed_by.as_deref())
                        })
                        .collect()
                }),
                Err(e) => {
                    warn!("Could not start {} workers, running sequentially: {}", self.jobs, e);
                    self.run_sequential(archives, &claims)
                }
            }
        } else {
            self.run_sequential(archives, &claims)
        };

        let mut totals = ImportStats::default();
        for report in &archives_out {
            totals.merge(&report.stats);
        }

        self.progress.finish();

        let finished_at = Utc::now();
        totals.elapsed_seconds = (finished_at - started_at).num_milliseconds() as f64 / 1000.0;
        totals.update_rate();

        RunSummary {
            started_at,
            finished_at,
            archives: archives_out,
            totals,
        }
    }

    fn run_sequential(&self, archives: &[PathBuf], claims: &[Option<PathBuf>]) -> Vec<ArchiveReport> {
        archives
            .iter()
            .zip(claims)
            .map(|(archive, claimed_by)| self.process_claimed(archive, claimed_by.as_deref()))
            .collect()
    }

    /// For each archive, the earlier archive already writing its output file
    fn output_claims(&self, archives: &[PathBuf]) -> Vec<Option<PathBuf>> {
        let mut claimed: HashMap<PathBuf, &PathBuf> = HashMap::new();
        archives
            .iter()
            .map(|archive| match claimed.entry(output_path_for(archive, &self.output_dir)) {
                Entry::Occupied(first) => Some((*first.get()).clone()),
                Entry::Vacant(slot) => {
                    slot.insert(archive);
                    None
                }
            })
            .collect()
    }

    fn process_claimed(&self, archive: &Path, claimed_by: Option<&Path>) -> ArchiveReport {
        let Some(claimed_by) = claimed_by else {
            return self.process_archive(archive);
        };

        let output = output_path_for(archive, &self.output_dir);
        let err = ImportError::OutputConflict {
            output: output.clone(),
            claimed_by: claimed_by.to_path_buf(),
        };
        self.progress.archive_failed(&archive_name(archive), &err);

        ArchiveReport {
            archive: archive.to_path_buf(),
            output,
            stats: ImportStats::default(),
            error: Some(err.to_string()),
        }
    }
}

fn archive_name(archive: &Path) -> String {
    archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string())
}

/// Builder for ImportCoordinator with sensible defaults
pub struct ImportCoordinatorBuilder {
    output_dir: PathBuf,
    batch_size: usize,
    max_pages: Option<usize>,
    jobs: usize,
    progress_interval: usize,
    cleaner: WikiTextCleaner,
    filter: PageFilter,
    gate: ResidueGate,
    quiet: bool,
}

impl ImportCoordinatorBuilder {
    /// Create a new builder with default settings
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        let defaults = ExtractConfig::default();
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            batch_size: defaults.batch_size,
            max_pages: defaults.max_pages,
            jobs: defaults.jobs,
            progress_interval: defaults.progress_interval,
            cleaner: WikiTextCleaner::default(),
            filter: PageFilter::default(),
            gate: ResidueGate::default(),
            quiet: false,
        }
    }

    /// Take batch size, cap, jobs and progress cadence from configuration
    pub fn with_config(mut self, config: &ExtractConfig) -> Self {
        self.batch_size = config.batch_size;
        self.max_pages = config.max_pages;
        self.jobs = config.jobs;
        self.progress_interval = config.progress_interval;
        self
    }

    /// Take the section list, link prefixes and residue blacklist from configuration
    pub fn with_cleaner_config(mut self, config: &CleanerConfig) -> Self {
        self.cleaner = config.build_cleaner();
        self.gate = config.build_residue_gate();
        self
    }

    pub fn with_filter_config(mut self, config: &FilterConfig) -> Self {
        self.filter = config.build_filter();
        self
    }

    /// Set batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Cap accepted documents per archive
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Number of archives processed at once
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_cleaner(mut self, cleaner: WikiTextCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    pub fn with_filter(mut self, filter: PageFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_residue_gate(mut self, gate: ResidueGate) -> Self {
        self.gate = gate;
        self
    }

    /// Set quiet mode
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Build the coordinator, creating the output directory
    pub fn build(self) -> Result<ImportCoordinator, ImportError> {
        if self.batch_size == 0 {
            return Err(ImportError::Config("batch_size must be greater than 0".into()));
        }
        if self.jobs == 0 {
            return Err(ImportError::Config("jobs must be greater than 0".into()));
        }

        std::fs::create_dir_all(&self.output_dir)?;

        Ok(ImportCoordinator {
            output_dir: self.output_dir,
            batch_size: self.batch_size,
            max_pages: self.max_pages,
            jobs: self.jobs,
            cleaner: self.cleaner,
            filter: self.filter,
            gate: self.gate,
            progress: Arc::new(ImportProgress::new(self.progress_interval, self.quiet)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::CleanedDocument;
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn page(title: &str, body: &str) -> String {
        format!(
            "<page><title>{}</title><ns>0</ns><revision><text>{}</text></revision></page>",
            title, body
        )
    }

    fn dump(pages: &[String]) -> String {
        format!("<mediawiki>{}</mediawiki>", pages.concat())
    }

    fn write_bz2(path: &Path, xml: &str) {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(xml.as_bytes()).unwrap();
        std::fs::write(path, encoder.finish().unwrap()).unwrap();
    }

    fn coordinator(output: &Path) -> ImportCoordinator {
        ImportCoordinatorBuilder::new(output)
            .with_batch_size(2)
            .with_quiet(true)
            .build()
            .unwrap()
    }

    struct VecSource {
        docs: Vec<Result<CleanedDocument, ImportError>>,
        stats: ImportStats,
    }

    impl DumpSource for VecSource {
        fn iter_documents(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<CleanedDocument, ImportError>> + '_> {
            Box::new(self.docs.drain(..))
        }

        fn restart(&mut self) -> Result<(), ImportError> {
            Ok(())
        }

        fn stats(&self) -> &ImportStats {
            &self.stats
        }

        fn source_name(&self) -> &str {
            "vec"
        }
    }

    #[test]
    fn test_builder_rejects_zero_batch_size() {
        let temp_dir = TempDir::new().unwrap();
        let result = ImportCoordinatorBuilder::new(temp_dir.path())
            .with_batch_size(0)
            .with_quiet(true)
            .build();
        assert!(matches!(result, Err(ImportError::Config(_))));
    }

    #[test]
    fn test_discover_archives_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b.xml.bz2", "a.xml-p1p2.bz2", "notes.txt", "c.xml"] {
            std::fs::write(temp_dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(temp_dir.path().join("nested.xml")).unwrap();

        let archives = ImportCoordinator::discover_archives(temp_dir.path()).unwrap();
        let names: Vec<_> = archives
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.xml-p1p2.bz2", "b.xml.bz2", "c.xml"]);
    }

    #[test]
    fn test_import_writes_partial_batch_before_error() {
        let temp_dir = TempDir::new().unwrap();
        let coordinator = coordinator(temp_dir.path());
        let mut source = VecSource {
            docs: vec![
                Ok(CleanedDocument::new("A", "un.")),
                Ok(CleanedDocument::new("B", "deux.")),
                Ok(CleanedDocument::new("C", "trois.")),
                Err(ImportError::XmlParse("broken".into())),
                Ok(CleanedDocument::new("D", "jamais.")),
            ],
            stats: ImportStats::default(),
        };

        let path = temp_dir.path().join("out.txt");
        let mut writer = CorpusWriter::new(&path);
        let result = coordinator.import(&mut source, &mut writer);
        assert!(matches!(result, Err(ImportError::XmlParse(_))));
        assert_eq!(writer.finish().unwrap(), 3);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "A\nun.\n\nB\ndeux.\n\nC\ntrois.\n\n");
    }

    #[test]
    fn test_corrupt_archive_does_not_stop_run() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        std::fs::write(input.path().join("a-broken.xml.bz2"), b"not bzip2 at all").unwrap();
        write_bz2(
            &input.path().join("b-good.xml.bz2"),
            &dump(&[
                page("Paris", "'''Paris''' est une ville."),
                page("Portail:Géographie", "Portail."),
            ]),
        );

        let coordinator = coordinator(output.path());
        let archives = ImportCoordinator::discover_archives(input.path()).unwrap();
        let summary = coordinator.run(&archives);

        assert_eq!(summary.archives.len(), 2);
        assert_eq!(summary.failed(), 1);
        assert!(summary.archives[0].error.is_some());
        assert!(summary.archives[1].succeeded());
        assert_eq!(summary.documents_written(), 1);
        assert_eq!(summary.totals.excluded_namespace, 1);
        assert_eq!(coordinator.progress().archives_failed(), 1);

        assert!(!output.path().join("a-broken.txt").exists());
        let content = std::fs::read_to_string(output.path().join("b-good.txt")).unwrap();
        assert_eq!(content, "Paris\nParis est une ville.\n\n");
    }

    #[test]
    fn test_parallel_run_matches_sequential_output() {
        let input = TempDir::new().unwrap();
        for i in 0..4 {
            let pages: Vec<_> = (0..5)
                .map(|j| page(&format!("Article {}-{}", i, j), "Un [[texte]] simple."))
                .collect();
            write_bz2(&input.path().join(format!("part{}.xml.bz2", i)), &dump(&pages));
        }
        let archives = ImportCoordinator::discover_archives(input.path()).unwrap();

        let sequential_out = TempDir::new().unwrap();
        let sequential = coordinator(sequential_out.path()).run(&archives);

        let parallel_out = TempDir::new().unwrap();
        let parallel = ImportCoordinatorBuilder::new(parallel_out.path())
            .with_batch_size(2)
            .with_jobs(3)
            .with_quiet(true)
            .build()
            .unwrap()
            .run(&archives);

        assert_eq!(sequential.documents_written(), 20);
        assert_eq!(parallel.documents_written(), 20);
        for i in 0..4 {
            let name = format!("part{}.txt", i);
            assert_eq!(
                std::fs::read_to_string(sequential_out.path().join(&name)).unwrap(),
                std::fs::read_to_string(parallel_out.path().join(&name)).unwrap()
            );
        }
    }

    #[test]
    fn test_max_pages_applies_per_archive() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let pages: Vec<_> = (0..10)
            .map(|j| page(&format!("Page {}", j), "Contenu."))
            .collect();
        std::fs::write(input.path().join("sample.xml"), dump(&pages)).unwrap();

        let summary = ImportCoordinatorBuilder::new(output.path())
            .with_max_pages(Some(3))
            .with_quiet(true)
            .build()
            .unwrap()
            .run(&[input.path().join("sample.xml")]);

        assert_eq!(summary.documents_written(), 3);
    }

    #[test]
    fn test_colliding_output_names_are_rejected() {
        let input = TempDir::new().unwrap();
        std::fs::write(input.path().join("dump.xml"), dump(&[page("A", "Alpha.")])).unwrap();
        write_bz2(&input.path().join("dump.xml.bz2"), &dump(&[page("B", "Beta.")]));
        let archives = ImportCoordinator::discover_archives(input.path()).unwrap();

        for jobs in [1, 2] {
            let output = TempDir::new().unwrap();
            let coordinator = ImportCoordinatorBuilder::new(output.path())
                .with_jobs(jobs)
                .with_quiet(true)
                .build()
                .unwrap();
            let summary = coordinator.run(&archives);

            assert_eq!(summary.archives.len(), 2);
            assert!(summary.archives[0].succeeded());
            let error = summary.archives[1].error.as_deref().unwrap();
            assert!(error.contains("already claimed"), "{}", error);
            assert_eq!(summary.failed(), 1);
            assert_eq!(coordinator.progress().archives_failed(), 1);

            let content = std::fs::read_to_string(output.path().join("dump.txt")).unwrap();
            assert_eq!(content, "A\nAlpha.\n\n");
            assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 1);
        }
    }

    #[test]
    fn test_totals_use_run_wall_clock() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        for name in ["a.xml", "b.xml"] {
            std::fs::write(input.path().join(name), dump(&[page(name, "Texte.")])).unwrap();
        }
        let archives = ImportCoordinator::discover_archives(input.path()).unwrap();
        let summary = coordinator(output.path()).run(&archives);

        let wall = (summary.finished_at - summary.started_at).num_milliseconds() as f64 / 1000.0;
        assert_eq!(summary.totals.elapsed_seconds, wall);
        assert_eq!(summary.totals.documents_accepted, 2);
    }
}
