//! Progress tracking for extraction runs
//!
//! One tracker is shared by every archive in a run. Counters are atomics so
//! archives processed on different threads report into the same totals.

use super::source::{ImportError, ImportStats, RejectionReason};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Progress tracker for extraction runs
pub struct ImportProgress {
    /// Spinner (None if running in quiet mode)
    progress_bar: Option<ProgressBar>,
    start_time: Instant,
    pages_seen: AtomicUsize,
    docs_accepted: AtomicUsize,
    missing_field: AtomicUsize,
    redirects: AtomicUsize,
    excluded_namespace: AtomicUsize,
    blacklisted_residue: AtomicUsize,
    archives_completed: AtomicUsize,
    archives_failed: AtomicUsize,
    /// Log a progress line every this many accepted documents
    progress_interval: usize,
}

impl ImportProgress {
    /// Create a new progress tracker
    pub fn new(progress_interval: usize, quiet: bool) -> Self {
        let progress_bar = if !quiet {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} documents {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        Self {
            progress_bar,
            start_time: Instant::now(),
            pages_seen: AtomicUsize::new(0),
            docs_accepted: AtomicUsize::new(0),
            missing_field: AtomicUsize::new(0),
            redirects: AtomicUsize::new(0),
            excluded_namespace: AtomicUsize::new(0),
            blacklisted_residue: AtomicUsize::new(0),
            archives_completed: AtomicUsize::new(0),
            archives_failed: AtomicUsize::new(0),
            progress_interval: progress_interval.max(1),
        }
    }

    /// Count a completed `page` element, whatever its fate
    pub fn page_seen(&self) {
        self.pages_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// Update progress after accepting a document
    pub fn document_accepted(&self, title: &str) {
        let accepted = self.docs_accepted.fetch_add(1, Ordering::Relaxed) + 1;

        if accepted % self.progress_interval == 0 {
            info!("Processed {} pages", accepted);
        }

        if let Some(ref pb) = self.progress_bar {
            pb.set_position(accepted as u64);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                accepted as f64 / elapsed
            } else {
                0.0
            };

            // Truncate on char boundaries
            let display_title = if title.chars().count() > 30 {
                let truncated: String = title.chars().take(27).collect();
                format!("{}...", truncated)
            } else {
                title.to_string()
            };

            pb.set_message(format!("{:.1} docs/s | {}", rate, display_title));
        }
    }

    /// Count a rejected page under its reason
    pub fn document_rejected(&self, reason: RejectionReason) {
        let counter = match reason {
            RejectionReason::MissingField => &self.missing_field,
            RejectionReason::Redirect => &self.redirects,
            RejectionReason::ExcludedNamespace => &self.excluded_namespace,
            RejectionReason::BlacklistedResidue => &self.blacklisted_residue,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an archive that was read to the end
    pub fn archive_finished(&self, name: &str, stats: &ImportStats) {
        self.archives_completed.fetch_add(1, Ordering::Relaxed);
        info!(
            "Finished {}: {} documents written, {} pages skipped",
            name,
            stats.documents_accepted,
            stats.rejected()
        );
    }

    /// Record an archive that stopped on an error; the run carries on
    pub fn archive_failed(&self, name: &str, err: &ImportError) {
        self.archives_failed.fetch_add(1, Ordering::Relaxed);
        error!("Failed to process {}: {}", name, err);
    }

    pub fn archives_completed(&self) -> usize {
        self.archives_completed.load(Ordering::Relaxed)
    }

    pub fn archives_failed(&self) -> usize {
        self.archives_failed.load(Ordering::Relaxed)
    }

    /// Get current statistics
    pub fn get_stats(&self) -> ImportStats {
        let mut stats = ImportStats {
            pages_seen: self.pages_seen.load(Ordering::Relaxed),
            documents_accepted: self.docs_accepted.load(Ordering::Relaxed),
            missing_field: self.missing_field.load(Ordering::Relaxed),
            redirects: self.redirects.load(Ordering::Relaxed),
            excluded_namespace: self.excluded_namespace.load(Ordering::Relaxed),
            blacklisted_residue: self.blacklisted_residue.load(Ordering::Relaxed),
            bytes_processed: 0,
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
            docs_per_second: 0.0,
        };
        stats.update_rate();
        stats
    }

    /// Finish the spinner
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            let stats = self.get_stats();
            pb.finish_with_message(format!(
                "Done! {} written, {} skipped, {:.1} docs/s",
                stats.documents_accepted,
                stats.rejected(),
                stats.docs_per_second
            ));
        }
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        let stats = self.get_stats();

        println!("\nExtraction Summary");
        println!("==================");
        println!("Archives completed:  {}", self.archives_completed());
        println!("Archives failed:     {}", self.archives_failed());
        println!("Pages seen:          {}", stats.pages_seen);
        println!("Documents written:   {}", stats.documents_accepted);
        println!("Missing fields:      {}", stats.missing_field);
        println!("Redirects:           {}", stats.redirects);
        println!("Excluded namespaces: {}", stats.excluded_namespace);
        println!("Markup residue:      {}", stats.blacklisted_residue);
        println!("Elapsed time:        {:.1}s", stats.elapsed_seconds);
        println!("Processing rate:     {:.1} docs/s", stats.docs_per_second);
    }
}
