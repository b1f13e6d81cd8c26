use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use wikiprose::{
    config::Config,
    import::{ImportCoordinator, ImportCoordinatorBuilder, RunSummary},
};

/// Command-line overrides for the `[extract]` section
#[derive(Debug, Default)]
pub struct ExtractOptions {
    pub output: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub max_pages: Option<usize>,
    pub progress_interval: Option<usize>,
    pub jobs: Option<usize>,
}

impl ExtractOptions {
    fn apply(self, config: &mut Config) {
        if let Some(output) = self.output {
            config.extract.output_dir = output;
        }
        if let Some(batch_size) = self.batch_size {
            config.extract.batch_size = batch_size;
        }
        if self.max_pages.is_some() {
            config.extract.max_pages = self.max_pages;
        }
        if let Some(interval) = self.progress_interval {
            config.extract.progress_interval = interval;
        }
        if let Some(jobs) = self.jobs {
            config.extract.jobs = jobs;
        }
    }
}

pub fn extract(
    mut config: Config,
    input: PathBuf,
    options: ExtractOptions,
    quiet: bool,
    json: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input not found: {}", input.display());
    }

    options.apply(&mut config);
    config.validate()?;

    let archives = ImportCoordinator::discover_archives(&input)
        .with_context(|| format!("Failed to list archives in {}", input.display()))?;
    if archives.is_empty() {
        anyhow::bail!("No dump archives (.bz2 or .xml) found in {}", input.display());
    }

    info!(
        "Found {} archive(s), writing to {}",
        archives.len(),
        config.extract.output_dir.display()
    );

    let coordinator = ImportCoordinatorBuilder::new(&config.extract.output_dir)
        .with_config(&config.extract)
        .with_cleaner_config(&config.cleaner)
        .with_filter_config(&config.filter)
        .with_quiet(quiet || json)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create import coordinator: {}", e))?;

    let summary = coordinator.run(&archives);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !quiet {
        print_archive_table(&summary);
        coordinator.progress().print_summary();
    }

    let failed = summary.failed();
    if failed == summary.archives.len() {
        anyhow::bail!("All {} archive(s) failed", failed);
    }
    if failed > 0 {
        warn!("{} of {} archive(s) failed", failed, summary.archives.len());
    }

    Ok(())
}

fn print_archive_table(summary: &RunSummary) {
    println!("\nArchives");
    println!("========");
    for report in &summary.archives {
        let name = report
            .archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match report.error {
            Some(ref error) => println!(
                "{:<60} {:>8} docs  FAILED: {}",
                name, report.stats.documents_accepted, error
            ),
            None => println!(
                "{:<60} {:>8} docs  -> {}",
                name,
                report.stats.documents_accepted,
                report.output.display()
            ),
        }
    }
    println!(
        "\nStarted:  {}\nFinished: {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        summary.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}
