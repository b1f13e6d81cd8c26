use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use wikiprose::{config::Config, fetch::ArchiveFetcher};

/// Command-line overrides for the `[fetch]` section
#[derive(Debug, Default)]
pub struct FetchOptions {
    pub base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub max_files: Option<usize>,
}

pub fn fetch_archives(mut config: Config, options: FetchOptions, quiet: bool) -> Result<()> {
    if let Some(base_url) = options.base_url {
        config.fetch.base_url = base_url;
    }
    if let Some(data_dir) = options.data_dir {
        config.fetch.data_dir = data_dir;
    }
    if options.max_files.is_some() {
        config.fetch.max_files = options.max_files;
    }
    config.validate()?;

    let fetcher = ArchiveFetcher::new(&config.fetch)
        .context("Failed to create archive fetcher")?
        .with_quiet(quiet);

    info!(
        "Fetching archives from {} into {}",
        config.fetch.base_url,
        fetcher.data_dir().display()
    );

    let fetched = fetcher
        .fetch_pending(config.fetch.max_files)
        .context("Archive download failed")?;

    if !quiet {
        println!("\nDownloaded {} archive(s)", fetched.len());
        for path in &fetched {
            println!("  {}", path.display());
        }
    }

    Ok(())
}
