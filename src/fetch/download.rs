//! Streaming archive downloads

use super::listing::{parse_listing, pending_files};
use super::FetchError;
use crate::config::FetchConfig;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use reqwest::blocking::Client;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const PART_SUFFIX: &str = ".part";

fn file_url(base_url: &str, filename: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), filename)
}

fn byte_progress(total: Option<u64>, filename: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = match total {
        Some(len) if len > 0 => ProgressBar::new(len),
        _ => ProgressBar::new_spinner(),
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(filename.to_string());
    pb
}

/// Copy `reader` into `<dest>.part`, check the size, then move it to `dest`.
///
/// A declared size of zero means unknown. On a mismatch the partial file is
/// removed and nothing is left at `dest`.
fn write_stream<R: Read>(
    mut reader: R,
    dest: &Path,
    filename: &str,
    expected: Option<u64>,
) -> Result<u64, FetchError> {
    let part = PathBuf::from(format!("{}{}", dest.display(), PART_SUFFIX));

    let copied = (|| -> io::Result<u64> {
        let mut writer = BufWriter::new(File::create(&part)?);
        let received = io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        Ok(received)
    })();

    let received = match copied {
        Ok(received) => received,
        Err(e) => {
            let _ = std::fs::remove_file(&part);
            return Err(e.into());
        }
    };

    if let Some(expected) = expected.filter(|&n| n > 0) {
        if received != expected {
            let _ = std::fs::remove_file(&part);
            return Err(FetchError::SizeMismatch {
                file: filename.to_string(),
                expected,
                received,
            });
        }
    }

    std::fs::rename(&part, dest)?;
    Ok(received)
}

/// Download one archive from `base_url` into `data_dir`
pub fn download(
    client: &Client,
    base_url: &str,
    filename: &str,
    data_dir: &Path,
    quiet: bool,
) -> Result<PathBuf, FetchError> {
    let url = file_url(base_url, filename);
    info!("Downloading {}", url);

    let response = client.get(&url).send()?.error_for_status()?;
    let expected = response.content_length();
    debug!("{} declares {:?} bytes", filename, expected);

    std::fs::create_dir_all(data_dir)?;
    let dest = data_dir.join(filename);

    let pb = byte_progress(expected, filename, quiet);
    let result = write_stream(pb.wrap_read(response), &dest, filename, expected);
    match result {
        Ok(received) => {
            pb.finish_and_clear();
            info!("Saved {} ({} bytes)", dest.display(), received);
            Ok(dest)
        }
        Err(e) => {
            pb.abandon();
            Err(e)
        }
    }
}

/// Fetches missing archives listed in a dump directory
pub struct ArchiveFetcher {
    client: Client,
    base_url: String,
    data_dir: PathBuf,
    pattern: Regex,
    quiet: bool,
}

impl ArchiveFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let pattern = Regex::new(&config.file_pattern)?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            // Only connecting is time-limited
            .timeout(None::<Duration>)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            data_dir: config.data_dir.clone(),
            pattern,
            quiet: false,
        })
    }

    /// Set quiet mode (no progress bars)
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Archive names currently published in the listing
    pub fn list_remote(&self) -> Result<Vec<String>, FetchError> {
        let html = self
            .client
            .get(&self.base_url)
            .send()?
            .error_for_status()?
            .text()?;
        let names = parse_listing(&html, &self.pattern);
        info!("{} archive(s) listed at {}", names.len(), self.base_url);
        Ok(names)
    }

    /// Listed archives not present in the data directory
    pub fn pending(&self) -> Result<Vec<String>, FetchError> {
        Ok(pending_files(&self.list_remote()?, &self.data_dir))
    }

    /// Download up to `max_files` pending archives; stops at the first failure
    pub fn fetch_pending(&self, max_files: Option<usize>) -> Result<Vec<PathBuf>, FetchError> {
        let mut pending = self.pending()?;
        if pending.is_empty() {
            info!("All listed archives are already in {}", self.data_dir.display());
            return Ok(Vec::new());
        }
        if let Some(max) = max_files {
            if pending.len() > max {
                warn!("{} archive(s) pending, fetching the first {}", pending.len(), max);
                pending.truncate(max);
            }
        }

        let mut fetched = Vec::with_capacity(pending.len());
        for filename in &pending {
            fetched.push(download(
                &self.client,
                &self.base_url,
                filename,
                &self.data_dir,
                self.quiet,
            )?);
        }
        Ok(fetched)
    }
}
