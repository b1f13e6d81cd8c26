//! Dump archive fetcher
//!
//! Lists the archives published in a dump directory, works out which ones
//! are not on disk yet and downloads those, one at a time. Files already
//! present in the data directory are never fetched again, so an interrupted
//! run can simply be started over.

mod download;
mod listing;

pub use download::{download, ArchiveFetcher};
pub use listing::{parse_listing, pending_files};

use thiserror::Error;

/// Errors that can occur while fetching archives
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Size mismatch for {file}: expected {expected} bytes, received {received}")]
    SizeMismatch {
        file: String,
        expected: u64,
        received: u64,
    },
}
