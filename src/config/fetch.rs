//! Dump download configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::DEFAULT_USER_AGENT;

/// Archive fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Directory listing holding the dump files
    pub base_url: String,
    /// Regex selecting archive file names in the listing
    pub file_pattern: String,
    /// Where downloaded archives are stored
    pub data_dir: PathBuf,
    /// Download at most this many missing archives per run
    pub max_files: Option<usize>,
    /// Connection timeout (seconds); transfers themselves are not time-limited
    pub connect_timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dumps.wikimedia.org/frwiki/latest/".to_string(),
            file_pattern: r"frwiki-latest-pages-articles\w+\.xml-\w+\.bz2".to_string(),
            data_dir: PathBuf::from("data"),
            max_files: None,
            connect_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
