//! Extraction, cleaning and filtering configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::import::filter::{PageFilter, ResidueGate, DEFAULT_RESIDUE_BLACKLIST};
use crate::import::wikitext::{
    WikiTextCleaner, DEFAULT_DROPPED_LINK_PREFIXES, DEFAULT_REMOVED_SECTIONS,
};

/// Extraction run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Documents written per append
    pub batch_size: usize,
    /// Cap on accepted documents per archive (None = no cap)
    pub max_pages: Option<usize>,
    /// Log a progress line every this many accepted documents
    pub progress_interval: usize,
    /// Archives processed at once
    pub jobs: usize,
    /// Directory receiving one `.txt` corpus file per archive
    pub output_dir: PathBuf,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_pages: None,
            progress_interval: 1000,
            jobs: 1,
            output_dir: PathBuf::from("corpus"),
        }
    }
}

/// Markup cleaner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Section headings whose whole section is dropped (case-insensitive)
    pub removed_sections: Vec<String>,
    /// Namespaces of `[[Prefix:...]]` links dropped with their caption
    pub dropped_link_prefixes: Vec<String>,
    /// Substrings that reject a cleaned document
    pub residue_blacklist: Vec<String>,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            removed_sections: owned(DEFAULT_REMOVED_SECTIONS),
            dropped_link_prefixes: owned(DEFAULT_DROPPED_LINK_PREFIXES),
            residue_blacklist: owned(DEFAULT_RESIDUE_BLACKLIST),
        }
    }
}

impl CleanerConfig {
    pub fn build_cleaner(&self) -> WikiTextCleaner {
        WikiTextCleaner::new()
            .with_removed_sections(self.removed_sections.iter().cloned())
            .with_dropped_link_prefixes(self.dropped_link_prefixes.iter().cloned())
    }

    pub fn build_residue_gate(&self) -> ResidueGate {
        ResidueGate::new(self.residue_blacklist.iter().cloned())
    }
}

/// Page filter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Title prefixes excluded on top of the built-in namespace list
    pub excluded_prefixes: Vec<String>,
}

impl FilterConfig {
    pub fn build_filter(&self) -> PageFilter {
        PageFilter::new().with_extra_prefixes(self.excluded_prefixes.iter().cloned())
    }
}
