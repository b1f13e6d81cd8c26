//! Configuration for wikiprose

mod extract;
mod fetch;
mod logging;

pub use extract::{CleanerConfig, ExtractConfig, FilterConfig};
pub use fetch::FetchConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("wikiprose/", env!("CARGO_PKG_VERSION"));

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "wikiprose.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Extraction run configuration
    #[serde(default)]
    pub extract: ExtractConfig,
    /// Markup cleaner configuration
    #[serde(default)]
    pub cleaner: CleanerConfig,
    /// Page filter configuration
    #[serde(default)]
    pub filter: FilterConfig,
    /// Dump download configuration
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Extraction validation
        if self.extract.batch_size == 0 {
            errors.push("batch_size must be positive".to_string());
        }
        if self.extract.progress_interval == 0 {
            errors.push("progress_interval must be positive".to_string());
        }
        if self.extract.jobs == 0 {
            errors.push("jobs must be positive".to_string());
        }
        if self.extract.max_pages == Some(0) {
            errors.push("max_pages must be positive when set".to_string());
        }
        if self.extract.output_dir.as_os_str().is_empty() {
            errors.push("output_dir must not be empty".to_string());
        }

        // Cleaner validation
        if self.cleaner.residue_blacklist.iter().any(|t| t.is_empty()) {
            errors.push("residue_blacklist must not contain empty entries".to_string());
        }
        if self.cleaner.dropped_link_prefixes.iter().any(|p| p.trim().is_empty()) {
            errors.push("dropped_link_prefixes must not contain empty entries".to_string());
        }
        if self.filter.excluded_prefixes.iter().any(|p| p.is_empty()) {
            errors.push("excluded_prefixes must not contain empty entries".to_string());
        }

        // Fetch validation
        if let Err(e) = regex::Regex::new(&self.fetch.file_pattern) {
            errors.push(format!("file_pattern is not a valid regex: {}", e));
        }
        if !self.fetch.base_url.starts_with("http://") && !self.fetch.base_url.starts_with("https://") {
            errors.push(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.fetch.base_url
            ));
        }
        if self.fetch.max_files == Some(0) {
            errors.push("max_files must be positive when set".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
