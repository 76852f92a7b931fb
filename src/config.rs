//! Configuration management for GlobCompare
//!
//! This module provides configuration structures and defaults for pattern
//! matching, documents and output. Values come from defaults, an optional
//! TOML file and `GLOBCOMPARE_*` environment variables, in that order.

use std::path::Path;
use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};

/// Environment variable naming a configuration file
pub const CONFIG_PATH_ENV: &str = "GLOBCOMPARE_CONFIG";

/// Global configuration for GlobCompare
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Pattern matching configuration
    pub matching: MatchingConfig,
    /// Document defaults
    pub document: DocumentConfig,
    /// Output configuration
    pub output: OutputConfig,
}

/// Configuration for pattern matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Number of compiled patterns kept in the LRU cache
    pub compiled_cache_size: usize,
    /// Visited filesystem entries between progress log lines
    pub progress_log_interval: u64,
}

/// Defaults applied to new and loaded documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Caption template given to patterns without one
    pub default_caption_template: String,
    /// Separator used to join captured values into an instance key
    pub key_separator: String,
}

/// Configuration for printed output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Text shown for a panel that has no matching file
    pub missing_placeholder: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            compiled_cache_size: 64,
            progress_log_interval: 1000,
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            default_caption_template: "%p".to_string(),
            key_separator: "...".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            missing_placeholder: "<no match>".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an explicit file, `$GLOBCOMPARE_CONFIG`, or defaults,
    /// then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV).map(std::path::PathBuf::from);
        let config = match path.or(env_path.as_deref()) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env_overrides();
        config
            .validate()
            .map_err(|msg| anyhow::anyhow!("invalid configuration: {}", msg))?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Override fields with environment variables if present
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("GLOBCOMPARE_COMPILED_CACHE_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                self.matching.compiled_cache_size = size;
            }
        }

        if let Ok(val) = std::env::var("GLOBCOMPARE_PROGRESS_LOG_INTERVAL") {
            if let Ok(interval) = val.parse::<u64>() {
                self.matching.progress_log_interval = interval;
            }
        }

        if let Ok(val) = std::env::var("GLOBCOMPARE_CAPTION_TEMPLATE") {
            self.document.default_caption_template = val;
        }

        if let Ok(val) = std::env::var("GLOBCOMPARE_KEY_SEPARATOR") {
            self.document.key_separator = val;
        }

        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.matching.compiled_cache_size == 0 {
            return Err("compiled_cache_size must be greater than 0".to_string());
        }

        if self.matching.progress_log_interval == 0 {
            return Err("progress_log_interval must be greater than 0".to_string());
        }

        if self.document.default_caption_template.is_empty() {
            return Err("default_caption_template must not be empty".to_string());
        }

        if self.document.key_separator.is_empty() {
            return Err("key_separator must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.matching.compiled_cache_size, 64);
        assert_eq!(config.document.default_caption_template, "%p");
        assert_eq!(config.document.key_separator, "...");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.matching.compiled_cache_size = 0;
        assert!(config.validate().is_err());

        config.matching.compiled_cache_size = 8;
        config.document.key_separator.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "[document]\nkey_separator = \"_\"\n\n[matching]\ncompiled_cache_size = 4")
            .expect("Failed to write config");

        let config = AppConfig::from_file(file.path()).expect("Failed to parse config");
        assert_eq!(config.document.key_separator, "_");
        assert_eq!(config.document.default_caption_template, "%p");
        assert_eq!(config.matching.compiled_cache_size, 4);
        assert_eq!(config.matching.progress_log_interval, 1000);
    }

    #[test]
    fn test_env_config_loading() {
        std::env::set_var("GLOBCOMPARE_PROGRESS_LOG_INTERVAL", "25");
        std::env::set_var("GLOBCOMPARE_CAPTION_TEMPLATE", "[%p]");

        let config = AppConfig::from_env();

        assert_eq!(config.matching.progress_log_interval, 25);
        assert_eq!(config.document.default_caption_template, "[%p]");

        // Cleanup
        std::env::remove_var("GLOBCOMPARE_PROGRESS_LOG_INTERVAL");
        std::env::remove_var("GLOBCOMPARE_CAPTION_TEMPLATE");
    }
}
