//! Configuration loading with hierarchical merging.
//!
//! Layers, lowest precedence first: built-in defaults, config file,
//! environment variables, command-line overrides.

use crate::env::apply_env;
use crate::error::{ConfigError, Result};
use crate::types::Config;
use std::path::{Path, PathBuf};

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Explicit config file path, if any.
    path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader with an optional config file path.
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Resolve configuration from all layers except CLI overrides.
    ///
    /// # Errors
    /// Returns error if the config file cannot be read or parsed.
    pub fn load(&self) -> Result<Config> {
        let mut config = match &self.path {
            Some(path) => load_file(path)?,
            None => Config::default(),
        };
        apply_env(&mut config);
        Ok(config)
    }
}

/// Parse a config file, selecting the format by extension.
fn load_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, &e))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();

    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string())),
        "json" => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
        "toml" => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        }),
    }
}

/// Command-line configuration overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Override for `server.base_url`.
    pub base_url: Option<String>,
    /// Override for `server.product_id`.
    pub product_id: Option<String>,
    /// Override for `server.concurrent_downloads`.
    pub concurrent_downloads: Option<usize>,
    /// Override for `download.directory`.
    pub download_dir: Option<PathBuf>,
    /// Override for `parse.output_csv`.
    pub output_csv: Option<PathBuf>,
    /// Override for `parse.workers`.
    pub workers: Option<usize>,
    /// Override for `log.log_level`.
    pub log_level: Option<String>,
}

impl CliOverrides {
    /// Apply overrides to a resolved config.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref url) = self.base_url {
            config.server.base_url = url.clone();
        }
        if let Some(ref product) = self.product_id {
            config.server.product_id = product.clone();
        }
        if let Some(slots) = self.concurrent_downloads {
            config.server.concurrent_downloads = slots;
        }
        if let Some(ref dir) = self.download_dir {
            config.download.directory = dir.clone();
        }
        if let Some(ref csv) = self.output_csv {
            config.parse.output_csv = csv.clone();
        }
        if let Some(workers) = self.workers {
            config.parse.workers = workers;
        }
        if let Some(ref level) = self.log_level {
            config.log.log_level = level.clone();
        }
    }
}
