//! Configuration types with serde defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Resolved configuration for a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Logging options.
    pub log: LogSection,
    /// Telemetry export options.
    pub telemetry: TelemetrySection,
    /// Catalog server and HTTP options.
    pub server: ServerSection,
    /// Download stage options.
    pub download: DownloadSection,
    /// Extract stage options.
    pub extract: ExtractSection,
    /// Parse stage options.
    pub parse: ParseSection,
}

/// Logging options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// Minimum level: debug, info, warn, or error.
    pub log_level: String,
    /// Directory receiving the timestamped log file.
    pub log_dir: PathBuf,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Telemetry export options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySection {
    /// Whether metrics export is active.
    pub enabled: bool,
    /// Exporter kind: otlp, stdout, or none.
    pub exporter: String,
    /// Collector endpoint, required when exporter is otlp.
    pub endpoint: String,
    /// Wire protocol hint passed to the collector.
    pub protocol: String,
    /// Allow plaintext endpoints.
    pub insecure: bool,
    /// Extra headers sent with exported payloads.
    pub headers: BTreeMap<String, String>,
    /// Service name attached to exported metrics.
    pub service_name: String,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            enabled: false,
            exporter: "none".to_string(),
            endpoint: String::new(),
            protocol: "http/protobuf".to_string(),
            insecure: false,
            headers: BTreeMap::new(),
            service_name: "epo-processor".to_string(),
        }
    }
}

/// Catalog server and HTTP options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Base URL of the bulk-data service. Required.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout: u64,
    /// Retry attempts per file, capped at 10.
    pub max_retries: u32,
    /// Concurrent download slots, 1 to 30.
    pub concurrent_downloads: usize,
    /// Product identifier in the catalog.
    pub product_id: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: 30,
            max_retries: 3,
            concurrent_downloads: 5,
            product_id: "3".to_string(),
        }
    }
}

/// Download stage options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DownloadSection {
    /// Target directory for fetched files.
    pub directory: PathBuf,
    /// Skip files already on disk with a matching checksum.
    pub skip_exists: bool,
    /// Verify the SHA-1 of freshly downloaded files.
    pub verify_sha1: bool,
    /// Whether the download stage runs.
    pub enabled: bool,
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
            skip_exists: true,
            verify_sha1: false,
            enabled: true,
        }
    }
}

/// Extract stage options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractSection {
    /// Whether the extract stage runs.
    pub enabled: bool,
    /// Delete archives once their contents are extracted.
    pub delete_after_extract: bool,
}

impl Default for ExtractSection {
    fn default() -> Self {
        Self {
            enabled: true,
            delete_after_extract: false,
        }
    }
}

/// Parse stage options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseSection {
    /// Whether the parse stage runs.
    pub enabled: bool,
    /// Output CSV path.
    pub output_csv: PathBuf,
    /// Concurrent XML workers.
    pub workers: usize,
}

impl Default for ParseSection {
    fn default() -> Self {
        Self {
            enabled: true,
            output_csv: PathBuf::from("./output.csv"),
            workers: 10,
        }
    }
}

impl Config {
    /// Render the effective configuration as indented JSON.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_pretty_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::ConfigError::Serialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = Config::default();
        assert_eq!(config.log.log_level, "info");
        assert_eq!(config.log.log_dir, PathBuf::from("logs"));
        assert_eq!(config.server.timeout, 30);
        assert_eq!(config.server.max_retries, 3);
        assert_eq!(config.server.concurrent_downloads, 5);
        assert_eq!(config.server.product_id, "3");
        assert_eq!(config.download.directory, PathBuf::from("data"));
        assert!(config.download.enabled);
        assert!(config.extract.enabled);
        assert!(!config.extract.delete_after_extract);
        assert!(config.parse.enabled);
        assert_eq!(config.parse.output_csv, PathBuf::from("./output.csv"));
        assert_eq!(config.parse.workers, 10);
        assert_eq!(config.telemetry.exporter, "none");
    }

    #[test]
    fn pretty_json_round_trips() {
        let config = Config::default();
        let json = config.to_pretty_json().unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.server.concurrent_downloads, 5);
        assert!(json.contains("\n  "));
    }
}
