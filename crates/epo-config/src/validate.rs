//! Configuration validation with descriptive errors.

use crate::error::{ConfigError, Result};
use crate::types::Config;
use url::Url;

const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];
const EXPORTERS: &[&str] = &["otlp", "stdout", "none"];

/// Validate a resolved configuration.
///
/// All violations are collected so a user can fix a config file in one pass.
///
/// # Errors
/// Returns `ConfigError::Invalid` listing every violated field.
pub fn validate(config: &Config) -> Result<()> {
    let mut issues = Vec::new();

    if !LOG_LEVELS.contains(&config.log.log_level.as_str()) {
        issues.push(format!(
            "log.log_level must be one of {LOG_LEVELS:?}, got '{}'",
            config.log.log_level
        ));
    }
    if config.log.log_dir.as_os_str().is_empty() {
        issues.push("log.log_dir must not be empty".to_string());
    }

    if !EXPORTERS.contains(&config.telemetry.exporter.as_str()) {
        issues.push(format!(
            "telemetry.exporter must be one of {EXPORTERS:?}, got '{}'",
            config.telemetry.exporter
        ));
    }
    if config.telemetry.exporter == "otlp" && config.telemetry.endpoint.is_empty() {
        issues.push("telemetry.endpoint is required when telemetry.exporter is 'otlp'".to_string());
    }

    if config.server.base_url.is_empty() {
        issues.push("server.base_url is required".to_string());
    } else if Url::parse(&config.server.base_url).is_err() {
        issues.push(format!(
            "server.base_url is not a valid URL: '{}'",
            config.server.base_url
        ));
    }
    if config.server.timeout == 0 {
        issues.push("server.timeout must be greater than zero".to_string());
    }
    if config.server.max_retries > 10 {
        issues.push(format!(
            "server.max_retries must be at most 10, got {}",
            config.server.max_retries
        ));
    }
    if !(1..=30).contains(&config.server.concurrent_downloads) {
        issues.push(format!(
            "server.concurrent_downloads must be between 1 and 30, got {}",
            config.server.concurrent_downloads
        ));
    }
    if config.server.product_id.is_empty() {
        issues.push("server.product_id is required".to_string());
    }

    if config.download.enabled && config.download.directory.as_os_str().is_empty() {
        issues.push("download.directory is required when the download stage is enabled".to_string());
    }

    if config.parse.enabled {
        if config.parse.output_csv.as_os_str().is_empty() {
            issues.push("parse.output_csv must not be empty".to_string());
        }
        if config.parse.workers == 0 {
            issues.push("parse.workers must be at least 1".to_string());
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid { issues })
    }
}
