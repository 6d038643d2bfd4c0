//! Environment variable overlay.
//!
//! Every config key maps to `EPO_` plus the dotted key with dots and dashes
//! replaced by underscores, uppercased: `server.base_url` becomes
//! `EPO_SERVER_BASE_URL`, `download.skip_exists` becomes
//! `EPO_DOWNLOAD_SKIP_EXISTS`.

use crate::types::Config;
use std::path::PathBuf;

/// Recognized `EPO_` environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpoEnvVar {
    /// `EPO_LOG_LOG_LEVEL` - minimum log level.
    LogLevel,
    /// `EPO_LOG_LOG_DIR` - log file directory.
    LogDir,
    /// `EPO_TELEMETRY_ENABLED` - enable metrics export.
    TelemetryEnabled,
    /// `EPO_TELEMETRY_EXPORTER` - exporter kind.
    TelemetryExporter,
    /// `EPO_TELEMETRY_ENDPOINT` - collector endpoint.
    TelemetryEndpoint,
    /// `EPO_TELEMETRY_PROTOCOL` - collector protocol.
    TelemetryProtocol,
    /// `EPO_TELEMETRY_INSECURE` - allow plaintext endpoints.
    TelemetryInsecure,
    /// `EPO_TELEMETRY_HEADERS` - comma-separated `key=value` pairs.
    TelemetryHeaders,
    /// `EPO_TELEMETRY_SERVICE_NAME` - exported service name.
    TelemetryServiceName,
    /// `EPO_SERVER_BASE_URL` - bulk-data service base URL.
    ServerBaseUrl,
    /// `EPO_SERVER_TIMEOUT` - per-request timeout in seconds.
    ServerTimeout,
    /// `EPO_SERVER_MAX_RETRIES` - retry attempts per file.
    ServerMaxRetries,
    /// `EPO_SERVER_CONCURRENT_DOWNLOADS` - download slots.
    ServerConcurrentDownloads,
    /// `EPO_SERVER_PRODUCT_ID` - catalog product id.
    ServerProductId,
    /// `EPO_DOWNLOAD_DIRECTORY` - download target directory.
    DownloadDirectory,
    /// `EPO_DOWNLOAD_SKIP_EXISTS` - skip valid existing files.
    DownloadSkipExists,
    /// `EPO_DOWNLOAD_VERIFY_SHA1` - verify fresh downloads.
    DownloadVerifySha1,
    /// `EPO_DOWNLOAD_ENABLED` - run the download stage.
    DownloadEnabled,
    /// `EPO_EXTRACT_ENABLED` - run the extract stage.
    ExtractEnabled,
    /// `EPO_EXTRACT_DELETE_AFTER_EXTRACT` - delete consumed archives.
    ExtractDeleteAfterExtract,
    /// `EPO_PARSE_ENABLED` - run the parse stage.
    ParseEnabled,
    /// `EPO_PARSE_OUTPUT_CSV` - output CSV path.
    ParseOutputCsv,
    /// `EPO_PARSE_WORKERS` - concurrent XML workers.
    ParseWorkers,
}

impl EpoEnvVar {
    /// Get the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LogLevel => "EPO_LOG_LOG_LEVEL",
            Self::LogDir => "EPO_LOG_LOG_DIR",
            Self::TelemetryEnabled => "EPO_TELEMETRY_ENABLED",
            Self::TelemetryExporter => "EPO_TELEMETRY_EXPORTER",
            Self::TelemetryEndpoint => "EPO_TELEMETRY_ENDPOINT",
            Self::TelemetryProtocol => "EPO_TELEMETRY_PROTOCOL",
            Self::TelemetryInsecure => "EPO_TELEMETRY_INSECURE",
            Self::TelemetryHeaders => "EPO_TELEMETRY_HEADERS",
            Self::TelemetryServiceName => "EPO_TELEMETRY_SERVICE_NAME",
            Self::ServerBaseUrl => "EPO_SERVER_BASE_URL",
            Self::ServerTimeout => "EPO_SERVER_TIMEOUT",
            Self::ServerMaxRetries => "EPO_SERVER_MAX_RETRIES",
            Self::ServerConcurrentDownloads => "EPO_SERVER_CONCURRENT_DOWNLOADS",
            Self::ServerProductId => "EPO_SERVER_PRODUCT_ID",
            Self::DownloadDirectory => "EPO_DOWNLOAD_DIRECTORY",
            Self::DownloadSkipExists => "EPO_DOWNLOAD_SKIP_EXISTS",
            Self::DownloadVerifySha1 => "EPO_DOWNLOAD_VERIFY_SHA1",
            Self::DownloadEnabled => "EPO_DOWNLOAD_ENABLED",
            Self::ExtractEnabled => "EPO_EXTRACT_ENABLED",
            Self::ExtractDeleteAfterExtract => "EPO_EXTRACT_DELETE_AFTER_EXTRACT",
            Self::ParseEnabled => "EPO_PARSE_ENABLED",
            Self::ParseOutputCsv => "EPO_PARSE_OUTPUT_CSV",
            Self::ParseWorkers => "EPO_PARSE_WORKERS",
        }
    }

    /// Get the value from environment.
    #[must_use]
    pub fn get(self) -> Option<String> {
        std::env::var(self.as_str()).ok()
    }

    /// Get as boolean (1/true/yes/on = true).
    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        self.get()
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
    }

    /// Get as u64.
    #[must_use]
    pub fn as_u64(self) -> Option<u64> {
        self.get().and_then(|v| v.parse().ok())
    }

    /// Get as path.
    #[must_use]
    pub fn as_path(self) -> Option<PathBuf> {
        self.get().map(PathBuf::from)
    }
}

/// Apply all recognized environment variables on top of `config`.
pub fn apply_env(config: &mut Config) {
    if let Some(level) = EpoEnvVar::LogLevel.get() {
        config.log.log_level = level;
    }
    if let Some(dir) = EpoEnvVar::LogDir.as_path() {
        config.log.log_dir = dir;
    }
    if let Some(enabled) = EpoEnvVar::TelemetryEnabled.as_bool() {
        config.telemetry.enabled = enabled;
    }
    if let Some(exporter) = EpoEnvVar::TelemetryExporter.get() {
        config.telemetry.exporter = exporter;
    }
    if let Some(endpoint) = EpoEnvVar::TelemetryEndpoint.get() {
        config.telemetry.endpoint = endpoint;
    }
    if let Some(protocol) = EpoEnvVar::TelemetryProtocol.get() {
        config.telemetry.protocol = protocol;
    }
    if let Some(insecure) = EpoEnvVar::TelemetryInsecure.as_bool() {
        config.telemetry.insecure = insecure;
    }
    if let Some(headers) = EpoEnvVar::TelemetryHeaders.get() {
        config.telemetry.headers = parse_headers(&headers);
    }
    if let Some(name) = EpoEnvVar::TelemetryServiceName.get() {
        config.telemetry.service_name = name;
    }
    if let Some(url) = EpoEnvVar::ServerBaseUrl.get() {
        config.server.base_url = url;
    }
    if let Some(timeout) = EpoEnvVar::ServerTimeout.as_u64() {
        config.server.timeout = timeout;
    }
    if let Some(retries) = EpoEnvVar::ServerMaxRetries.as_u64() {
        config.server.max_retries = retries as u32;
    }
    if let Some(slots) = EpoEnvVar::ServerConcurrentDownloads.as_u64() {
        config.server.concurrent_downloads = slots as usize;
    }
    if let Some(product) = EpoEnvVar::ServerProductId.get() {
        config.server.product_id = product;
    }
    if let Some(dir) = EpoEnvVar::DownloadDirectory.as_path() {
        config.download.directory = dir;
    }
    if let Some(skip) = EpoEnvVar::DownloadSkipExists.as_bool() {
        config.download.skip_exists = skip;
    }
    if let Some(verify) = EpoEnvVar::DownloadVerifySha1.as_bool() {
        config.download.verify_sha1 = verify;
    }
    if let Some(enabled) = EpoEnvVar::DownloadEnabled.as_bool() {
        config.download.enabled = enabled;
    }
    if let Some(enabled) = EpoEnvVar::ExtractEnabled.as_bool() {
        config.extract.enabled = enabled;
    }
    if let Some(delete) = EpoEnvVar::ExtractDeleteAfterExtract.as_bool() {
        config.extract.delete_after_extract = delete;
    }
    if let Some(enabled) = EpoEnvVar::ParseEnabled.as_bool() {
        config.parse.enabled = enabled;
    }
    if let Some(csv) = EpoEnvVar::ParseOutputCsv.as_path() {
        config.parse.output_csv = csv;
    }
    if let Some(workers) = EpoEnvVar::ParseWorkers.as_u64() {
        config.parse.workers = workers as usize;
    }
}

/// Parse `key=value,key=value` header pairs; malformed entries are skipped.
fn parse_headers(raw: &str) -> std::collections::BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}
