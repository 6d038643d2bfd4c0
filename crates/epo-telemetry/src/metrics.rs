//! Pipeline metrics.
//!
//! One [`PipelineMetrics`] instance owns the registry and the per-stage
//! instrument sets. Stages receive it by `Arc` and record counters and
//! durations; the CLI encodes the registry at the end of the run when an
//! exporter is configured.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue, LabelValueEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;
use std::fmt;
use std::time::Duration;

/// Final status of a stage session.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum SessionStatus {
    /// The stage processed at least one item.
    Success,
    /// The stage had nothing to do.
    Empty,
}

impl EncodeLabelValue for SessionStatus {
    fn encode(&self, encoder: &mut LabelValueEncoder<'_>) -> fmt::Result {
        let value = match self {
            Self::Success => "success",
            Self::Empty => "empty",
        };
        EncodeLabelValue::encode(&value, encoder)
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct SessionLabels {
    status: SessionStatus,
}

/// Download stage instruments.
#[derive(Clone)]
pub struct DownloadMetrics {
    /// Files the catalog listed for this run.
    pub files_total: Counter,
    /// Files fetched or validly skipped.
    pub files_success: Counter,
    /// Files that failed after retries.
    pub files_failed: Counter,
    /// Bytes written to disk.
    pub bytes_total: Counter,
    /// Per-file wall time in seconds.
    pub file_duration: Histogram,
    session_duration: Family<SessionLabels, Histogram>,
}

/// Parse stage instruments.
#[derive(Clone)]
pub struct ParseMetrics {
    /// XML files discovered by the walk.
    pub xml_files_total: Counter,
    /// Files fully converted to rows.
    pub xml_files_success: Counter,
    /// Files rejected by the extractor.
    pub xml_files_failed: Counter,
    /// Exchange documents accepted.
    pub records_total: Counter,
    /// Bytes of XML consumed.
    pub bytes_total: Counter,
    /// Per-file wall time in seconds.
    pub file_duration: Histogram,
    session_duration: Family<SessionLabels, Histogram>,
}

/// Registry-owning metrics set for one pipeline run.
pub struct PipelineMetrics {
    registry: Registry,
    /// Download stage instruments.
    pub download: DownloadMetrics,
    /// Parse stage instruments.
    pub parse: ParseMetrics,
}

impl fmt::Debug for PipelineMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineMetrics").finish_non_exhaustive()
    }
}

impl fmt::Debug for DownloadMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadMetrics")
            .field("files_total", &self.files_total.get())
            .field("files_success", &self.files_success.get())
            .field("files_failed", &self.files_failed.get())
            .field("bytes_total", &self.bytes_total.get())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ParseMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseMetrics")
            .field("xml_files_total", &self.xml_files_total.get())
            .field("records_total", &self.records_total.get())
            .finish_non_exhaustive()
    }
}

fn file_duration_histogram() -> Histogram {
    // 5 ms up to ~20 s
    Histogram::new(exponential_buckets(0.005, 2.0, 12))
}

fn session_duration_family() -> Family<SessionLabels, Histogram> {
    // 100 ms up to ~7 min
    Family::new_with_constructor(|| Histogram::new(exponential_buckets(0.1, 2.0, 12)))
}

impl DownloadMetrics {
    fn register(registry: &mut Registry) -> Self {
        let metrics = Self {
            files_total: Counter::default(),
            files_success: Counter::default(),
            files_failed: Counter::default(),
            bytes_total: Counter::default(),
            file_duration: file_duration_histogram(),
            session_duration: session_duration_family(),
        };
        registry.register(
            "files",
            "Files listed by the catalog for this run",
            metrics.files_total.clone(),
        );
        registry.register(
            "files_success",
            "Files fetched or validly skipped",
            metrics.files_success.clone(),
        );
        registry.register(
            "files_failed",
            "Files that failed after retries",
            metrics.files_failed.clone(),
        );
        registry.register(
            "bytes",
            "Bytes written to the download directory",
            metrics.bytes_total.clone(),
        );
        registry.register(
            "file_duration_seconds",
            "Per-file download duration",
            metrics.file_duration.clone(),
        );
        registry.register(
            "session_duration_seconds",
            "Download session duration by final status",
            metrics.session_duration.clone(),
        );
        metrics
    }

    /// Record the whole-session duration with its final status.
    pub fn observe_session(&self, elapsed: Duration, status: SessionStatus) {
        self.session_duration
            .get_or_create(&SessionLabels { status })
            .observe(elapsed.as_secs_f64());
    }
}

impl ParseMetrics {
    fn register(registry: &mut Registry) -> Self {
        let metrics = Self {
            xml_files_total: Counter::default(),
            xml_files_success: Counter::default(),
            xml_files_failed: Counter::default(),
            records_total: Counter::default(),
            bytes_total: Counter::default(),
            file_duration: file_duration_histogram(),
            session_duration: session_duration_family(),
        };
        registry.register(
            "xml_files",
            "XML files discovered by the walk",
            metrics.xml_files_total.clone(),
        );
        registry.register(
            "xml_files_success",
            "XML files fully converted to rows",
            metrics.xml_files_success.clone(),
        );
        registry.register(
            "xml_files_failed",
            "XML files rejected by the extractor",
            metrics.xml_files_failed.clone(),
        );
        registry.register(
            "records",
            "Exchange documents accepted",
            metrics.records_total.clone(),
        );
        registry.register(
            "bytes",
            "Bytes of XML consumed",
            metrics.bytes_total.clone(),
        );
        registry.register(
            "file_duration_seconds",
            "Per-file parse duration",
            metrics.file_duration.clone(),
        );
        registry.register(
            "session_duration_seconds",
            "Parse session duration by final status",
            metrics.session_duration.clone(),
        );
        metrics
    }

    /// Record the whole-session duration with its final status.
    pub fn observe_session(&self, elapsed: Duration, status: SessionStatus) {
        self.session_duration
            .get_or_create(&SessionLabels { status })
            .observe(elapsed.as_secs_f64());
    }
}

impl PipelineMetrics {
    /// Create a registry with both stages' instruments registered.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("epo");
        let download = DownloadMetrics::register(registry.sub_registry_with_prefix("download"));
        let parse = ParseMetrics::register(registry.sub_registry_with_prefix("parse"));
        Self {
            registry,
            download,
            parse,
        }
    }

    /// Encode the registry in Prometheus text exposition format.
    ///
    /// # Errors
    /// Returns error if encoding fails.
    pub fn encode_text(&self) -> Result<String, fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = PipelineMetrics::new();
        metrics.download.files_total.inc_by(3);
        metrics.download.files_success.inc_by(2);
        metrics.download.files_failed.inc();
        metrics.download.bytes_total.inc_by(600);
        assert_eq!(metrics.download.files_total.get(), 3);
        assert_eq!(metrics.download.bytes_total.get(), 600);
    }

    #[test]
    fn text_encoding_contains_registered_names() {
        let metrics = PipelineMetrics::new();
        metrics.parse.records_total.inc_by(5);
        metrics
            .download
            .observe_session(Duration::from_millis(250), SessionStatus::Success);
        let text = metrics.encode_text().unwrap();
        assert!(text.contains("epo_parse_records_total"));
        assert!(text.contains("epo_download_session_duration_seconds"));
        assert!(text.contains("status=\"success\""));
    }
}
