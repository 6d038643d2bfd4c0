//! Telemetry surface for the EPO bulk-data processor.
//!
//! The pipeline consumes three injected capabilities: structured logging
//! (`tracing`, initialized by [`logging::init`]), metrics (a
//! [`PipelineMetrics`] registry shared by `Arc`), and a progress bar
//! ([`ProgressTracker`]). Nothing in here is a process-wide singleton; the
//! CLI wires everything up and hands it to the stages.

pub mod logging;
mod metrics;
mod progress;

pub use metrics::{DownloadMetrics, ParseMetrics, PipelineMetrics, SessionStatus};
pub use progress::{format_bytes, ProgressTracker};
