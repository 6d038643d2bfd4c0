//! Parse-stage driver.
//!
//! Walks the download directory for XML files and processes them under a
//! worker semaphore. Per-file failures are counted; the first one lands in a
//! one-slot channel and becomes the stage error once every file has been
//! visited. Rows go through the shared [`RowWriter`] mutex.

use crate::error::{ParseError, Result};
use crate::writer::RowWriter;
use crate::xml::extract_documents;
use epo_telemetry::{PipelineMetrics, ProgressTracker, SessionStatus};
use futures_util::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Options for one parse session.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Concurrent XML workers.
    pub workers: usize,
    /// Draw a terminal progress bar.
    pub show_progress: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            workers: 10,
            show_progress: false,
        }
    }
}

/// Totals for a parse session, for progress messaging only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseStats {
    /// Files fully converted to rows.
    pub files: usize,
    /// Rows appended to the CSV.
    pub rows: usize,
}

/// Parallel exchange-document extractor.
pub struct Extractor {
    options: ParseOptions,
    metrics: Arc<PipelineMetrics>,
    semaphore: Arc<Semaphore>,
    processed_files: AtomicUsize,
    processed_records: AtomicUsize,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("workers", &self.options.workers)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Create an extractor.
    #[must_use]
    pub fn new(options: ParseOptions, metrics: Arc<PipelineMetrics>) -> Self {
        let semaphore = Arc::new(Semaphore::new(options.workers.max(1)));
        Self {
            options,
            metrics,
            semaphore,
            processed_files: AtomicUsize::new(0),
            processed_records: AtomicUsize::new(0),
        }
    }

    /// Process every XML file under `dir`, appending rows to `writer`.
    ///
    /// # Errors
    /// Returns the first per-file failure once all files have been visited,
    /// a terminal flush error, or `Cancelled`.
    pub async fn parse_all(
        &self,
        dir: &Path,
        writer: &RowWriter,
        token: &CancellationToken,
    ) -> Result<ParseStats> {
        let started = Instant::now();
        let metrics = &self.metrics.parse;
        self.processed_files.store(0, Ordering::Relaxed);
        self.processed_records.store(0, Ordering::Relaxed);

        let files = discover_xml_files(dir);
        if files.is_empty() {
            info!(dir = %dir.display(), "no XML files to parse");
            metrics.observe_session(started.elapsed(), SessionStatus::Empty);
            return Ok(ParseStats::default());
        }

        let total = files.len();
        metrics.xml_files_total.inc_by(total as u64);
        info!(dir = %dir.display(), files = total, "parsing XML files");

        let progress = ProgressTracker::items(total as u64, self.options.show_progress);
        // first failure wins the slot; the rest are counted and dropped
        let (error_tx, mut error_rx) = mpsc::channel::<ParseError>(1);

        stream::iter(files)
            .map(|file| self.process_file(file, writer, token, &progress, &error_tx, total))
            .buffer_unordered(self.options.workers.max(1))
            .collect::<Vec<()>>()
            .await;

        progress.finish();
        let flush_result = writer.flush();
        metrics.observe_session(started.elapsed(), SessionStatus::Success);

        if let Ok(err) = error_rx.try_recv() {
            return Err(err);
        }
        flush_result?;
        if token.is_cancelled() {
            return Err(ParseError::Cancelled);
        }

        let stats = ParseStats {
            files: self.processed_files.load(Ordering::Relaxed),
            rows: self.processed_records.load(Ordering::Relaxed),
        };
        info!(
            files = stats.files,
            rows = stats.rows,
            elapsed = ?started.elapsed(),
            "parse complete"
        );
        Ok(stats)
    }

    /// Process one file, recording the outcome in metrics and the error slot.
    async fn process_file(
        &self,
        path: PathBuf,
        writer: &RowWriter,
        token: &CancellationToken,
        progress: &ProgressTracker,
        error_tx: &mpsc::Sender<ParseError>,
        total: usize,
    ) {
        if token.is_cancelled() {
            return;
        }
        let permit = tokio::select! {
            () = token.cancelled() => return,
            permit = self.semaphore.acquire() => {
                let Ok(permit) = permit else { return };
                permit
            }
        };

        let started = Instant::now();
        let result = self.parse_one(&path, writer, token).await;
        self.metrics
            .parse
            .file_duration
            .observe(started.elapsed().as_secs_f64());
        drop(permit);

        match result {
            Ok(rows) => {
                self.metrics.parse.xml_files_success.inc();
                self.metrics.parse.records_total.inc_by(rows as u64);
                self.processed_records.fetch_add(rows, Ordering::Relaxed);
                let done = self.processed_files.fetch_add(1, Ordering::Relaxed) + 1;
                progress.add(1);
                progress.describe(&format!("{done}/{total} files"));
                debug!(file = %path.display(), rows, "file parsed");
            }
            Err(ParseError::Cancelled) => {}
            Err(e) => {
                self.metrics.parse.xml_files_failed.inc();
                warn!(file = %path.display(), error = %e, "file rejected");
                let _ = error_tx.try_send(e);
                progress.add(1);
            }
        }
    }

    /// Parse one file and append its rows in document order.
    async fn parse_one(
        &self,
        path: &Path,
        writer: &RowWriter,
        token: &CancellationToken,
    ) -> Result<usize> {
        if token.is_cancelled() {
            return Err(ParseError::Cancelled);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ParseError::io(path, &e))?;
        self.metrics.parse.bytes_total.inc_by(content.len() as u64);

        if token.is_cancelled() {
            return Err(ParseError::Cancelled);
        }

        let owned = path.to_path_buf();
        let documents =
            tokio::task::spawn_blocking(move || extract_documents(&owned, &content))
                .await
                .map_err(|e| ParseError::Io {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })??;

        let mut rows = 0;
        for document in &documents {
            if token.is_cancelled() {
                return Err(ParseError::Cancelled);
            }
            writer.append(&document.to_row())?;
            rows += 1;
        }
        Ok(rows)
    }
}

/// Depth-first walk for files with a case-insensitive `.xml` extension.
fn discover_xml_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .and_then(|x| x.to_str())
                    .is_some_and(|x| x.eq_ignore_ascii_case("xml"))
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}
