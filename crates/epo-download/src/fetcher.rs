//! Bounded-concurrency file fetcher.
//!
//! Descriptors are dispatched in parallel under a counting semaphore sized
//! by `server.concurrent_downloads`. Each file runs the skip/remove/stream
//! protocol inside the retry combinator; the whole stage shares one HTTP
//! client and one cancellation scope. Result order is completion order.

use crate::catalog::DownloadDescriptor;
use crate::checksum::{file_matches, sha1_file};
use crate::error::{FetchError, Result};
use crate::retry::with_retry;
use epo_telemetry::{format_bytes, PipelineMetrics, ProgressTracker, SessionStatus};
use futures_util::stream::{self, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Options for one fetch session.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Skip files already on disk with a matching checksum.
    pub skip_exists: bool,
    /// Verify the SHA-1 of freshly downloaded files.
    pub verify_sha1: bool,
    /// Concurrent download slots (1 to 30).
    pub concurrent_downloads: usize,
    /// Retry attempts per file, capped at 10.
    pub max_retries: u32,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Draw a terminal progress bar.
    pub show_progress: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            skip_exists: true,
            verify_sha1: false,
            concurrent_downloads: 5,
            max_retries: 3,
            timeout: Duration::from_secs(30),
            show_progress: false,
        }
    }
}

/// Build the shared HTTP client used for the catalog and all item requests.
///
/// # Errors
/// Returns error if the client cannot be constructed.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .tcp_nodelay(true)
        .gzip(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .use_rustls_tls()
        .build()
        .map_err(|e| FetchError::Client(e.to_string()))
}

/// Parallel file fetcher for catalog items.
pub struct Fetcher {
    http: reqwest::Client,
    options: FetchOptions,
    semaphore: Arc<Semaphore>,
    metrics: Arc<PipelineMetrics>,
    completed: AtomicUsize,
    failed: AtomicBool,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("concurrent_downloads", &self.options.concurrent_downloads)
            .field("max_retries", &self.options.max_retries)
            .field("skip_exists", &self.options.skip_exists)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Create a fetcher with its own HTTP client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(options: FetchOptions, metrics: Arc<PipelineMetrics>) -> Result<Self> {
        let http = build_http_client(options.timeout)?;
        Ok(Self::with_client(http, options, metrics))
    }

    /// Create a fetcher over an existing HTTP client.
    #[must_use]
    pub fn with_client(
        http: reqwest::Client,
        options: FetchOptions,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(options.concurrent_downloads));
        Self {
            http,
            options,
            semaphore,
            metrics,
            completed: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
        }
    }

    /// The shared HTTP client.
    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Download every descriptor, returning bytes written per completed item
    /// in completion order (0 for validly skipped files).
    ///
    /// All items in flight when the first hard failure occurs run to
    /// completion; queued items are not started. The first failure becomes
    /// the stage error.
    ///
    /// # Errors
    /// Returns the first per-item failure, or `Cancelled` when the scope was
    /// cancelled before any item failed.
    pub async fn fetch_all(
        &self,
        descriptors: &[DownloadDescriptor],
        token: &CancellationToken,
    ) -> Result<Vec<u64>> {
        let started = Instant::now();
        let metrics = &self.metrics.download;
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(false, Ordering::Relaxed);

        if descriptors.is_empty() {
            info!("catalog listed no items");
            metrics.observe_session(started.elapsed(), SessionStatus::Empty);
            return Ok(Vec::new());
        }

        let total_bytes: u64 = descriptors.iter().map(|d| d.expected_size).sum();
        metrics.files_total.inc_by(descriptors.len() as u64);
        info!(
            items = descriptors.len(),
            bytes = total_bytes,
            "starting downloads"
        );

        let progress = ProgressTracker::bytes(total_bytes, self.options.show_progress);
        progress.describe(&format!("0/{} files", descriptors.len()));

        let results: Vec<Result<u64>> = stream::iter(descriptors.iter())
            .map(|descriptor| self.fetch_one(descriptor, token, &progress, descriptors.len()))
            .buffer_unordered(self.options.concurrent_downloads)
            .collect()
            .await;

        progress.finish();
        metrics.observe_session(started.elapsed(), SessionStatus::Success);

        let mut bytes = Vec::with_capacity(results.len());
        let mut first_error: Option<FetchError> = None;
        let mut cancelled = false;
        for result in results {
            match result {
                Ok(n) => bytes.push(n),
                Err(FetchError::Cancelled) => cancelled = true,
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if cancelled {
            return Err(FetchError::Cancelled);
        }

        info!(
            items = bytes.len(),
            bytes = %format_bytes(bytes.iter().sum::<u64>()),
            elapsed = ?started.elapsed(),
            "downloads complete"
        );
        Ok(bytes)
    }

    /// Fetch one descriptor under a semaphore permit, with retries.
    async fn fetch_one(
        &self,
        descriptor: &DownloadDescriptor,
        token: &CancellationToken,
        progress: &ProgressTracker,
        total: usize,
    ) -> Result<u64> {
        // A prior hard failure stops new items; in-flight ones keep going.
        if token.is_cancelled() || self.failed.load(Ordering::Relaxed) {
            return Err(FetchError::Cancelled);
        }

        let permit = tokio::select! {
            () = token.cancelled() => return Err(FetchError::Cancelled),
            permit = self.semaphore.acquire() => permit.map_err(|_| FetchError::Cancelled)?,
        };

        let started = Instant::now();
        let result = with_retry(self.options.max_retries, || {
            self.fetch_file(descriptor, token, progress)
        })
        .await;
        self.metrics
            .download
            .file_duration
            .observe(started.elapsed().as_secs_f64());
        drop(permit);

        match &result {
            Ok(bytes) => {
                self.metrics.download.files_success.inc();
                if *bytes > 0 {
                    self.metrics.download.bytes_total.inc_by(*bytes);
                }
                let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
                progress.describe(&format!("{done}/{total} files"));
                debug!(file = %descriptor.filename, bytes = *bytes, "item complete");
            }
            Err(FetchError::Cancelled) => {}
            Err(e) => {
                self.metrics.download.files_failed.inc();
                self.failed.store(true, Ordering::Relaxed);
                error!(
                    file = %descriptor.filename,
                    url = %descriptor.url,
                    error = %e,
                    "download failed after retries"
                );
            }
        }

        result
    }

    /// One download attempt: skip-if-valid, remove stale target, stream the
    /// body, optionally verify.
    async fn fetch_file(
        &self,
        descriptor: &DownloadDescriptor,
        token: &CancellationToken,
        progress: &ProgressTracker,
    ) -> Result<u64> {
        if token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let path = &descriptor.file_path;

        if self.options.skip_exists && path.exists() && !descriptor.checksum.is_empty() {
            match file_matches_async(path, &descriptor.checksum).await {
                Ok(true) => {
                    debug!(file = %descriptor.filename, "existing file valid, skipping");
                    progress.add(descriptor.expected_size);
                    return Ok(0);
                }
                Ok(false) => {
                    warn!(file = %descriptor.filename, "existing file fails checksum, re-downloading");
                }
                Err(e) => {
                    warn!(file = %descriptor.filename, error = %e, "cannot verify existing file, re-downloading");
                }
            }
        }

        if path.exists() {
            tokio::fs::remove_file(path)
                .await
                .map_err(|e| FetchError::io(path, &e))?;
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::io(parent, &e))?;
        }

        let result = self.stream_body(descriptor, token, progress).await;
        if result.is_err() {
            // a failed or cancelled attempt leaves no partial file behind
            let _ = tokio::fs::remove_file(path).await;
        }
        let downloaded = result?;

        if self.options.verify_sha1 && !descriptor.checksum.is_empty() {
            let actual = sha1_file_async(path).await?;
            if !actual.eq_ignore_ascii_case(descriptor.checksum.trim()) {
                let _ = tokio::fs::remove_file(path).await;
                return Err(FetchError::Checksum {
                    path: path.clone(),
                    expected: descriptor.checksum.clone(),
                    actual,
                });
            }
        }

        Ok(downloaded)
    }

    /// Issue the GET and stream the body to the target path.
    async fn stream_body(
        &self,
        descriptor: &DownloadDescriptor,
        token: &CancellationToken,
        progress: &ProgressTracker,
    ) -> Result<u64> {
        let url = &descriptor.url;
        let path = &descriptor.file_path;

        let response = tokio::select! {
            () = token.cancelled() => return Err(FetchError::Cancelled),
            response = self.http.get(url.clone()).send() => {
                response.map_err(|e| FetchError::network(url.as_str(), &e))?
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| FetchError::io(path, &e))?;
        let mut body = response.bytes_stream();
        let mut downloaded: u64 = 0;

        loop {
            let chunk = tokio::select! {
                () = token.cancelled() => return Err(FetchError::Cancelled),
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk.map_err(|e| FetchError::network(url.as_str(), &e))?;

            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::io(path, &e))?;
            downloaded += chunk.len() as u64;
            progress.add(chunk.len() as u64);
        }

        file.flush().await.map_err(|e| FetchError::io(path, &e))?;
        Ok(downloaded)
    }
}

/// Off-thread SHA-1 of a file.
async fn sha1_file_async(path: &Path) -> Result<String> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || sha1_file(&owned))
        .await
        .map_err(|e| join_error(path, &e))?
}

/// Off-thread checksum comparison.
async fn file_matches_async(path: &Path, expected: &str) -> Result<bool> {
    let owned = path.to_path_buf();
    let expected = expected.to_string();
    tokio::task::spawn_blocking(move || file_matches(&owned, &expected))
        .await
        .map_err(|e| join_error(path, &e))?
}

fn join_error(path: &Path, err: &tokio::task::JoinError) -> FetchError {
    FetchError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_defaults() {
        let options = FetchOptions::default();
        assert_eq!(options.concurrent_downloads, 5);
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert!(options.skip_exists);
        assert!(!options.verify_sha1);
    }

    #[tokio::test]
    async fn empty_catalog_is_an_empty_session() {
        let metrics = Arc::new(PipelineMetrics::new());
        let fetcher = Fetcher::new(FetchOptions::default(), Arc::clone(&metrics)).unwrap();
        let token = CancellationToken::new();

        let bytes = fetcher.fetch_all(&[], &token).await.unwrap();
        assert!(bytes.is_empty());
        assert_eq!(metrics.download.files_total.get(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let metrics = Arc::new(PipelineMetrics::new());
        let fetcher = Fetcher::new(FetchOptions::default(), metrics).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let descriptor = DownloadDescriptor {
            filename: "a.zip".into(),
            file_path: std::path::PathBuf::from("/tmp/epo-test-never-written/a.zip"),
            expected_size: 10,
            checksum: String::new(),
            url: url::Url::parse("http://127.0.0.1:9/a").unwrap(),
        };
        let err = fetcher.fetch_all(&[descriptor], &token).await.unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
        assert!(!Path::new("/tmp/epo-test-never-written/a.zip").exists());
    }
}
