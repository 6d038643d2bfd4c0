//! Pipeline controller.
//!
//! Stages run in fixed order Download → Extract → Parse. A stage failure
//! cancels the root scope and short-circuits the run; the first error is
//! what the user sees.

use epo_archive::{unpack_all, UnpackOptions};
use epo_config::Config;
use epo_core::{Error, Result};
use epo_download::{CatalogClient, FetchOptions, Fetcher};
use epo_parse::{Extractor, ParseOptions, RowWriter};
use epo_telemetry::PipelineMetrics;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

/// Which stages a run executes.
#[derive(Debug, Clone, Copy)]
pub struct StageSet {
    /// Run the download stage.
    pub download: bool,
    /// Run the extract stage.
    pub extract: bool,
    /// Run the parse stage.
    pub parse: bool,
}

impl StageSet {
    /// Stages enabled by configuration (the root command).
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            download: config.download.enabled,
            extract: config.extract.enabled,
            parse: config.parse.enabled,
        }
    }

    /// Only the download stage.
    #[must_use]
    pub const fn download_only() -> Self {
        Self {
            download: true,
            extract: false,
            parse: false,
        }
    }

    /// Only the extract stage.
    #[must_use]
    pub const fn extract_only() -> Self {
        Self {
            download: false,
            extract: true,
            parse: false,
        }
    }

    /// Only the parse stage.
    #[must_use]
    pub const fn parse_only() -> Self {
        Self {
            download: false,
            extract: false,
            parse: true,
        }
    }
}

/// Run the selected stages in order, sharing one cancellation scope.
///
/// # Errors
/// Returns the first stage failure, or `Cancelled`.
pub async fn run(
    config: &Config,
    stages: StageSet,
    metrics: Arc<PipelineMetrics>,
    token: &CancellationToken,
) -> Result<()> {
    let result = run_stages(config, stages, metrics, token).await;
    if result.is_err() {
        // stop anything the failed stage left in flight
        token.cancel();
    }
    result
}

async fn run_stages(
    config: &Config,
    stages: StageSet,
    metrics: Arc<PipelineMetrics>,
    token: &CancellationToken,
) -> Result<()> {
    if stages.download {
        run_download(config, Arc::clone(&metrics), token)
            .instrument(info_span!("download"))
            .await?;
    }
    if token.is_cancelled() {
        return Err(Error::Cancelled);
    }
    if stages.extract {
        run_extract(config, token)
            .instrument(info_span!("extract"))
            .await?;
    }
    if token.is_cancelled() {
        return Err(Error::Cancelled);
    }
    if stages.parse {
        run_parse(config, metrics, token)
            .instrument(info_span!("parse"))
            .await?;
    }
    Ok(())
}

async fn run_download(
    config: &Config,
    metrics: Arc<PipelineMetrics>,
    token: &CancellationToken,
) -> Result<()> {
    let options = FetchOptions {
        skip_exists: config.download.skip_exists,
        verify_sha1: config.download.verify_sha1,
        concurrent_downloads: config.server.concurrent_downloads,
        max_retries: config.server.max_retries,
        timeout: Duration::from_secs(config.server.timeout),
        show_progress: show_progress(),
    };
    let fetcher = Fetcher::new(options, metrics)?;
    let catalog = CatalogClient::new(fetcher.http().clone(), &config.server.base_url);
    let descriptors = catalog
        .fetch_descriptors(&config.server.product_id, &config.download.directory)
        .await?;
    fetcher.fetch_all(&descriptors, token).await?;
    Ok(())
}

async fn run_extract(config: &Config, token: &CancellationToken) -> Result<()> {
    let options = UnpackOptions {
        delete_after_extract: config.extract.delete_after_extract,
        show_progress: show_progress(),
    };
    let stats = unpack_all(&config.download.directory, &options, token).await?;
    info!(
        archives = stats.archives,
        nested = stats.nested_archives,
        "extract stage finished"
    );
    Ok(())
}

async fn run_parse(
    config: &Config,
    metrics: Arc<PipelineMetrics>,
    token: &CancellationToken,
) -> Result<()> {
    let writer = RowWriter::create(&config.parse.output_csv)?;
    let options = ParseOptions {
        workers: config.parse.workers,
        show_progress: show_progress(),
    };
    let extractor = Extractor::new(options, metrics);
    let stats = extractor
        .parse_all(&config.download.directory, &writer, token)
        .await?;
    info!(
        files = stats.files,
        rows = stats.rows,
        output = %config.parse.output_csv.display(),
        "parse stage finished"
    );
    Ok(())
}

fn show_progress() -> bool {
    std::io::stderr().is_terminal()
}
