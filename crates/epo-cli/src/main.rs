//! EPO bulk-data processor CLI.
//!
//! Runs the three-stage pipeline (download, extract, parse) against an EPO
//! product delivery catalog. The root command runs every stage enabled in
//! the configuration; subcommands run single stages.

mod commands;
mod pipeline;

use clap::Parser;
use commands::{Cli, Commands, ConfigCommands};
use epo_config::{validate, ConfigLoader};
use epo_telemetry::PipelineMetrics;
use pipeline::StageSet;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Version)) {
        println!("{}", epo_core::version_string());
        return ExitCode::SUCCESS;
    }

    let loader = ConfigLoader::new(cli.config.clone());
    let mut config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    cli.overrides().apply_to(&mut config);
    if let Err(e) = validate(&config) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    if let Some(Commands::Config { command }) = &cli.command {
        let ConfigCommands::Print = command;
        return match config.to_pretty_json() {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let log_path = match epo_telemetry::logging::init(&config.log) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: cannot create runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(log_file = %log_path.display(), "starting");
    match runtime.block_on(run(&cli, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "pipeline failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, config: epo_config::Config) -> anyhow::Result<()> {
    let token = CancellationToken::new();
    spawn_signal_handler(token.clone());

    let stages = match &cli.command {
        Some(Commands::Download) => StageSet::download_only(),
        Some(Commands::Extract) => StageSet::extract_only(),
        Some(Commands::Parse) => StageSet::parse_only(),
        _ => StageSet::from_config(&config),
    };

    let metrics = Arc::new(PipelineMetrics::new());
    let result = pipeline::run(&config, stages, Arc::clone(&metrics), &token).await;

    export_metrics(&config, &metrics).await;
    result?;
    Ok(())
}

/// Cancel the root scope on the first SIGINT or SIGTERM.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        warn!("signal received, cancelling");
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = ctrl_c.await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Export the run's metrics per `telemetry.exporter`. Export failures never
/// fail the pipeline.
async fn export_metrics(config: &epo_config::Config, metrics: &PipelineMetrics) {
    if !config.telemetry.enabled {
        return;
    }
    let Ok(encoded) = metrics.encode_text() else {
        warn!("cannot encode metrics registry");
        return;
    };
    match config.telemetry.exporter.as_str() {
        "stdout" => println!("{encoded}"),
        "otlp" => push_metrics(&config.telemetry, encoded).await,
        _ => {}
    }
}

/// Push the encoded registry to the configured collector endpoint.
async fn push_metrics(telemetry: &epo_config::TelemetrySection, payload: String) {
    let client = match reqwest::Client::builder().build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "cannot build metrics export client");
            return;
        }
    };
    let mut request = client
        .post(&telemetry.endpoint)
        .header("content-type", "text/plain; version=0.0.4")
        .body(payload);
    for (key, value) in &telemetry.headers {
        request = request.header(key, value);
    }
    match request.send().await {
        Ok(response) if response.status().is_success() => {
            info!(endpoint = %telemetry.endpoint, "metrics exported");
        }
        Ok(response) => {
            warn!(status = %response.status(), "metrics export rejected");
        }
        Err(e) => {
            warn!(error = %e, "metrics export failed");
        }
    }
}
