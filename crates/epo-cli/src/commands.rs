//! Command-line surface.

use clap::{Parser, Subcommand};
use epo_config::CliOverrides;
use std::path::PathBuf;

/// EPO bulk patent-data processor: download, extract, parse to CSV.
#[derive(Debug, Parser)]
#[command(name = "epo-processor", disable_version_flag = true)]
pub struct Cli {
    /// Path to a YAML, JSON, or TOML config file.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the bulk-data service.
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Product identifier in the catalog.
    #[arg(long, global = true, value_name = "ID")]
    pub product_id: Option<String>,

    /// Concurrent download slots (1 to 30).
    #[arg(long, global = true, value_name = "N")]
    pub concurrent_downloads: Option<usize>,

    /// Download target directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Output CSV path.
    #[arg(long, global = true, value_name = "PATH")]
    pub output_csv: Option<PathBuf>,

    /// Concurrent XML workers.
    #[arg(long, global = true, value_name = "N")]
    pub workers: Option<usize>,

    /// Minimum log level: debug, info, warn, or error.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Stage to run; the default runs every enabled stage in order.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download catalog items only.
    Download,
    /// Extract downloaded archives only.
    Extract,
    /// Parse extracted XML files to CSV only.
    Parse,
    /// Print the build version.
    Version,
    /// Configuration utilities.
    Config {
        /// Configuration subcommand.
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Dump the effective configuration as indented JSON.
    Print,
}

impl Cli {
    /// Collect flag values into config overrides.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            base_url: self.base_url.clone(),
            product_id: self.product_id.clone(),
            concurrent_downloads: self.concurrent_downloads,
            download_dir: self.download_dir.clone(),
            output_csv: self.output_csv.clone(),
            workers: self.workers,
            log_level: self.log_level.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_root_with_flags() {
        let cli = Cli::parse_from([
            "epo-processor",
            "--config",
            "epo.yaml",
            "--base-url",
            "https://example.org",
            "--workers",
            "4",
        ]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("epo.yaml")));
        let overrides = cli.overrides();
        assert_eq!(overrides.base_url.as_deref(), Some("https://example.org"));
        assert_eq!(overrides.workers, Some(4));
    }

    #[test]
    fn parses_stage_subcommands() {
        assert!(matches!(
            Cli::parse_from(["epo-processor", "download"]).command,
            Some(Commands::Download)
        ));
        assert!(matches!(
            Cli::parse_from(["epo-processor", "extract"]).command,
            Some(Commands::Extract)
        ));
        assert!(matches!(
            Cli::parse_from(["epo-processor", "parse"]).command,
            Some(Commands::Parse)
        ));
    }

    #[test]
    fn parses_config_print() {
        let cli = Cli::parse_from(["epo-processor", "config", "print"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                command: ConfigCommands::Print
            })
        ));
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::parse_from(["epo-processor", "parse", "--output-csv", "rows.csv"]);
        assert_eq!(cli.output_csv, Some(PathBuf::from("rows.csv")));
    }
}
