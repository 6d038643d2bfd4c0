//! Tracing initialization.
//!
//! Events go to stderr and to a timestamped file under `log.log_dir`,
//! named `epo-processor[{YYYYMMDD-HHMMSS}].log`.

use chrono::Local;
use epo_config::LogSection;
use epo_core::Error;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Map a validated config level string to a tracing level.
#[must_use]
pub fn level_from_str(level: &str) -> Level {
    match level {
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the log file path for a run starting now.
#[must_use]
pub fn log_file_path(section: &LogSection) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    section.log_dir.join(format!("epo-processor[{stamp}].log"))
}

/// Initialize the global subscriber: stderr plus the run's log file.
///
/// Returns the log file path. Safe to call once per process; a second call
/// fails because the global subscriber is already set.
///
/// # Errors
/// Returns error if the log directory or file cannot be created, or if a
/// subscriber is already installed.
pub fn init(section: &LogSection) -> Result<PathBuf, Error> {
    std::fs::create_dir_all(&section.log_dir).map_err(|e| Error::io(&section.log_dir, &e))?;
    let path = log_file_path(section);
    let file = std::fs::File::create(&path).map_err(|e| Error::io(&path, &e))?;

    let filter = EnvFilter::builder()
        .with_default_directive(level_from_str(&section.log_level).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .map_err(|e| Error::Config(format!("cannot install tracing subscriber: {e}")))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_mapping() {
        assert_eq!(level_from_str("debug"), Level::DEBUG);
        assert_eq!(level_from_str("info"), Level::INFO);
        assert_eq!(level_from_str("warn"), Level::WARN);
        assert_eq!(level_from_str("error"), Level::ERROR);
    }

    #[test]
    fn log_path_shape() {
        let section = LogSection {
            log_level: "info".into(),
            log_dir: PathBuf::from("/tmp/epo-logs"),
        };
        let path = log_file_path(&section);
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("epo-processor["));
        assert!(name.ends_with("].log"));
        // stamp is YYYYMMDD-HHMMSS
        assert_eq!(name.len(), "epo-processor[YYYYMMDD-HHMMSS].log".len());
    }
}
