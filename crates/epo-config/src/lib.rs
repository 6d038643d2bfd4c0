//! Configuration for the EPO bulk-data processor.
//!
//! Configuration is resolved in layers: built-in defaults, then an optional
//! config file (YAML, JSON, or TOML — selected by extension), then `EPO_`
//! environment variables, then command-line overrides. [`validate`] checks
//! the resolved struct before any stage runs.

mod env;
mod error;
mod loader;
mod types;
mod validate;

pub use env::EpoEnvVar;
pub use error::{ConfigError, Result};
pub use loader::{CliOverrides, ConfigLoader};
pub use types::{
    Config, DownloadSection, ExtractSection, LogSection, ParseSection, ServerSection,
    TelemetrySection,
};
pub use validate::validate;
