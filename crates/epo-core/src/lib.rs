//! Core types shared across the EPO processor workspace.
//!
//! This crate is intentionally small: the aggregate [`Error`] type every
//! stage converts into, the matching [`Result`] alias, and the build
//! version string printed by the CLI.

mod error;
mod version;

pub use error::{Error, Result};
pub use version::version_string;
