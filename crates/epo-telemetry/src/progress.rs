//! Terminal progress reporting.
//!
//! A thin wrapper over indicatif exposing the three operations the stages
//! need: advance, describe, finish. Disabled trackers keep the same surface
//! with a hidden draw target, so worker code never branches on TTY-ness.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;

/// Shared progress bar for one pipeline stage.
#[derive(Clone)]
pub struct ProgressTracker {
    bar: Arc<ProgressBar>,
    enabled: bool,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("enabled", &self.enabled)
            .field("position", &self.bar.position())
            .finish()
    }
}

impl ProgressTracker {
    /// Create a byte-denominated bar (download stage).
    #[must_use]
    pub fn bytes(total: u64, enabled: bool) -> Self {
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        Self::with_style(total, enabled, style)
    }

    /// Create an item-denominated bar (extract and parse stages).
    #[must_use]
    pub fn items(total: u64, enabled: bool) -> Self {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        Self::with_style(total, enabled, style)
    }

    /// Create a tracker that renders nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self::items(0, false)
    }

    fn with_style(total: u64, enabled: bool, style: ProgressStyle) -> Self {
        let bar = ProgressBar::new(total);
        if enabled {
            bar.set_style(style);
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self {
            bar: Arc::new(bar),
            enabled,
        }
    }

    /// Whether the bar actually draws.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Advance by `n` units.
    pub fn add(&self, n: u64) {
        self.bar.inc(n);
    }

    /// Set the advisory status message.
    pub fn describe(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    /// Finish and clear the bar.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Current position, for progress messaging only.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

/// Format bytes as a human-readable string.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{size:.0} {}", UNITS[unit_idx])
    } else {
        format!("{size:.1} {}", UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_test() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.0 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn disabled_tracker_is_inert() {
        let tracker = ProgressTracker::disabled();
        assert!(!tracker.is_enabled());
        tracker.add(10);
        tracker.describe("working");
        assert_eq!(tracker.position(), 10);
        tracker.finish();
    }

    #[test]
    fn byte_tracker_accumulates() {
        let tracker = ProgressTracker::bytes(600, false);
        tracker.add(100);
        tracker.add(200);
        assert_eq!(tracker.position(), 300);
    }
}
