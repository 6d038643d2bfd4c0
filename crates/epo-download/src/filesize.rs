//! Human file-size strings to bytes.
//!
//! The catalog reports item sizes as strings like `"12.3 MB"`. The parser
//! accepts an integer part, an optional `.` or `,` fraction, and an optional
//! unit, case-insensitively. Anything else — including an unrecognized unit —
//! yields 0, which only degrades progress totals, never correctness.

use once_cell::sync::Lazy;
use regex::Regex;

static SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)(?:[.,](\d+))?\s*([A-Za-z]*)$").expect("file-size regex is valid")
});

/// Parse a human file-size string into bytes.
#[must_use]
pub fn parse_file_size(input: &str) -> u64 {
    let Some(caps) = SIZE_RE.captures(input.trim()) else {
        return 0;
    };

    let Ok(whole) = caps[1].parse::<u64>() else {
        return 0;
    };

    let multiplier: u64 = match caps[3].to_ascii_uppercase().as_str() {
        "" | "B" | "BYTE" | "BYTES" => 1,
        "K" | "KB" | "KIB" => 1 << 10,
        "M" | "MB" | "MIB" => 1 << 20,
        "G" | "GB" | "GIB" => 1 << 30,
        "T" | "TB" | "TIB" => 1 << 40,
        _ => return 0,
    };

    let mut bytes = whole.saturating_mul(multiplier);
    if let Some(frac) = caps.get(2) {
        let digits = frac.as_str().len() as u32;
        let frac_value = frac.as_str().parse::<u64>().unwrap_or(0);
        if let Some(scale) = 10u64.checked_pow(digits) {
            bytes = bytes.saturating_add(frac_value.saturating_mul(multiplier) / scale);
        }
    }
    bytes
}
