//! SHA-1 checksum helpers.
//!
//! The catalog publishes SHA-1 digests per item; these helpers hash files
//! in 128 KiB chunks and compare case-insensitively against the manifest.

use crate::error::{FetchError, Result};
use digest::Digest;
use sha1::Sha1;
use std::io::Read;
use std::path::Path;

/// Compute the SHA-1 of a file as lowercase hex.
///
/// # Errors
/// Returns I/O error if file cannot be read.
pub fn sha1_file(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path).map_err(|e| FetchError::io(path, &e))?;
    let mut reader = std::io::BufReader::with_capacity(128 * 1024, file);
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; 128 * 1024];

    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| FetchError::io(path, &e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(bytes_to_hex(&hasher.finalize()))
}

/// Check a file against an expected SHA-1 hex digest.
///
/// # Errors
/// Returns I/O error if file cannot be read.
pub fn file_matches(path: &Path, expected: &str) -> Result<bool> {
    let actual = sha1_file(path)?;
    Ok(actual.eq_ignore_ascii_case(expected.trim()))
}

/// Convert bytes to lowercase hex string.
fn bytes_to_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut s = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        s.push(HEX[(byte >> 4) as usize] as char);
        s.push(HEX[(byte & 0x0f) as usize] as char);
    }
    s
}
