//! Recursive ZIP extraction for EPO bulk-data deliveries.
//!
//! Deliveries arrive as ZIP archives that may contain further ZIPs. The
//! unpacker runs a non-recursive pass over the download directory, extracting
//! each top-level archive into a sibling directory named after its basename,
//! then drives a per-archive fixpoint: walk the destination for nested
//! `*.zip` files, extract each into its parent directory, repeat until a walk
//! finds none. Consumed archives are deleted when `delete_after_extract` is
//! set; otherwise a visited-set guarantees the fixpoint terminates.

use epo_telemetry::ProgressTracker;
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extraction error.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The archive could not be opened or decoded.
    #[error("archive error at {path}: {message}")]
    Zip {
        /// Archive path.
        path: PathBuf,
        /// Zip reader detail.
        message: String,
    },

    /// An entry path would escape the destination directory.
    #[error("unsafe entry '{entry}' in {path}")]
    UnsafePath {
        /// Archive path.
        path: PathBuf,
        /// Offending entry name.
        entry: String,
    },

    /// I/O error with path context.
    #[error("I/O error at {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The run was cancelled.
    #[error("extraction cancelled")]
    Cancelled,
}

impl ArchiveError {
    fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    fn zip(path: impl Into<PathBuf>, err: &zip::result::ZipError) -> Self {
        Self::Zip {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<ArchiveError> for epo_core::Error {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Cancelled => Self::Cancelled,
            ArchiveError::Io { path, message } => Self::Io { path, message },
            ArchiveError::Zip { path, message } => Self::Archive { path, message },
            ArchiveError::UnsafePath { path, entry } => Self::Archive {
                path,
                message: format!("unsafe entry '{entry}'"),
            },
        }
    }
}

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Options for one unpack session.
#[derive(Debug, Clone, Default)]
pub struct UnpackOptions {
    /// Delete every consumed archive after a successful extraction.
    pub delete_after_extract: bool,
    /// Draw a terminal progress bar over top-level archives.
    pub show_progress: bool,
}

/// What one archive extraction produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractionSummary {
    /// Regular files written.
    pub files_extracted: usize,
    /// Bytes written.
    pub total_size: u64,
}

/// Totals for a whole unpack session.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnpackStats {
    /// Top-level archives processed.
    pub archives: usize,
    /// Nested archives expanded by the fixpoint.
    pub nested_archives: usize,
    /// Regular files written.
    pub files_extracted: usize,
}

/// Extract every top-level archive in `dir` and expand nested archives to a
/// fixpoint. Top-level archives are processed in parallel; each archive's
/// fixpoint is sequential.
///
/// # Errors
/// Returns the first extraction failure, or `Cancelled`.
pub async fn unpack_all(
    dir: &Path,
    options: &UnpackOptions,
    token: &CancellationToken,
) -> Result<UnpackStats> {
    let archives = list_zip_files(dir)?;
    if archives.is_empty() {
        info!(dir = %dir.display(), "no archives to extract");
        return Ok(UnpackStats::default());
    }

    info!(dir = %dir.display(), archives = archives.len(), "extracting archives");
    let progress = ProgressTracker::items(archives.len() as u64, options.show_progress);
    let parallelism = std::thread::available_parallelism().map_or(4, |n| n.get());

    let results: Vec<Result<UnpackStats>> = stream::iter(archives)
        .map(|archive| {
            let options = options.clone();
            let token = token.clone();
            let progress = progress.clone();
            async move {
                let result = tokio::task::spawn_blocking(move || {
                    unpack_archive_tree(&archive, &options, &token)
                })
                .await
                .map_err(|e| ArchiveError::Io {
                    path: dir.to_path_buf(),
                    message: e.to_string(),
                })?;
                progress.add(1);
                result
            }
        })
        .buffer_unordered(parallelism)
        .collect()
        .await;

    progress.finish();

    let mut stats = UnpackStats::default();
    for result in results {
        let one = result?;
        stats.archives += one.archives;
        stats.nested_archives += one.nested_archives;
        stats.files_extracted += one.files_extracted;
    }

    info!(
        archives = stats.archives,
        nested = stats.nested_archives,
        files = stats.files_extracted,
        "extraction complete"
    );
    Ok(stats)
}

/// Extract one top-level archive into its sibling directory, then expand
/// nested archives until a walk of the destination finds none.
fn unpack_archive_tree(
    archive: &Path,
    options: &UnpackOptions,
    token: &CancellationToken,
) -> Result<UnpackStats> {
    if token.is_cancelled() {
        return Err(ArchiveError::Cancelled);
    }

    let dest = archive.with_extension("");
    debug!(archive = %archive.display(), dest = %dest.display(), "extracting");

    let mut stats = UnpackStats {
        archives: 1,
        ..UnpackStats::default()
    };
    let summary = extract_archive(archive, &dest)?;
    stats.files_extracted += summary.files_extracted;
    consume_archive(archive, options.delete_after_extract);

    let mut visited: HashSet<PathBuf> = HashSet::new();
    loop {
        if token.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }

        let nested: Vec<PathBuf> = WalkDir::new(&dest)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file() && has_zip_extension(e.path()))
            .map(|e| e.into_path())
            .filter(|p| !visited.contains(p))
            .collect();

        if nested.is_empty() {
            break;
        }

        for inner in nested {
            if token.is_cancelled() {
                return Err(ArchiveError::Cancelled);
            }
            let parent = inner
                .parent()
                .map_or_else(|| dest.clone(), Path::to_path_buf);
            debug!(archive = %inner.display(), "expanding nested archive");
            let summary = extract_archive(&inner, &parent)?;
            stats.files_extracted += summary.files_extracted;
            stats.nested_archives += 1;
            consume_archive(&inner, options.delete_after_extract);
            visited.insert(inner);
        }
    }

    Ok(stats)
}

/// Extract one ZIP archive to `dest`, rejecting entries that escape it.
///
/// # Errors
/// Returns error on reader failures, unsafe entry paths, or I/O failures.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<ExtractionSummary> {
    let file = File::open(archive).map_err(|e| ArchiveError::io(archive, &e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| ArchiveError::zip(archive, &e))?;

    std::fs::create_dir_all(dest).map_err(|e| ArchiveError::io(dest, &e))?;

    let mut summary = ExtractionSummary::default();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| ArchiveError::zip(archive, &e))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(ArchiveError::UnsafePath {
                path: archive.to_path_buf(),
                entry: entry.name().to_string(),
            });
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| ArchiveError::io(&out_path, &e))?;
        } else {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, &e))?;
            }

            let mut out_file =
                File::create(&out_path).map_err(|e| ArchiveError::io(&out_path, &e))?;
            let size = std::io::copy(&mut entry, &mut out_file)
                .map_err(|e| ArchiveError::io(&out_path, &e))?;

            summary.files_extracted += 1;
            summary.total_size += size;
        }
    }

    Ok(summary)
}

/// Delete a consumed archive when configured; failures are warnings only.
fn consume_archive(archive: &Path, delete: bool) {
    if !delete {
        return;
    }
    if let Err(e) = std::fs::remove_file(archive) {
        warn!(archive = %archive.display(), error = %e, "cannot delete consumed archive");
    }
}

/// Non-recursive listing of `*.zip` files in a directory.
fn list_zip_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| ArchiveError::io(dir, &e))?;
    let mut archives = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ArchiveError::io(dir, &e))?;
        let path = entry.path();
        if path.is_file() && has_zip_extension(&path) {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}

fn has_zip_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
        cursor.into_inner()
    }

    fn count_files_with_extension(dir: &Path, ext: &str) -> usize {
        WalkDir::new(dir)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| {
                e.file_type().is_file()
                    && e.path()
                        .extension()
                        .and_then(|x| x.to_str())
                        .is_some_and(|x| x.eq_ignore_ascii_case(ext))
            })
            .count()
    }

    #[test]
    fn extracts_into_sibling_directory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("delivery.zip");
        write_zip(&archive, &[("doc1.xml", b"<a/>"), ("sub/doc2.xml", b"<b/>")]);

        let summary = extract_archive(&archive, &dir.path().join("delivery")).unwrap();
        assert_eq!(summary.files_extracted, 2);
        assert!(dir.path().join("delivery/doc1.xml").exists());
        assert!(dir.path().join("delivery/sub/doc2.xml").exists());
    }

    #[test]
    fn rejects_escaping_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        write_zip(&archive, &[("../escape.txt", b"nope")]);

        let err = extract_archive(&archive, &dir.path().join("evil")).unwrap_err();
        assert!(matches!(err, ArchiveError::UnsafePath { .. }));
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn nested_archives_reach_fixpoint_with_delete() {
        let dir = tempfile::tempdir().unwrap();
        let inner = zip_bytes(&[("inner.xml", b"<inner/>")]);
        write_zip(
            &dir.path().join("outer.zip"),
            &[
                ("a.xml", b"<a/>"),
                ("b.xml", b"<b/>"),
                ("nested.zip", &inner),
            ],
        );

        let options = UnpackOptions {
            delete_after_extract: true,
            show_progress: false,
        };
        let token = CancellationToken::new();
        let stats = unpack_all(dir.path(), &options, &token).await.unwrap();

        assert_eq!(stats.archives, 1);
        assert_eq!(stats.nested_archives, 1);
        assert_eq!(count_files_with_extension(dir.path(), "xml"), 3);
        assert_eq!(count_files_with_extension(dir.path(), "zip"), 0);
    }

    #[tokio::test]
    async fn fixpoint_terminates_without_delete() {
        let dir = tempfile::tempdir().unwrap();
        let innermost = zip_bytes(&[("deep.xml", b"<deep/>")]);
        let inner = zip_bytes(&[("mid.xml", b"<mid/>"), ("innermost.zip", &innermost)]);
        write_zip(&dir.path().join("outer.zip"), &[("nested.zip", &inner)]);

        let options = UnpackOptions::default();
        let token = CancellationToken::new();
        let stats = unpack_all(dir.path(), &options, &token).await.unwrap();

        assert_eq!(stats.nested_archives, 2);
        assert_eq!(count_files_with_extension(dir.path(), "xml"), 2);
        // nothing deleted: the outer archive plus both nested ones remain
        assert_eq!(count_files_with_extension(dir.path(), "zip"), 3);
    }

    #[tokio::test]
    async fn top_level_archives_run_in_parallel() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            write_zip(
                &dir.path().join(format!("part{i}.zip")),
                &[("doc.xml", b"<doc/>")],
            );
        }

        let options = UnpackOptions {
            delete_after_extract: true,
            show_progress: false,
        };
        let token = CancellationToken::new();
        let stats = unpack_all(dir.path(), &options, &token).await.unwrap();

        assert_eq!(stats.archives, 5);
        assert_eq!(stats.files_extracted, 5);
        assert_eq!(count_files_with_extension(dir.path(), "zip"), 0);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        write_zip(&dir.path().join("one.zip"), &[("doc.xml", b"<doc/>")]);

        let token = CancellationToken::new();
        token.cancel();
        let err = unpack_all(dir.path(), &UnpackOptions::default(), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Cancelled));
    }

    #[test]
    fn zip_listing_is_non_recursive_and_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        write_zip(&dir.path().join("a.zip"), &[("x", b"1")]);
        write_zip(&dir.path().join("b.ZIP"), &[("y", b"2")]);
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write_zip(&dir.path().join("sub/c.zip"), &[("z", b"3")]);
        std::fs::write(dir.path().join("readme.txt"), b"not a zip").unwrap();

        let listed = list_zip_files(dir.path()).unwrap();
        assert_eq!(listed.len(), 2);
    }
}
