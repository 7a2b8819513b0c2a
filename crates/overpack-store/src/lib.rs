//! Archive I/O and integrity verification for VPK packages.
//!
//! This crate provides the storage layer: an in-memory keyed view over the
//! entries of a package container (`Archive`), codecs for zip, tar, and
//! unpacked-directory containers, atomic publication of written archives, and
//! `verify_archive`, which checks archive payloads against a manifest.

pub mod archive;
pub mod dir_codec;
pub mod integrity;
pub mod tar_codec;
pub mod zip_codec;

pub use archive::{is_junk_path, Archive, ArchiveEntry, ArchiveFormat};
pub use integrity::{verify_archive, IntegrityFailure, IntegrityIssue, IntegrityReport};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fsync a directory to ensure that a preceding `rename()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

/// Directory that will hold `dest`, never empty.
pub(crate) fn parent_dir(dest: &Path) -> PathBuf {
    match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("unrecognized container format: {}", .0.display())]
    UnsupportedContainer(PathBuf),
    #[error("duplicate archive entry: {0}")]
    DuplicateEntry(String),
    #[error("invalid archive entry path: '{0}'")]
    InvalidEntryPath(String),
}
