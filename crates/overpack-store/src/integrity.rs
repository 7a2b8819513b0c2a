use crate::archive::Archive;
use overpack_schema::{Checksum, Manifest, MANIFEST_PATH};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Result of checking an archive's payloads against its manifest.
#[derive(Debug, Default, Serialize)]
pub struct IntegrityReport {
    pub checked: usize,
    pub passed: usize,
    pub failed: Vec<IntegrityFailure>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// Whether the manifest entry at `index` failed verification.
    pub fn entry_failed(&self, index: usize) -> bool {
        self.failed.iter().any(|f| f.index == Some(index))
    }
}

/// One violation of the manifest/payload correspondence.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{path}: {issue}")]
pub struct IntegrityFailure {
    /// Manifest position of the entry; `None` for orphan archive entries.
    pub index: Option<usize>,
    pub path: String,
    pub issue: IntegrityIssue,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IntegrityIssue {
    #[error("declared in manifest but missing from archive")]
    MissingPayload,
    #[error("size mismatch: manifest declares {expected} bytes, payload has {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("present in archive but not declared in manifest")]
    Orphan,
    /// Two payloads claim the same entry path when a package is saved.
    #[error("entry path claimed by more than one payload")]
    DuplicatePath,
}

/// Check every manifest entry against the archive, then look for orphans.
///
/// Failures are collected, not short-circuited, so one pass reports every
/// problem.
pub fn verify_archive(archive: &Archive, manifest: &Manifest) -> IntegrityReport {
    let mut report = IntegrityReport {
        checked: manifest.len(),
        ..Default::default()
    };

    for entry in manifest {
        let issue = match archive.get(&entry.path) {
            None => Some(IntegrityIssue::MissingPayload),
            Some(data) if data.len() as u64 != entry.size => Some(IntegrityIssue::SizeMismatch {
                expected: entry.size,
                actual: data.len() as u64,
            }),
            Some(data) => {
                let actual = Checksum::of(data);
                (actual != entry.checksum).then(|| IntegrityIssue::ChecksumMismatch {
                    expected: entry.checksum.to_string(),
                    actual: actual.into_inner(),
                })
            }
        };
        match issue {
            Some(issue) => report.failed.push(IntegrityFailure {
                index: Some(entry.index),
                path: entry.path.to_string(),
                issue,
            }),
            None => report.passed += 1,
        }
    }

    let declared: HashSet<&str> = manifest.iter().map(|e| e.path.as_str()).collect();
    for path in archive.paths() {
        if path != MANIFEST_PATH && !declared.contains(path) {
            report.failed.push(IntegrityFailure {
                index: None,
                path: path.to_owned(),
                issue: IntegrityIssue::Orphan,
            });
        }
    }

    report
}
