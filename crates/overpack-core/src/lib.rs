//! Package object model for VPK archives.
//!
//! This crate ties together the MDL parser, the manifest schema, and the
//! archive store into `Package`: the aggregate that loads an archive into
//! typed components and code entries, keeps the manifest in step with every
//! mutation, and saves back atomically. It also provides the structural
//! diff between two packages.

pub mod code;
pub mod component;
pub mod diff;
pub mod options;
pub mod package;

pub use code::CodeEntry;
pub use component::{
    Component, ComponentId, ComponentLoadCause, ComponentLoadError, ConfigurationComponent,
    DataComponent,
};
pub use diff::{diff, diff_with, Change, ChangeKind, ChangeTarget, DiffReport};
pub use options::{DiffOptions, LoadMode, LoadOptions, OverpackConfig, SaveOptions};
pub use package::{LoadFailure, LoadFailures, LoadOutcome, Package};

use overpack_store::IntegrityFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] overpack_schema::ManifestError),
    #[error("archive error: {0}")]
    Archive(#[from] overpack_store::ArchiveError),
    #[error("integrity check failed: {}", render_integrity(.0))]
    Integrity(Vec<IntegrityFailure>),
    #[error("{0}")]
    Load(LoadFailures),
    #[error("component already present: {0}")]
    DuplicateComponent(ComponentId),
    #[error("component not found: {0}")]
    ComponentNotFound(ComponentId),
    #[error("entry path already in use: {0}")]
    DuplicatePath(String),
    #[error("code entry not found: {0}")]
    CodeNotFound(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn render_integrity(failures: &[IntegrityFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
