//! Package manifest model for VPK archives.
//!
//! This crate defines the schema layer: the TOML manifest (`Manifest`) that
//! orders and routes every entry of a package, its entry descriptors, and the
//! blake3 checksums and path newtypes shared by the store and core crates.

pub mod manifest;
pub mod types;

pub use manifest::{
    EntryDescriptor, EntryKind, Manifest, ManifestError, MANIFEST_PATH, MANIFEST_VERSION,
};
pub use types::{Checksum, EntryPath};
