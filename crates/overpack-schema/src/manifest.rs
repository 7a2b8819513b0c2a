use crate::types::{Checksum, EntryPath};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Fixed archive path of the manifest entry.
pub const MANIFEST_PATH: &str = "manifest.toml";
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest entry '{0}' not found in archive")]
    NotFound(String),
    #[error("manifest is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("failed to serialize manifest: {0}")]
    SerializeToml(#[from] toml::ser::Error),
    #[error("unsupported manifest_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("invalid entry path: '{0}'")]
    InvalidPath(String),
    #[error("duplicate entry path: '{0}'")]
    DuplicatePath(String),
    #[error("duplicate component '{component_type}.{name}'")]
    DuplicateIdentity {
        component_type: String,
        name: String,
    },
    #[error("entry '{path}' has index {index} but is at position {position}")]
    IndexMismatch {
        path: String,
        index: usize,
        position: usize,
    },
}

/// How an entry's payload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// MDL text, parsed into a syntax tree.
    Configuration,
    /// Opaque component payload.
    Data,
    /// Bundled code artifact.
    Code,
}

impl EntryKind {
    pub fn is_component(self) -> bool {
        !matches!(self, Self::Code)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configuration => "configuration",
            Self::Data => "data",
            Self::Code => "code",
        })
    }
}

/// One declared entry. For code entries `entry_type` holds the code kind
/// (for example `java`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryDescriptor {
    pub index: usize,
    pub path: EntryPath,
    pub kind: EntryKind,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub name: String,
    pub size: u64,
    pub checksum: Checksum,
}

impl EntryDescriptor {
    /// Build a descriptor for `payload`; the index is assigned when pushed.
    pub fn for_payload(
        path: EntryPath,
        kind: EntryKind,
        entry_type: impl Into<String>,
        name: impl Into<String>,
        payload: &[u8],
    ) -> Self {
        Self {
            index: 0,
            path,
            kind,
            entry_type: entry_type.into(),
            name: name.into(),
            size: payload.len() as u64,
            checksum: Checksum::of(payload),
        }
    }

    /// Whether `payload` matches the declared size and checksum.
    pub fn matches(&self, payload: &[u8]) -> bool {
        self.size == payload.len() as u64 && self.checksum == Checksum::of(payload)
    }
}

/// Ordered index of a package's entries. Order is preserved verbatim on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub manifest_version: u32,
    #[serde(default, rename = "entry")]
    entries: Vec<EntryDescriptor>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            manifest_version: MANIFEST_VERSION,
            entries: Vec::new(),
        }
    }

    /// Build a manifest from descriptors, renumbering indices by position.
    pub fn from_entries(entries: Vec<EntryDescriptor>) -> Result<Self, ManifestError> {
        let mut manifest = Self {
            manifest_version: MANIFEST_VERSION,
            entries,
        };
        manifest.reindex();
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        Self::parse_str(std::str::from_utf8(bytes)?)
    }

    pub fn parse_str(input: &str) -> Result<Self, ManifestError> {
        let manifest: Self = toml::from_str(input)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn serialize(&self) -> Result<String, ManifestError> {
        Ok(toml::to_string(self)?)
    }

    /// Structural checks: version, path shape, index order, uniqueness.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.manifest_version != MANIFEST_VERSION {
            return Err(ManifestError::UnsupportedVersion(self.manifest_version));
        }
        let mut paths = HashSet::with_capacity(self.entries.len());
        let mut identities = HashSet::new();
        for (position, entry) in self.entries.iter().enumerate() {
            if !entry.path.is_well_formed() || entry.path == MANIFEST_PATH {
                return Err(ManifestError::InvalidPath(entry.path.to_string()));
            }
            if entry.index != position {
                return Err(ManifestError::IndexMismatch {
                    path: entry.path.to_string(),
                    index: entry.index,
                    position,
                });
            }
            if !paths.insert(entry.path.as_str()) {
                return Err(ManifestError::DuplicatePath(entry.path.to_string()));
            }
            if entry.kind.is_component()
                && !identities.insert((entry.entry_type.as_str(), entry.name.as_str()))
            {
                return Err(ManifestError::DuplicateIdentity {
                    component_type: entry.entry_type.clone(),
                    name: entry.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> &[EntryDescriptor] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntryDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&EntryDescriptor> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn position(&self, path: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.path == path)
    }

    /// Append a descriptor, assigning the next index.
    pub fn push(&mut self, mut entry: EntryDescriptor) -> Result<(), ManifestError> {
        if !entry.path.is_well_formed() || entry.path == MANIFEST_PATH {
            return Err(ManifestError::InvalidPath(entry.path.into_inner()));
        }
        if self.get(&entry.path).is_some() {
            return Err(ManifestError::DuplicatePath(entry.path.into_inner()));
        }
        entry.index = self.entries.len();
        self.entries.push(entry);
        Ok(())
    }

    /// Replace the descriptor at `position`, keeping its place in the order.
    pub fn replace(
        &mut self,
        position: usize,
        mut entry: EntryDescriptor,
    ) -> Result<EntryDescriptor, ManifestError> {
        if !entry.path.is_well_formed() || entry.path == MANIFEST_PATH {
            return Err(ManifestError::InvalidPath(entry.path.into_inner()));
        }
        if self
            .entries
            .iter()
            .enumerate()
            .any(|(i, e)| i != position && e.path == entry.path)
        {
            return Err(ManifestError::DuplicatePath(entry.path.into_inner()));
        }
        entry.index = position;
        Ok(std::mem::replace(&mut self.entries[position], entry))
    }

    /// Remove the descriptor for `path` and renumber the remaining entries.
    pub fn remove(&mut self, path: &str) -> Option<EntryDescriptor> {
        let position = self.position(path)?;
        let removed = self.entries.remove(position);
        self.reindex();
        Some(removed)
    }

    /// Keep only the descriptors for which `keep` returns true, renumbering.
    pub fn retain(&mut self, keep: impl FnMut(&EntryDescriptor) -> bool) {
        self.entries.retain(keep);
        self.reindex();
    }

    fn reindex(&mut self) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.index = i;
        }
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a EntryDescriptor;
    type IntoIter = std::slice::Iter<'a, EntryDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
