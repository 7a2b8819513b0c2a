use crate::{dir_codec, fsync_dir, parent_dir, tar_codec, zip_codec, ArchiveError};
use overpack_schema::EntryPath;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const TAR_MAGIC: &[u8] = b"ustar";
const TAR_MAGIC_OFFSET: usize = 257;

/// Physical container holding a package's entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    #[default]
    Zip,
    Tar,
    /// An unpacked package: one file per entry under a root directory.
    Directory,
}

impl ArchiveFormat {
    /// Identify the container at `path` from its magic bytes, or as a directory.
    pub fn detect(path: &Path) -> Result<Self, ArchiveError> {
        if !path.exists() {
            return Err(ArchiveError::NotFound(path.to_path_buf()));
        }
        if path.is_dir() {
            return Ok(Self::Directory);
        }
        let mut head = Vec::with_capacity(512);
        fs::File::open(path)?.take(512).read_to_end(&mut head)?;
        if head.starts_with(ZIP_MAGIC) || head.starts_with(ZIP_EMPTY_MAGIC) {
            Ok(Self::Zip)
        } else if head.get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()) == Some(TAR_MAGIC)
        {
            Ok(Self::Tar)
        } else {
            Err(ArchiveError::UnsupportedContainer(path.to_path_buf()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }
}

/// Files left behind by macOS archive tools; never part of a package.
pub fn is_junk_path(path: &str) -> bool {
    path.split('/')
        .any(|seg| seg == "__MACOSX" || seg == ".DS_Store")
}

/// Keyed, random-access view over the entries of an opened container.
///
/// Entries keep the order in which the container stored them. Directory
/// entries and macOS junk are dropped on open.
#[derive(Debug, Clone)]
pub struct Archive {
    format: ArchiveFormat,
    entries: Vec<ArchiveEntry>,
    index: HashMap<String, usize>,
}

impl Archive {
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let format = ArchiveFormat::detect(path)?;
        let raw = match format {
            ArchiveFormat::Zip => zip_codec::read(path)?,
            ArchiveFormat::Tar => tar_codec::read(path)?,
            ArchiveFormat::Directory => dir_codec::read(path)?,
        };
        let mut entries = Vec::with_capacity(raw.len());
        for entry in raw {
            if is_junk_path(&entry.path) {
                warn!("skipping junk archive entry {}", entry.path);
                continue;
            }
            entries.push(entry);
        }
        debug!(
            "opened {format:?} archive {} with {} entries",
            path.display(),
            entries.len()
        );
        Self::from_entries(format, entries)
    }

    pub fn from_entries(
        format: ArchiveFormat,
        entries: Vec<ArchiveEntry>,
    ) -> Result<Self, ArchiveError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if index.insert(entry.path.clone(), i).is_some() {
                return Err(ArchiveError::DuplicateEntry(entry.path.clone()));
            }
        }
        Ok(Self {
            format,
            entries,
            index,
        })
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.index
            .get(path)
            .map(|&i| self.entries[i].data.as_slice())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Entry paths in container order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write `entries` to `dest` in the given order.
    ///
    /// The container is built in a temporary sibling of `dest` and moved into
    /// place only once complete, so a failed write leaves `dest` untouched.
    pub fn write(
        dest: &Path,
        format: ArchiveFormat,
        entries: &[ArchiveEntry],
    ) -> Result<(), ArchiveError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in entries {
            if !EntryPath::from(entry.path.as_str()).is_well_formed() {
                return Err(ArchiveError::InvalidEntryPath(entry.path.clone()));
            }
            if !seen.insert(entry.path.as_str()) {
                return Err(ArchiveError::DuplicateEntry(entry.path.clone()));
            }
        }

        match format {
            ArchiveFormat::Zip => publish_file(dest, &zip_codec::encode(entries)?)?,
            ArchiveFormat::Tar => publish_file(dest, &tar_codec::encode(entries)?)?,
            ArchiveFormat::Directory => dir_codec::write(dest, entries)?,
        }
        debug!(
            "wrote {format:?} archive {} with {} entries",
            dest.display(),
            entries.len()
        );
        Ok(())
    }
}

/// Atomically replace `dest` with `data` via a synced temporary file.
fn publish_file(dest: &Path, data: &[u8]) -> Result<(), ArchiveError> {
    let dir = parent_dir(dest);
    fs::create_dir_all(&dir)?;
    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| ArchiveError::Io(e.error))?;
    fsync_dir(&dir)?;
    Ok(())
}
