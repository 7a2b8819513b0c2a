//! Zip containers, the native VPK format.

use crate::archive::ArchiveEntry;
use crate::ArchiveError;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Read every file entry in central-directory order, skipping directories.
pub fn read(path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut zip = ZipArchive::new(BufReader::new(File::open(path)?))?;
    let mut entries = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_owned();
        let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut data)?;
        entries.push(ArchiveEntry { path: name, data });
    }
    Ok(entries)
}

/// Encode entries in order. Timestamps and permissions are fixed so that
/// identical entries always produce identical bytes.
pub fn encode(entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        writer.start_file(entry.path.as_str(), options)?;
        writer.write_all(&entry.data)?;
    }
    Ok(writer.finish()?.into_inner())
}
