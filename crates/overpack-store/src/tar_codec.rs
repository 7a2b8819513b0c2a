//! Tar containers.

use crate::archive::ArchiveEntry;
use crate::ArchiveError;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Read every regular file entry in stream order.
pub fn read(path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut ar = tar::Archive::new(BufReader::new(File::open(path)?));
    let mut entries = Vec::new();
    for entry in ar.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.to_string_lossy().into_owned();
        let mut data = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry.read_to_end(&mut data)?;
        entries.push(ArchiveEntry { path: name, data });
    }
    Ok(entries)
}

/// Encode entries in order with mtime 0, ownership 0:0 and mode 0644.
pub fn encode(entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
    let mut ar = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mode(0o644);
        header.set_size(entry.data.len() as u64);
        header.set_cksum();
        ar.append_data(&mut header, &entry.path, entry.data.as_slice())?;
    }
    Ok(ar.into_inner()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_read_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.tar");
        let long_name = format!("components/{}/entry.mdl", "n".repeat(120));
        let entries = vec![
            ArchiveEntry::new("z.txt", "last first"),
            ArchiveEntry::new(long_name, "long = true"),
        ];
        std::fs::write(&path, encode(&entries).unwrap()).unwrap();
        assert_eq!(read(&path).unwrap(), entries);
    }

    #[test]
    fn encode_is_deterministic() {
        let entries = vec![ArchiveEntry::new("a", "1")];
        assert_eq!(encode(&entries).unwrap(), encode(&entries).unwrap());
    }
}
