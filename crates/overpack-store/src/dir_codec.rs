//! Unpacked packages: a directory tree with one file per entry.

use crate::archive::ArchiveEntry;
use crate::{fsync_dir, parent_dir, ArchiveError};
use std::fs;
use std::path::{Path, PathBuf};

/// Read every regular file below `root`, sorted by relative path.
pub fn read(root: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut entries = Vec::with_capacity(files.len());
    for (rel, full) in files {
        entries.push(ArchiveEntry {
            path: rel,
            data: fs::read(&full)?,
        });
    }
    Ok(entries)
}

/// Recursively collect (relative path with `/` separators, full path) pairs.
fn collect_files(
    root: &Path,
    current: &Path,
    out: &mut Vec<(String, PathBuf)>,
) -> Result<(), ArchiveError> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let full = entry.path();
        let meta = entry.file_type()?;
        if meta.is_dir() {
            collect_files(root, &full, out)?;
        } else if meta.is_file() {
            let rel = full
                .strip_prefix(root)
                .map_err(|e| ArchiveError::Io(std::io::Error::other(format!("path strip: {e}"))))?
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push((rel, full));
        }
    }
    Ok(())
}

/// Write entries into a staging directory next to `dest`, then swap it in.
///
/// An existing `dest` is moved aside first and restored if the final rename
/// fails.
pub fn write(dest: &Path, entries: &[ArchiveEntry]) -> Result<(), ArchiveError> {
    let parent = parent_dir(dest);
    fs::create_dir_all(&parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".overpack-staging-")
        .tempdir_in(&parent)?;
    for entry in entries {
        let target = staging.path().join(&entry.path);
        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&target, &entry.data)?;
    }

    let backup = tempfile::Builder::new()
        .prefix(".overpack-previous-")
        .tempdir_in(&parent)?;
    let previous = backup.path().join("previous");
    let had_previous = dest.exists();
    if had_previous {
        fs::rename(dest, &previous)?;
    }

    if let Err(e) = fs::rename(staging.path(), dest) {
        if had_previous {
            fs::rename(&previous, dest)?;
        }
        return Err(ArchiveError::Io(e));
    }
    fsync_dir(&parent)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_walks_nested_directories_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components/00010")).unwrap();
        fs::write(dir.path().join("manifest.toml"), "m").unwrap();
        fs::write(dir.path().join("components/00010/a.mdl"), "a").unwrap();

        let entries = read(dir.path()).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["components/00010/a.mdl", "manifest.toml"]);
    }

    #[test]
    fn write_replaces_existing_tree() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("pkg");
        write(&dest, &[ArchiveEntry::new("old/stale.txt", "x")]).unwrap();
        write(&dest, &[ArchiveEntry::new("new.txt", "y")]).unwrap();

        assert!(!dest.join("old/stale.txt").exists());
        assert_eq!(fs::read_to_string(dest.join("new.txt")).unwrap(), "y");

        // staging and backup directories are cleaned up
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("pkg")]);
    }
}
