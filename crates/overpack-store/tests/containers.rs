//! Cross-format container tests: the same entries survive every codec and
//! verify cleanly against a manifest built from them.

use overpack_schema::{EntryDescriptor, EntryKind, EntryPath, Manifest, MANIFEST_PATH};
use overpack_store::{verify_archive, Archive, ArchiveEntry, ArchiveFormat, IntegrityIssue};
use std::fs;

fn payloads() -> Vec<(&'static str, &'static [u8])> {
    vec![
        ("components/Object.Alpha.mdl", b"status = Active\n"),
        ("components/Table.Beta.csv", b"a,b\n1,2\n"),
        ("code/Main.java", b"class Main {}\n"),
    ]
}

fn package_entries() -> (Manifest, Vec<ArchiveEntry>) {
    let descriptors = vec![
        EntryDescriptor::for_payload(
            EntryPath::from(payloads()[0].0),
            EntryKind::Configuration,
            "Object",
            "Alpha",
            payloads()[0].1,
        ),
        EntryDescriptor::for_payload(
            EntryPath::from(payloads()[1].0),
            EntryKind::Data,
            "Table",
            "Beta",
            payloads()[1].1,
        ),
        EntryDescriptor::for_payload(
            EntryPath::from(payloads()[2].0),
            EntryKind::Code,
            "java",
            "Main",
            payloads()[2].1,
        ),
    ];
    let manifest = Manifest::from_entries(descriptors).unwrap();
    let mut entries = vec![ArchiveEntry::new(
        MANIFEST_PATH,
        manifest.serialize().unwrap(),
    )];
    entries.extend(
        payloads()
            .into_iter()
            .map(|(path, data)| ArchiveEntry::new(path, data)),
    );
    (manifest, entries)
}

#[test]
fn every_format_roundtrips_and_verifies() {
    let (manifest, entries) = package_entries();
    let dir = tempfile::tempdir().unwrap();

    for (format, name) in [
        (ArchiveFormat::Zip, "pkg.vpk"),
        (ArchiveFormat::Tar, "pkg.tar"),
        (ArchiveFormat::Directory, "pkg.d"),
    ] {
        let dest = dir.path().join(name);
        Archive::write(&dest, format, &entries).unwrap();

        let archive = Archive::open(&dest).unwrap();
        assert_eq!(archive.format(), format);
        let stored = Manifest::parse(archive.get(MANIFEST_PATH).unwrap()).unwrap();
        assert_eq!(stored, manifest);

        let report = verify_archive(&archive, &stored);
        assert!(report.is_ok(), "{format:?}: {:?}", report.failed);
        assert_eq!(report.passed, 3);
    }
}

#[test]
fn tampered_directory_payload_is_detected() {
    let (manifest, entries) = package_entries();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("pkg.d");
    Archive::write(&dest, ArchiveFormat::Directory, &entries).unwrap();

    fs::write(dest.join("code/Main.java"), "class Main { }\n").unwrap();
    fs::remove_file(dest.join("components/Table.Beta.csv")).unwrap();

    let archive = Archive::open(&dest).unwrap();
    let report = verify_archive(&archive, &manifest);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.failed[0].index, Some(1));
    assert_eq!(report.failed[0].issue, IntegrityIssue::MissingPayload);
    assert_eq!(report.failed[1].index, Some(2));
    assert!(matches!(
        report.failed[1].issue,
        IntegrityIssue::SizeMismatch { .. }
    ));
}

#[test]
fn rewriting_same_entries_is_byte_identical() {
    let (_, entries) = package_entries();
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.vpk");
    let b = dir.path().join("b.vpk");
    Archive::write(&a, ArchiveFormat::Zip, &entries).unwrap();
    Archive::write(&b, ArchiveFormat::Zip, &entries).unwrap();
    assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
}
