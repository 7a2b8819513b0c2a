use criterion::{criterion_group, criterion_main, Criterion};
use overpack_core::{ConfigurationComponent, LoadOptions, Package};
use std::fmt::Write;
use std::path::{Path, PathBuf};

fn create_test_package(dir: &Path, components: usize) -> PathBuf {
    let mut pkg = Package::new();
    for i in 0..components {
        let mut src = format!("object obj_{i}__v {{\n  label = \"Object {i}\"\n  fields {{\n");
        for f in 0..20 {
            let _ = write!(
                src,
                "    field f_{f}__c {{\n      label = \"F{f}\"\n      size = {f}\n    }}\n"
            );
        }
        src.push_str("  }\n}\n");
        let document = overpack_mdl::parse(&src).unwrap();
        pkg.add_component(ConfigurationComponent::new(
            "Object",
            &format!("obj_{i}__v"),
            document,
        ))
        .unwrap();
    }
    let path = dir.join("bench.vpk");
    pkg.save(&path).unwrap();
    path
}

fn bench_load(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = create_test_package(dir.path(), 200);

    c.bench_function("package_load_200_parallel", |b| {
        b.iter(|| Package::load_with(&path, &LoadOptions::default()).unwrap());
    });
    c.bench_function("package_load_200_sequential", |b| {
        b.iter(|| Package::load_with(&path, &LoadOptions::default().sequential()).unwrap());
    });
}

fn bench_save(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let pkg = Package::load(&create_test_package(dir.path(), 200)).unwrap();
    let out = dir.path().join("out.vpk");

    c.bench_function("package_save_200", |b| {
        b.iter(|| pkg.save(&out).unwrap());
    });
}

fn bench_diff(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let pkg = Package::load(&create_test_package(dir.path(), 200)).unwrap();

    c.bench_function("package_diff_identical_200", |b| {
        b.iter(|| overpack_core::diff(&pkg, &pkg));
    });
}

criterion_group!(benches, bench_load, bench_save, bench_diff);
criterion_main!(benches);
