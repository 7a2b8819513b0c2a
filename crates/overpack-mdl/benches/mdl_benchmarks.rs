use criterion::{criterion_group, criterion_main, Criterion};
use std::fmt::Write;

fn sample_object(fields: usize) -> String {
    let mut src = String::from("// generated\nObject product__v {\n  label = \"Product\"\n  fields {\n");
    for i in 0..fields {
        let _ = write!(
            src,
            "    field field_{i}__c {{\n      label = \"Field {i}\"\n      max_length = {i}\n      values = [a, b, \"c\"]\n    }}\n"
        );
    }
    src.push_str("  }\n}\n");
    src
}

fn bench_parse(c: &mut Criterion) {
    let src = sample_object(200);
    c.bench_function("mdl_parse_200fields", |b| {
        b.iter(|| overpack_mdl::parse(&src).unwrap());
    });
}

fn bench_serialize(c: &mut Criterion) {
    let doc = overpack_mdl::parse(&sample_object(200)).unwrap();
    c.bench_function("mdl_serialize_200fields", |b| {
        b.iter(|| overpack_mdl::to_mdl_string(&doc));
    });
}

criterion_group!(benches, bench_parse, bench_serialize);
criterion_main!(benches);
