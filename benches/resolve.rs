//! Benchmarks for URL resolution and manifest parsing.
//!
//! Both run on every module request, before any git call.

use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use edea_repo::manifest;
use edea_repo::path;

const URLS: [(&str, &str); 4] = [
    ("https", "https://github.com/edea-dev/power-modules"),
    ("scp", "git@gitlab.com:edea-dev/power-modules.git"),
    ("nested", "https://gitlab.com/edea-dev/hw/power/regulators.git"),
    (
        "gitlab_tree",
        "https://gitlab.com/edea-dev/power-modules/-/tree/main/buck",
    ),
];

const SMALL_MANIFEST: &str = r#"
name: power
modules:
  buck:
    dir: regulators/buck
    readme: BUCK.md
    doc: doc
"#;

fn generate_manifest(modules: usize) -> String {
    let mut manifest = String::from("name: bench\nmodules:\n");
    for i in 0..modules {
        manifest.push_str(&format!(
            "  module{i}:\n    dir: hw/module{i}\n    readme: README-{i}.md\n    doc: doc\n"
        ));
    }
    manifest
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_url");
    let root = Path::new("/var/cache/edea/git");

    for (name, url) in URLS {
        group.bench_with_input(BenchmarkId::new("url", name), url, |b, url| {
            b.iter(|| path::resolve(black_box(root), black_box(url)))
        });
    }

    group.bench_function("sanitize_traversal", |b| {
        b.iter(|| path::join_sanitized(black_box(root), black_box("../../a/./b/../../c")))
    });

    group.finish();
}

fn bench_manifest(c: &mut Criterion) {
    let mut group = c.benchmark_group("manifest");

    group.bench_function("small", |b| {
        b.iter(|| manifest::resolve(black_box(Some(SMALL_MANIFEST)), black_box("buck")))
    });

    group.bench_function("missing", |b| {
        b.iter(|| manifest::resolve(black_box(None), black_box("")))
    });

    for modules in [10, 100, 1000] {
        let raw = generate_manifest(modules);
        let last = format!("module{}", modules - 1);
        group.bench_with_input(BenchmarkId::new("modules", modules), &raw, |b, raw| {
            b.iter(|| manifest::resolve(black_box(Some(raw.as_str())), black_box(&last)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_manifest);
criterion_main!(benches);
