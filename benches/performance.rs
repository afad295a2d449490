use addon_manifest::core::{build_manifest, BuildOptions, ReferenceScanner};
use addon_manifest::packages::{LegacyMapping, PackageDescriptor, PackageRegistry};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::Path;
use tempfile::TempDir;

/// `modules` lib modules in a chain, each also pulling in a shared helper
/// package and a handful of data files.
fn write_packages(root: &Path, modules: usize) -> PackageRegistry {
    let app = root.join("app");
    let util = root.join("util");
    std::fs::create_dir_all(app.join("lib/widgets")).unwrap();
    std::fs::create_dir_all(app.join("data/icons")).unwrap();
    std::fs::create_dir_all(util.join("lib")).unwrap();

    std::fs::write(
        app.join("lib/main.js"),
        "const { Cc, Ci } = require('chrome');\nvar first = require('./widgets/widget-0');\n",
    )
    .unwrap();

    for i in 0..modules {
        let next = if i + 1 < modules {
            format!("var next = require('./widget-{}');\n", i + 1)
        } else {
            "var back = require('../main');\n".to_string()
        };
        let content = format!(
            r#"// Widget {i}
var util = require("util/strings");
var options = require("@loader/options");
{next}
exports.render = function () {{
  return util.pad("widget-{i}", {i});
}};
"#
        );
        std::fs::write(app.join(format!("lib/widgets/widget-{i}.js")), content).unwrap();
    }

    std::fs::write(
        util.join("lib/strings.js"),
        "exports.pad = function (s, n) { return s + n; };\n",
    )
    .unwrap();

    for i in 0..20 {
        std::fs::write(app.join(format!("data/icons/icon-{i}.png")), vec![i as u8; 4096]).unwrap();
    }

    let mut registry = PackageRegistry::new();
    registry
        .insert(PackageDescriptor::new("app", &app).with_dependencies(["util"]))
        .unwrap();
    registry.insert(PackageDescriptor::new("util", &util)).unwrap();
    registry
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("manifest_build");
    let mapping = LegacyMapping::new();
    let options = BuildOptions::new();

    let small_dir = TempDir::new().unwrap();
    let small = write_packages(small_dir.path(), 10);
    group.bench_function("small_package", |b| {
        b.iter(|| {
            let manifest = build_manifest(black_box("app"), &small, &mapping, &options);
            black_box(manifest)
        });
    });

    let large_dir = TempDir::new().unwrap();
    let large = write_packages(large_dir.path(), 200);
    group.bench_function("large_package", |b| {
        b.iter(|| {
            let manifest = build_manifest(black_box("app"), &large, &mapping, &options);
            black_box(manifest)
        });
    });

    group.finish();
}

fn benchmark_scanner(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference_scanner");

    let mut source = String::new();
    for i in 0..500 {
        source.push_str(&format!("var m{i} = require('pkg/module-{i}'); // {i}\n"));
        source.push_str("/* require('ignored') */\n");
    }
    source.push_str("define(['a', 'b', 'c'], function (a, b, c) {});\n");

    let scanner = ReferenceScanner::new();
    group.bench_function("scan_large_source", |b| {
        b.iter(|| black_box(scanner.scan(black_box(&source))));
    });

    group.finish();
}

criterion_group!(benches, benchmark_build, benchmark_scanner);
criterion_main!(benches);
