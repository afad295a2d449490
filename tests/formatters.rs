mod common;

use addon_manifest::core::{build_manifest, BuildOptions, Manifest};
use addon_manifest::formatters::{HarnessFormatter, JsonCompactFormatter};
use addon_manifest::packages::LegacyMapping;
use common::{registry, Workspace};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::PathBuf;

/// `app/main` requires a local module, a system module and a literal; `app`
/// ships one data file.
fn sample(ws: &Workspace) -> Manifest {
    ws.write(
        "app/lib/main.js",
        "const { Cc } = require('chrome');\n\
         var a = require('./a');\n\
         var timers = require('sdk/timers');\n",
    );
    ws.write("app/lib/a.js", "var main = require('./main');\n");
    ws.write("app/data/panel.html", "<p>hi</p>");
    ws.write("addon-sdk/lib/sdk/timers.js", "exports.setTimeout = 1;\n");

    let registry = registry([ws.package("app"), ws.package("addon-sdk")]);
    build_manifest("app", &registry, &LegacyMapping::new(), &BuildOptions::new()).unwrap()
}

#[test]
fn harness_document_skips_system_modules_by_default() {
    let ws = Workspace::new();
    let manifest = sample(&ws);

    let json = HarnessFormatter::new().format_manifest(&manifest).unwrap();
    let document: Value = serde_json::from_str(&json).unwrap();

    assert_eq!(document["mainPath"], "app/main");
    assert_eq!(document["usedPackages"], json!(["addon-sdk", "app"]));
    assert_eq!(document["allTestModules"], json!([]));
    assert_eq!(document["deprecations"], json!([]));

    let records = document["manifest"].as_object().unwrap();
    let keys: Vec<&str> = records.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["app/a", "app/main"]);

    let main = &records["app/main"];
    assert_eq!(main["packageName"], "app");
    assert_eq!(main["sectionName"], "lib");
    assert_eq!(main["moduleName"], "main");
    assert_eq!(main["docsSHA256"], Value::Null);
    assert_eq!(main["jsSHA256"].as_str().unwrap().len(), 64);
    assert_eq!(
        main["requirements"],
        json!({ "./a": "app/a", "chrome": "chrome", "sdk/timers": "sdk/timers" })
    );

    let bundle = &document["dataBundles"]["app"];
    assert_eq!(bundle["files"], json!(["panel.html"]));
    assert_eq!(
        bundle["manifestSHA256"],
        manifest.data_bundle("app").unwrap().index_hash.as_str()
    );

    let files = document["files"].as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(
        files[0][1].as_str().map(PathBuf::from),
        Some(PathBuf::from("resources/app/data/panel.html"))
    );
}

#[test]
fn bundled_sdk_includes_system_modules_and_files() {
    let ws = Workspace::new();
    let manifest = sample(&ws);

    let document = HarnessFormatter::new()
        .with_bundled_sdk(true)
        .document(&manifest);

    let keys: Vec<&str> = document.manifest.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["app/a", "app/main", "sdk/timers"]);

    let destinations: Vec<PathBuf> = document.files.iter().map(|(_, dest)| dest.clone()).collect();
    assert_eq!(
        destinations,
        vec![
            PathBuf::from("resources/app/data/panel.html"),
            PathBuf::from("resources/addon-sdk/lib/sdk/timers.js"),
            PathBuf::from("resources/app/lib/a.js"),
            PathBuf::from("resources/app/lib/main.js"),
        ]
    );
    assert_eq!(document.files[1].0, ws.path("addon-sdk/lib/sdk/timers.js"));
}

#[test]
fn compact_output_counts_modules_edges_and_cycles() {
    let ws = Workspace::new();
    let manifest = sample(&ws);

    let json = JsonCompactFormatter::new().format_manifest(&manifest).unwrap();
    let output: Value = serde_json::from_str(&json).unwrap();

    assert_eq!(
        output["meta"],
        json!({ "modules": 3, "edges": 3, "cycles": 1, "format": "compact" })
    );
    assert_eq!(output["packages"], json!(["app", "addon-sdk"]));
    assert_eq!(output["nodes"][0], json!({ "p": "app/main", "k": 0, "s": 0 }));
    assert_eq!(output["literals"], json!([[0, "chrome", "chrome"]]));

    let edges = output["edges"].as_array().unwrap();
    assert!(edges.contains(&json!([0, 1])));
    assert!(edges.contains(&json!([1, 0])));
}

#[test]
fn verbose_output_names_edges() {
    let ws = Workspace::new();
    let manifest = sample(&ws);

    let json = JsonCompactFormatter::verbose().format_manifest(&manifest).unwrap();
    let output: Value = serde_json::from_str(&json).unwrap();

    assert_eq!(output["meta"]["format"], "full");
    assert_eq!(output["nodes"][0]["module"], "main");
    assert_eq!(output["nodes"][0]["docs"], Value::Null);
    let edges = output["edges"].as_array().unwrap();
    assert!(edges.contains(&json!({ "src": 1, "tgt": 0, "name": "./main" })));
}

#[test]
fn formatters_write_to_disk() {
    let ws = Workspace::new();
    let manifest = sample(&ws);

    let harness = ws.path("out/manifest.json");
    let compact = ws.path("out/graph.json");
    std::fs::create_dir_all(ws.path("out")).unwrap();

    HarnessFormatter::new()
        .with_pretty(false)
        .format_to_file(&manifest, &harness)
        .unwrap();
    JsonCompactFormatter::new()
        .format_to_file(&manifest, &compact)
        .unwrap();

    let written = std::fs::read_to_string(&harness).unwrap();
    assert!(!written.contains('\n'));
    assert!(serde_json::from_str::<Value>(&written).is_ok());
    assert!(std::fs::read_to_string(&compact).unwrap().starts_with('{'));
}
