mod common;

use addon_manifest::core::data::DataCollector;
use addon_manifest::core::hashing::hash_bytes;
use common::Workspace;
use serde_json::Value;
use std::path::PathBuf;

#[test]
fn collector_lists_files_and_builds_hashed_index() {
    let ws = Workspace::new();
    ws.write("app/data/panel.html", "abc");
    ws.write("app/data/icons/small.png", "");
    ws.write("app/data/.hidden", "secret");
    ws.write("app/data/notes.txt~", "backup");
    ws.write("app/data/edit.swp", "swap");
    ws.write("app/data/.git/config", "[core]");
    let package = ws.package("app");

    let bundle = DataCollector::new().collect(&package).unwrap();

    let relative: Vec<&str> = bundle.files.iter().map(|(rel, _)| rel.as_str()).collect();
    assert_eq!(relative, vec!["icons/small.png", "panel.html"]);
    assert_eq!(bundle.files[1].1, ws.path("app/data/panel.html"));

    let index: Value = serde_json::from_str(&bundle.index_json).unwrap();
    assert_eq!(
        index["panel.html"],
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(
        index["icons/small.png"],
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(bundle.index_hash, hash_bytes(bundle.index_json.as_bytes()));

    let archive: Vec<PathBuf> = bundle.archive_files().into_iter().map(|(_, dest)| dest).collect();
    assert_eq!(
        archive,
        vec![
            PathBuf::from("resources/app/data/icons/small.png"),
            PathBuf::from("resources/app/data/panel.html"),
        ]
    );
}

#[test]
fn collector_without_data_dir_is_empty() {
    let ws = Workspace::new();
    let package = ws.package("bare");

    let bundle = DataCollector::new().collect(&package).unwrap();
    assert!(bundle.is_empty());
    assert_eq!(bundle.index_json, "{}");
}

#[test]
fn index_is_stable_across_runs() {
    let ws = Workspace::new();
    for i in 0..20 {
        ws.write(&format!("app/data/file-{i:02}.txt"), &format!("content {i}"));
    }
    let package = ws.package("app");
    let collector = DataCollector::new();

    let first = collector.collect(&package).unwrap();
    let second = collector.collect(&package).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.files.len(), 20);
}
