mod common;

use addon_manifest::core::ManifestError;
use addon_manifest::packages::PackageLoader;
use common::Workspace;

#[test]
fn descriptor_accepts_strings_or_lists() {
    let ws = Workspace::new();
    ws.write(
        "app/package.json",
        r#"{
            "name": "app",
            "lib": "src",
            "tests": ["tests", "more-tests"],
            "main": "./src/main.js",
            "dependencies": "util",
            "ignore-deprecated-path": false
        }"#,
    );

    let app = PackageLoader::load_descriptor(&ws.path("app")).unwrap();
    assert_eq!(app.name, "app");
    assert_eq!(app.root_dir, ws.path("app"));
    assert_eq!(app.lib, vec!["src"]);
    assert_eq!(app.tests, vec!["tests", "more-tests"]);
    assert_eq!(app.main.as_deref(), Some("./src/main.js"));
    assert_eq!(app.dependencies, Some(vec!["util".to_string()]));
    assert!(app.ignore_deprecated_path);
}

#[test]
fn descriptor_defaults() {
    let ws = Workspace::new();
    ws.write("util/package.json", r#"{ "name": "util" }"#);

    let util = PackageLoader::load_descriptor(&ws.path("util")).unwrap();
    assert_eq!(util.lib, vec!["lib"]);
    assert_eq!(util.tests, vec!["tests"]);
    assert_eq!(util.main, None);
    assert_eq!(util.dependencies, None);
    assert_eq!(util.declared_dependencies(), None);
    assert!(!util.ignore_deprecated_path);
}

#[test]
fn registry_holds_dependency_closure_and_extras() {
    let ws = Workspace::new();
    ws.write("app/package.json", r#"{ "name": "app", "dependencies": ["util"] }"#);
    ws.write("packages/util/package.json", r#"{ "name": "util", "dependencies": ["base"] }"#);
    ws.write("packages/base/package.json", r#"{ "name": "base" }"#);
    ws.write("packages/unused/package.json", r#"{ "name": "unused" }"#);
    ws.write("packages/extra/package.json", r#"{ "name": "extra" }"#);

    let target = PackageLoader::load_descriptor(&ws.path("app")).unwrap();
    let registry = PackageLoader::new([ws.path("packages")])
        .registry_for(target, &["extra".to_string()])
        .unwrap();

    let names: Vec<&str> = registry.names().collect();
    assert_eq!(names, vec!["app", "base", "extra", "util"]);
    assert_eq!(registry.get("util").unwrap().root_dir, ws.path("packages/util"));
}

#[test]
fn unknown_dependency_is_an_error() {
    let ws = Workspace::new();
    ws.write("app/package.json", r#"{ "name": "app", "dependencies": ["ghost"] }"#);
    ws.write("packages/util/package.json", r#"{ "name": "util" }"#);

    let target = PackageLoader::load_descriptor(&ws.path("app")).unwrap();
    let err = PackageLoader::new([ws.path("packages")])
        .registry_for(target, &[])
        .unwrap_err();
    assert!(matches!(err, ManifestError::UnknownPackage(ref name) if name == "ghost"));
}

#[test]
fn duplicate_package_names_are_rejected() {
    let ws = Workspace::new();
    ws.write("one/util/package.json", r#"{ "name": "util" }"#);
    ws.write("two/util/package.json", r#"{ "name": "util" }"#);

    let err = PackageLoader::new([ws.path("one"), ws.path("two")])
        .discover()
        .unwrap_err();
    assert!(matches!(err, ManifestError::DuplicatePackage { ref name, .. } if name == "util"));
}

#[test]
fn malformed_descriptor_is_reported_with_its_path() {
    let ws = Workspace::new();
    ws.write("app/package.json", r#"{ "lib": "src" }"#);

    let err = PackageLoader::load_descriptor(&ws.path("app")).unwrap_err();
    match err {
        ManifestError::InvalidDescriptor { path, .. } => {
            assert_eq!(path, ws.path("app/package.json"))
        }
        other => panic!("expected InvalidDescriptor, got {other:?}"),
    }
}
