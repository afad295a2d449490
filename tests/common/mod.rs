#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use addon_manifest::core::SYSTEM_PACKAGE;
use addon_manifest::packages::{PackageDescriptor, PackageRegistry};

/// A temporary directory holding package trees.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Descriptor for `<root>/<name>` with default `lib`/`tests` dirs.
    pub fn package(&self, name: &str) -> PackageDescriptor {
        let root = self.path(name);
        fs::create_dir_all(&root).unwrap();
        PackageDescriptor::new(name, root)
    }

    /// System package with the test runner and dispatcher modules.
    pub fn sdk(&self) -> PackageDescriptor {
        self.write(
            &format!("{SYSTEM_PACKAGE}/lib/sdk/test/runner.js"),
            "exports.run = function () {};\n",
        );
        self.write(
            &format!("{SYSTEM_PACKAGE}/lib/sdk/deprecated/unit-test-finder.js"),
            "exports.find = function () {};\n",
        );
        self.package(SYSTEM_PACKAGE)
    }
}

pub fn registry<I>(packages: I) -> PackageRegistry
where
    I: IntoIterator<Item = PackageDescriptor>,
{
    let mut registry = PackageRegistry::new();
    for package in packages {
        registry.insert(package).unwrap();
    }
    registry
}
