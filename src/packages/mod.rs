pub mod loader;
pub mod mapping;

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::error::{ManifestError, Result};
use crate::core::graph::Section;

pub use loader::PackageLoader;
pub use mapping::LegacyMapping;

/// A named bundle of modules, docs and data files, as described by its
/// `package.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    #[serde(skip)]
    pub root_dir: PathBuf,
    /// Library source directories, relative to `root_dir`, in search order.
    #[serde(default = "default_lib", deserialize_with = "one_or_many")]
    pub lib: Vec<String>,
    #[serde(default = "default_tests", deserialize_with = "one_or_many")]
    pub tests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub dependencies: Option<Vec<String>>,
    #[serde(
        rename = "ignore-deprecated-path",
        default,
        deserialize_with = "present",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub ignore_deprecated_path: bool,
}

fn default_lib() -> Vec<String> {
    vec!["lib".to_string()]
}

fn default_tests() -> Vec<String> {
    vec!["tests".to_string()]
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(single) => vec![single],
            OneOrMany::Many(many) => many,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    OneOrMany::deserialize(deserializer).map(Into::into)
}

fn optional_one_or_many<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<OneOrMany>::deserialize(deserializer).map(|value| value.map(Into::into))
}

// The key's presence opts in, whatever its value.
fn present<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(|_| true)
}

impl PackageDescriptor {
    pub fn new(name: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root_dir: root_dir.into(),
            lib: default_lib(),
            tests: default_tests(),
            main: None,
            dependencies: None,
            ignore_deprecated_path: false,
        }
    }

    pub fn with_lib<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lib = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tests<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tests = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_main(mut self, main: impl Into<String>) -> Self {
        self.main = Some(main.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = Some(deps.into_iter().map(Into::into).collect());
        self
    }

    pub fn ignoring_deprecated_paths(mut self) -> Self {
        self.ignore_deprecated_path = true;
        self
    }

    /// Directories searched for modules of `section`.
    pub fn section_dirs(&self, section: Section) -> &[String] {
        match section {
            Section::Lib => &self.lib,
            Section::Tests => &self.tests,
        }
    }

    /// First library directory; main-entry URIs are computed relative to it.
    pub fn primary_lib_dir(&self) -> &str {
        self.lib.first().map(String::as_str).unwrap_or("lib")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root_dir.join("data")
    }

    /// Declared dependencies, treating an empty list the same as none.
    pub fn declared_dependencies(&self) -> Option<&[String]> {
        self.dependencies
            .as_deref()
            .filter(|deps| !deps.is_empty())
    }
}

/// Every package known to one build, keyed by unique name.
#[derive(Debug, Clone, Default)]
pub struct PackageRegistry {
    packages: BTreeMap<String, PackageDescriptor>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, package: PackageDescriptor) -> Result<()> {
        if let Some(existing) = self.packages.get(&package.name) {
            return Err(ManifestError::DuplicatePackage {
                name: package.name.clone(),
                first: existing.root_dir.clone(),
                second: package.root_dir,
            });
        }
        self.packages.insert(package.name.clone(), package);
        Ok(())
    }

    pub fn with(mut self, package: PackageDescriptor) -> Result<Self> {
        self.insert(package)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&PackageDescriptor> {
        self.packages.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&PackageDescriptor> {
        self.get(name)
            .ok_or_else(|| ManifestError::UnknownPackage(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Package names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageDescriptor> {
        self.packages.values()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
