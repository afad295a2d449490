use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use super::{PackageDescriptor, PackageRegistry};
use crate::core::error::{ManifestError, Result};

pub const DESCRIPTOR_FILENAME: &str = "package.json";

/// Reads package descriptors from disk and assembles the registry for a build.
pub struct PackageLoader {
    search_dirs: Vec<PathBuf>,
}

impl PackageLoader {
    pub fn new<I, P>(search_dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            search_dirs: search_dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Loads `<package_dir>/package.json`.
    pub fn load_descriptor(package_dir: &Path) -> Result<PackageDescriptor> {
        let path = package_dir.join(DESCRIPTOR_FILENAME);
        let json = fs::read_to_string(&path).map_err(|err| ManifestError::io(&path, err))?;
        let mut descriptor: PackageDescriptor = serde_json::from_str(&json)
            .map_err(|source| ManifestError::InvalidDescriptor {
                path: path.clone(),
                source,
            })?;
        descriptor.root_dir = package_dir.to_path_buf();
        Ok(descriptor)
    }

    /// Every package found directly under the search directories.
    pub fn discover(&self) -> Result<BTreeMap<String, PackageDescriptor>> {
        let mut found: BTreeMap<String, PackageDescriptor> = BTreeMap::new();

        for dir in &self.search_dirs {
            let listing = fs::read_dir(dir).map_err(|err| ManifestError::io(dir, err))?;
            let mut candidates: Vec<PathBuf> = listing
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.join(DESCRIPTOR_FILENAME).is_file())
                .collect();
            candidates.sort();

            for candidate in candidates {
                let descriptor = Self::load_descriptor(&candidate)?;
                if let Some(existing) = found.get(&descriptor.name) {
                    return Err(ManifestError::DuplicatePackage {
                        name: descriptor.name.clone(),
                        first: existing.root_dir.clone(),
                        second: descriptor.root_dir,
                    });
                }
                tracing::debug!(
                    package = %descriptor.name,
                    root = %descriptor.root_dir.display(),
                    "discovered package"
                );
                found.insert(descriptor.name.clone(), descriptor);
            }
        }

        Ok(found)
    }

    /// Registry holding `target`, the closure of its declared dependencies,
    /// and every package named in `extra_packages` with its own closure.
    pub fn registry_for(
        &self,
        target: PackageDescriptor,
        extra_packages: &[String],
    ) -> Result<PackageRegistry> {
        let mut available = self.discover()?;
        available.remove(&target.name);

        let mut registry = PackageRegistry::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.extend(target.dependencies.iter().flatten().cloned());
        queue.extend(extra_packages.iter().cloned());
        registry.insert(target)?;

        while let Some(name) = queue.pop_front() {
            if registry.contains(&name) {
                continue;
            }
            let package = available
                .remove(&name)
                .ok_or_else(|| ManifestError::UnknownPackage(name.clone()))?;
            queue.extend(package.dependencies.iter().flatten().cloned());
            registry.insert(package)?;
        }

        Ok(registry)
    }
}
