use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::core::error::{ManifestError, Result};
use crate::core::hashing::{hash_bytes, hash_file};
use crate::packages::PackageDescriptor;

const IGNORED_FILE_SUFFIXES: &[&str] = &["~", ".swp"];

/// Data files shipped with one package, plus a content-addressed index of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBundle {
    pub package: String,
    /// `(path relative to the data dir, absolute source path)`, sorted.
    pub files: Vec<(String, PathBuf)>,
    /// JSON object mapping relative path to SHA-256.
    pub index_json: String,
    pub index_hash: String,
}

impl DataBundle {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn archive_path(&self, relative: &str) -> PathBuf {
        PathBuf::from("resources")
            .join(&self.package)
            .join("data")
            .join(relative)
    }

    /// `(source, archive destination)` pairs.
    pub fn archive_files(&self) -> Vec<(PathBuf, PathBuf)> {
        self.files
            .iter()
            .map(|(relative, source)| (source.clone(), self.archive_path(relative)))
            .collect()
    }
}

pub struct DataCollector;

impl DataCollector {
    pub fn new() -> Self {
        Self
    }

    /// Walks `<root>/data`. A missing directory yields an empty bundle.
    pub fn collect(&self, package: &PackageDescriptor) -> Result<DataBundle> {
        let data_dir = package.data_dir();
        let relative_files = self.data_files(&data_dir)?;

        let hashed: Vec<(String, PathBuf, String)> = relative_files
            .into_par_iter()
            .map(|(relative, absolute)| {
                let hash = hash_file(&absolute)?;
                Ok((relative, absolute, hash))
            })
            .collect::<Result<_>>()?;

        let index: BTreeMap<&str, &str> = hashed
            .iter()
            .map(|(relative, _, hash)| (relative.as_str(), hash.as_str()))
            .collect();
        let index_json = serde_json::to_string(&index).map_err(|source| {
            ManifestError::DataIndex {
                package: package.name.clone(),
                source,
            }
        })?;
        let index_hash = hash_bytes(index_json.as_bytes());

        let files = hashed
            .into_iter()
            .map(|(relative, absolute, _)| (relative, absolute))
            .collect();

        Ok(DataBundle {
            package: package.name.clone(),
            files,
            index_json,
            index_hash,
        })
    }

    fn data_files(&self, data_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
        if !data_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(data_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| data_dir.to_path_buf());
                ManifestError::io(path, err.into())
            })?;
            if !entry.file_type().is_file() || is_ignored_file(&entry) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(data_dir) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((relative, entry.path().to_path_buf()));
        }

        files.sort();
        Ok(files)
    }
}

impl Default for DataCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_ignored_file(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| IGNORED_FILE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
        .unwrap_or(false)
}
