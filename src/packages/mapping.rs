use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{ManifestError, Result};

/// Environment variable naming the SDK root that holds `mapping.json`.
pub const SDK_ROOT_ENV: &str = "ADDON_SDK_ROOT";
pub const MAPPING_FILENAME: &str = "mapping.json";

/// Prefixes from the old package layout that are stripped before lookup.
pub const DEPRECATED_PREFIXES: &[&str] = &["addon-kit/", "api-utils/"];

/// Static table from legacy bare module names to their canonical paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyMapping {
    entries: BTreeMap<String, String>,
}

impl LegacyMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(path: &Path, json: &str) -> Result<Self> {
        let entries: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(|source| ManifestError::InvalidMapping {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|err| ManifestError::io(path, err))?;
        Self::from_json_str(path, &json)
    }

    /// Loads `$ADDON_SDK_ROOT/mapping.json` through [`LegacyMapping::under_root`],
    /// or an empty table when the variable is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(SDK_ROOT_ENV) {
            Some(root) => Self::under_root(Path::new(&root)),
            None => {
                tracing::debug!("{SDK_ROOT_ENV} not set, legacy mapping is empty");
                Ok(Self::new())
            }
        }
    }

    /// Loads `mapping.json` from an SDK root. A root without one has no
    /// legacy names.
    pub fn under_root(sdk_root: &Path) -> Result<Self> {
        let path = Self::path_under(sdk_root);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no legacy mapping under SDK root");
            return Ok(Self::new());
        }
        Self::load(&path)
    }

    pub fn path_under(sdk_root: &Path) -> PathBuf {
        sdk_root.join(MAPPING_FILENAME)
    }

    pub fn insert(&mut self, legacy: impl Into<String>, canonical: impl Into<String>) {
        self.entries.insert(legacy.into(), canonical.into());
    }

    /// Canonical path for a legacy reference, after normalization.
    pub fn lookup(&self, reference: &str) -> Option<&str> {
        self.entries
            .get(Self::normalize(reference))
            .map(String::as_str)
    }

    /// Strips a trailing `.js` and then one deprecated package prefix.
    pub fn normalize(reference: &str) -> &str {
        let mut name = reference.strip_suffix(".js").unwrap_or(reference);
        for prefix in DEPRECATED_PREFIXES {
            if let Some(rest) = name.strip_prefix(prefix) {
                name = rest;
            }
        }
        name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
