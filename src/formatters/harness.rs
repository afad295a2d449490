use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{DeprecatedPath, Manifest, ManifestRecord};

/// The document the archive packager consumes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarnessDocument<'m> {
    pub main_path: Option<String>,
    pub manifest: BTreeMap<String, ManifestRecord>,
    pub used_packages: Vec<String>,
    pub all_test_modules: &'m [String],
    pub data_bundles: BTreeMap<&'m str, DataBundleDocument<'m>>,
    pub files: Vec<(PathBuf, PathBuf)>,
    pub deprecations: &'m [DeprecatedPath],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBundleDocument<'m> {
    #[serde(rename = "manifestSHA256")]
    pub manifest_sha256: &'m str,
    pub files: Vec<&'m str>,
}

pub struct HarnessFormatter {
    /// Ship the system package's modules instead of relying on the runtime's copy
    bundle_sdk_modules: bool,
    pretty: bool,
}

impl HarnessFormatter {
    pub fn new() -> Self {
        Self {
            bundle_sdk_modules: false,
            pretty: true,
        }
    }

    pub fn with_bundled_sdk(mut self, bundle: bool) -> Self {
        self.bundle_sdk_modules = bundle;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn document<'m>(&self, manifest: &'m Manifest) -> HarnessDocument<'m> {
        let data_bundles = manifest
            .data_bundles()
            .map(|bundle| {
                (
                    bundle.package.as_str(),
                    DataBundleDocument {
                        manifest_sha256: &bundle.index_hash,
                        files: bundle.files.iter().map(|(rel, _)| rel.as_str()).collect(),
                    },
                )
            })
            .collect();

        HarnessDocument {
            main_path: manifest.top_path(),
            manifest: manifest.harness_manifest(self.bundle_sdk_modules),
            used_packages: manifest.used_packages(),
            all_test_modules: manifest.test_modules(),
            data_bundles,
            files: manifest.used_files(self.bundle_sdk_modules),
            deprecations: manifest.deprecations(),
        }
    }

    pub fn format_manifest(&self, manifest: &Manifest) -> Result<String> {
        let document = self.document(manifest);
        let json = if self.pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(json)
    }

    pub fn format_to_file(&self, manifest: &Manifest, output_path: &Path) -> Result<()> {
        fs::write(output_path, self.format_manifest(manifest)?)?;
        Ok(())
    }
}

impl Default for HarnessFormatter {
    fn default() -> Self {
        Self::new()
    }
}
