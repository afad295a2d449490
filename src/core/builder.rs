use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use super::data::{DataBundle, DataCollector};
use super::error::{ManifestError, ModuleNotFound, Result};
use super::graph::{EntryId, Manifest, ManifestEntry, ModuleReference, Requirement, Section};
use super::hashing::{hash_bytes, hash_file};
use super::privilege::PrivilegeScanner;
use super::resolver::{
    main_candidates, uri_name_from_path, DeprecatedPath, ModuleInfo, ModuleResolver, Resolved,
};
use super::scanner::ReferenceScanner;
use crate::packages::{LegacyMapping, PackageDescriptor, PackageRegistry};

pub const TEST_FILE_PREFIX: &str = "test-";
pub const TEST_FILE_SUFFIX: &str = ".js";

/// A module forced into the manifest whether or not anything requires it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraModule {
    pub package: String,
    pub section: Section,
    pub module: String,
    pub js: PathBuf,
}

impl ExtraModule {
    pub fn new(
        package: impl Into<String>,
        section: Section,
        module: impl Into<String>,
        js: impl Into<PathBuf>,
    ) -> Self {
        Self {
            package: package.into(),
            section,
            module: module.into(),
            js: js.into(),
        }
    }

    /// Same as [`ExtraModule::new`] with the section given by name.
    pub fn parse(
        package: impl Into<String>,
        section: &str,
        module: impl Into<String>,
        js: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self::new(package, section.parse()?, module, js))
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub scan_tests: bool,
    pub test_filter: Option<Regex>,
    pub extra_modules: Vec<ExtraModule>,
    /// Always processed when scanning tests.
    pub test_runner: ModuleReference,
    /// Receives one extra requirement per discovered test so the runtime can
    /// enumerate tests without searching the filesystem.
    pub test_dispatcher: ModuleReference,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            scan_tests: false,
            test_filter: None,
            extra_modules: Vec::new(),
            test_runner: ModuleReference::new(
                super::graph::SYSTEM_PACKAGE,
                Section::Lib,
                "sdk/test/runner",
            ),
            test_dispatcher: ModuleReference::new(
                super::graph::SYSTEM_PACKAGE,
                Section::Lib,
                "sdk/deprecated/unit-test-finder",
            ),
        }
    }
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tests(mut self, filter: Option<&str>) -> Result<Self> {
        self.scan_tests = true;
        self.test_filter = filter.map(Regex::new).transpose()?;
        Ok(self)
    }

    pub fn with_extra_module(mut self, module: ExtraModule) -> Self {
        self.extra_modules.push(module);
        self
    }
}

/// Depth-first manifest construction from the target's roots.
///
/// An entry is reserved in the manifest before its own references are
/// resolved, so a cycle that leads back to it finds the reservation and stops.
pub struct ManifestBuilder<'a> {
    target: &'a PackageDescriptor,
    resolver: ModuleResolver<'a>,
    references: ReferenceScanner,
    privileges: PrivilegeScanner,
    data: DataCollector,
    entries: Vec<ManifestEntry>,
    index: BTreeMap<ModuleReference, EntryId>,
    test_modules: Vec<String>,
    deprecations: Vec<DeprecatedPath>,
}

impl<'a> ManifestBuilder<'a> {
    pub fn new(
        target: &str,
        registry: &'a PackageRegistry,
        mapping: &'a LegacyMapping,
    ) -> Result<Self> {
        Ok(Self {
            target: registry.require(target)?,
            resolver: ModuleResolver::new(registry, mapping),
            references: ReferenceScanner::new(),
            privileges: PrivilegeScanner::new(),
            data: DataCollector::new(),
            entries: Vec::new(),
            index: BTreeMap::new(),
            test_modules: Vec::new(),
            deprecations: Vec::new(),
        })
    }

    pub fn build(mut self, options: &BuildOptions) -> Result<Manifest> {
        let mut top = None;
        if let Some(info) = self.find_top()? {
            tracing::info!(module = %info.reference, "building manifest from entry module");
            top = Some(self.handle_module(info)?);
        }

        if options.scan_tests {
            self.discover_tests(options)?;
        }

        let registry = self.resolver.registry();
        for extra in &options.extra_modules {
            registry.require(&extra.package)?;
            let reference = ModuleReference::new(&extra.package, extra.section, &extra.module);
            self.handle_module(ModuleInfo::new(reference, &extra.js))?;
        }

        let data_bundles = self.collect_data()?;
        tracing::info!(
            modules = self.entries.len(),
            data_bundles = data_bundles.len(),
            "manifest complete"
        );

        Ok(Manifest {
            entries: self.entries,
            index: self.index,
            data_bundles,
            test_modules: self.test_modules,
            top,
            deprecations: self.deprecations,
        })
    }

    fn find_top(&self) -> Result<Option<ModuleInfo>> {
        let target = self.target;
        let lib_dir = target.root_dir.join(target.primary_lib_dir());

        let js = match target.main.as_deref() {
            Some(main) => {
                let candidates = main_candidates(target, main);
                match candidates.iter().find(|candidate| candidate.is_file()) {
                    Some(js) => js.clone(),
                    None => {
                        return Err(ManifestError::MissingMain {
                            package: target.name.clone(),
                            main: main.to_string(),
                            candidates,
                        })
                    }
                }
            }
            None => {
                let default = lib_dir.join("main.js");
                if !default.is_file() {
                    tracing::debug!(package = %target.name, "no main module, skipping entry point");
                    return Ok(None);
                }
                default
            }
        };

        let name = uri_name_from_path(target, &js)?;
        let readme = target.root_dir.join("README.md");
        let docs = readme.is_file().then_some(readme);
        Ok(Some(
            ModuleInfo::new(ModuleReference::new(&target.name, Section::Lib, name), js)
                .with_docs(docs),
        ))
    }

    /// Returns the entry for `info`, reserving and processing it on first sight.
    fn handle_module(&mut self, info: ModuleInfo) -> Result<EntryId> {
        if let Some(&id) = self.index.get(&info.reference) {
            return Ok(id);
        }

        let id = EntryId(self.entries.len());
        self.entries
            .push(ManifestEntry::reserve(info.reference.clone(), info.js.clone()));
        self.index.insert(info.reference.clone(), id);

        tracing::debug!(module = %info.reference, "entering module");
        self.process_module(id, &info)?;
        tracing::debug!(module = %info.reference, "leaving module");
        Ok(id)
    }

    fn process_module(&mut self, id: EntryId, info: &ModuleInfo) -> Result<()> {
        let bytes = fs::read(&info.js).map_err(|err| ManifestError::io(&info.js, err))?;
        {
            let entry = &mut self.entries[id.0];
            entry.js_hash = hash_bytes(&bytes);
            if let Some(docs) = &info.docs {
                entry.docs_hash = Some(hash_file(docs)?);
                entry.docs_path = Some(docs.clone());
            }
        }

        let source = String::from_utf8_lossy(&bytes);
        if let Some(report) = self.privileges.scan(&info.js, &source) {
            tracing::error!("{report}");
            return Err(report.into());
        }

        let scanned = self.references.scan(&source);
        for (name, line) in scanned.iter() {
            let resolution = self.resolver.resolve(info, name, line)?;

            if let Some(deprecation) = resolution.deprecation {
                if !self.target.ignore_deprecated_path {
                    tracing::warn!("{deprecation}");
                    self.deprecations.push(deprecation);
                }
            }

            let requirement = match resolution.target {
                Some(Resolved::Literal(literal)) => Requirement::Literal(literal),
                Some(Resolved::Module(found)) => Requirement::Entry(self.handle_module(found)?),
                // Tests may require missing modules on purpose.
                None if info.section() == Section::Tests => {
                    tracing::debug!(
                        module = %info.reference,
                        reference = name,
                        "skipping unresolved reference in test module"
                    );
                    continue;
                }
                None => {
                    return Err(ModuleNotFound {
                        kind: scanned.kind_of(name),
                        name: name.to_string(),
                        used_by: info.js.clone(),
                        line,
                        looked_in: resolution.looked_in,
                    }
                    .into());
                }
            };

            self.entries[id.0]
                .requirements
                .insert(name.to_string(), requirement);
        }

        Ok(())
    }

    fn discover_tests(&mut self, options: &BuildOptions) -> Result<()> {
        let runner = self.locate_harness_module(&options.test_runner)?;
        self.handle_module(runner)?;

        let target = self.target;
        let mut discovered: Vec<(String, EntryId)> = Vec::new();

        for dir in &target.tests {
            let dir = target.root_dir.join(dir);
            if !dir.is_dir() {
                tracing::debug!(package = %target.name, dir = %dir.display(), "no test directory");
                continue;
            }
            let listing = fs::read_dir(&dir).map_err(|err| ManifestError::io(&dir, err))?;
            let mut filenames: Vec<String> = listing
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|name| name.starts_with(TEST_FILE_PREFIX) && name.ends_with(TEST_FILE_SUFFIX))
                .collect();
            filenames.sort();

            for filename in filenames {
                let test_name = filename
                    .strip_suffix(TEST_FILE_SUFFIX)
                    .unwrap_or(&filename)
                    .to_string();
                if let Some(filter) = &options.test_filter {
                    if !filter.is_match(&test_name) {
                        continue;
                    }
                }

                let reference = ModuleReference::new(&target.name, Section::Tests, &test_name);
                let id = self.handle_module(ModuleInfo::new(reference, dir.join(&filename)))?;
                discovered.push((test_name, id));
            }
        }
        tracing::info!(tests = discovered.len(), "discovered test modules");

        let dispatcher = self.locate_harness_module(&options.test_dispatcher)?;
        let dispatcher = self.handle_module(dispatcher)?;
        for (test_name, id) in discovered {
            self.entries[dispatcher.0]
                .requirements
                .insert(test_name, Requirement::Entry(id));
            let path = self.entries[id.0].path();
            self.test_modules.push(path);
        }

        Ok(())
    }

    fn locate_harness_module(&self, reference: &ModuleReference) -> Result<ModuleInfo> {
        let mut looked_in = Vec::new();
        self.resolver
            .find_module_in_package(
                &reference.package,
                &[reference.section],
                &reference.module,
                &mut looked_in,
            )
            .ok_or_else(|| ManifestError::MissingHarnessModule {
                package: reference.package.clone(),
                module: reference.module.clone(),
                probed: looked_in,
            })
    }

    /// One bundle per contributing package that actually ships data files.
    fn collect_data(&mut self) -> Result<BTreeMap<String, DataBundle>> {
        let registry = self.resolver.registry();
        let mut bundles = BTreeMap::new();

        let used: Vec<String> = self
            .index
            .keys()
            .map(|reference| reference.package.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        for name in used {
            let package = registry.require(&name)?;
            let bundle = self.data.collect(package)?;
            if bundle.is_empty() {
                continue;
            }
            tracing::debug!(package = %name, files = bundle.files.len(), "collected data bundle");
            bundles.insert(name, bundle);
        }

        for entry in &mut self.entries {
            if bundles.contains_key(entry.package()) {
                entry.data_bundle = Some(entry.package().to_string());
            }
        }

        Ok(bundles)
    }
}

/// Resolve and scan everything reachable from `target`'s roots.
pub fn build_manifest(
    target: &str,
    registry: &PackageRegistry,
    mapping: &LegacyMapping,
    options: &BuildOptions,
) -> Result<Manifest> {
    ManifestBuilder::new(target, registry, mapping)?.build(options)
}
