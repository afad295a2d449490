use petgraph::algo::tarjan_scc;
use petgraph::{graph::NodeIndex, Directed, Graph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::data::DataBundle;
use crate::core::error::ManifestError;
use crate::core::resolver::DeprecatedPath;

/// Package whose modules the runtime already ships; its name is left out of
/// canonical paths.
pub const SYSTEM_PACKAGE: &str = "addon-sdk";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Lib,
    Tests,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Lib => "lib",
            Section::Tests => "tests",
        }
    }

    /// Sections a module in `self` may require from. Tests may use library
    /// code, library code may not use tests.
    pub fn lookup_order(self) -> &'static [Section] {
        match self {
            Section::Lib => &[Section::Lib],
            Section::Tests => &[Section::Tests, Section::Lib],
        }
    }
}

impl FromStr for Section {
    type Err = ManifestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "lib" => Ok(Section::Lib),
            "tests" => Ok(Section::Tests),
            other => Err(ManifestError::BadSection(other.to_string())),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a reference was written in source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    /// `require("x")`, which has a line number.
    Require,
    /// Only listed in `define([...])`.
    Define,
}

impl CallKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CallKind::Require => "require",
            CallKind::Define => "define",
        }
    }
}

/// Identity of a resolvable module: `(package, section, module name)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleReference {
    pub package: String,
    pub section: Section,
    pub module: String,
}

impl ModuleReference {
    pub fn new(package: impl Into<String>, section: Section, module: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            section,
            module: module.into(),
        }
    }

    /// Slash-joined runtime path: package omitted for the system package,
    /// section included only for tests, `.js` dropped.
    pub fn path(&self) -> String {
        let name = self.module.strip_suffix(".js").unwrap_or(&self.module);
        let mut items: Vec<&str> = Vec::with_capacity(3);
        if self.package != SYSTEM_PACKAGE {
            items.push(&self.package);
        }
        if self.section == Section::Tests {
            items.push(self.section.as_str());
        }
        items.push(name);
        items.join("/")
    }
}

impl fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.package, self.section, self.module)
    }
}

/// Index of an entry inside its [`Manifest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub(crate) usize);

impl EntryId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a referenced name resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requirement {
    Entry(EntryId),
    /// Privileged namespace or pseudo-module, passed through as written.
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub reference: ModuleReference,
    pub js_path: PathBuf,
    pub js_hash: String,
    pub docs_path: Option<PathBuf>,
    pub docs_hash: Option<String>,
    /// Package name of the data bundle shipped alongside this module.
    pub data_bundle: Option<String>,
    pub requirements: BTreeMap<String, Requirement>,
}

impl ManifestEntry {
    pub(crate) fn reserve(reference: ModuleReference, js_path: PathBuf) -> Self {
        Self {
            reference,
            js_path,
            js_hash: String::new(),
            docs_path: None,
            docs_hash: None,
            data_bundle: None,
            requirements: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> String {
        self.reference.path()
    }

    pub fn package(&self) -> &str {
        &self.reference.package
    }

    pub fn section(&self) -> Section {
        self.reference.section
    }

    pub fn is_system(&self) -> bool {
        self.reference.package == SYSTEM_PACKAGE
    }
}

/// Serializable view of one entry, as handed to the packager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRecord {
    pub package_name: String,
    pub section_name: Section,
    pub module_name: String,
    #[serde(rename = "jsSHA256")]
    pub js_sha256: String,
    #[serde(rename = "docsSHA256")]
    pub docs_sha256: Option<String>,
    pub requirements: BTreeMap<String, String>,
}

pub type RequirementGraph = Graph<String, String, Directed>;

/// The finished, immutable result of one build.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub(crate) entries: Vec<ManifestEntry>,
    pub(crate) index: BTreeMap<ModuleReference, EntryId>,
    pub(crate) data_bundles: BTreeMap<String, DataBundle>,
    pub(crate) test_modules: Vec<String>,
    pub(crate) top: Option<EntryId>,
    pub(crate) deprecations: Vec<DeprecatedPath>,
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (EntryId, &ManifestEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (EntryId(index), entry))
    }

    pub fn entry(&self, id: EntryId) -> &ManifestEntry {
        &self.entries[id.0]
    }

    pub fn id_of(&self, reference: &ModuleReference) -> Option<EntryId> {
        self.index.get(reference).copied()
    }

    pub fn get(&self, reference: &ModuleReference) -> Option<&ManifestEntry> {
        self.id_of(reference).map(|id| self.entry(id))
    }

    pub fn top(&self) -> Option<&ManifestEntry> {
        self.top.map(|id| self.entry(id))
    }

    pub fn top_path(&self) -> Option<String> {
        self.top().map(ManifestEntry::path)
    }

    pub fn requirement_target(&self, requirement: &Requirement) -> String {
        match requirement {
            Requirement::Entry(id) => self.entry(*id).path(),
            Requirement::Literal(name) => name.clone(),
        }
    }

    pub fn record(&self, id: EntryId) -> ManifestRecord {
        let entry = self.entry(id);
        ManifestRecord {
            package_name: entry.reference.package.clone(),
            section_name: entry.reference.section,
            module_name: entry.reference.module.clone(),
            js_sha256: entry.js_hash.clone(),
            docs_sha256: entry.docs_hash.clone(),
            requirements: entry
                .requirements
                .iter()
                .map(|(name, requirement)| (name.clone(), self.requirement_target(requirement)))
                .collect(),
        }
    }

    /// Canonical path to record, skipping system modules unless they are
    /// bundled.
    pub fn harness_manifest(&self, bundle_sdk_modules: bool) -> BTreeMap<String, ManifestRecord> {
        self.entries()
            .filter(|(_, entry)| bundle_sdk_modules || !entry.is_system())
            .map(|(id, entry)| (entry.path(), self.record(id)))
            .collect()
    }

    /// Sorted names of every package that contributed an entry.
    pub fn used_packages(&self) -> Vec<String> {
        self.index
            .keys()
            .map(|reference| reference.package.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// `(source, archive destination)` for every file the packager copies:
    /// data files first, then module sources.
    pub fn used_files(&self, bundle_sdk_modules: bool) -> Vec<(PathBuf, PathBuf)> {
        let mut files: Vec<(PathBuf, PathBuf)> = self
            .data_bundles
            .values()
            .flat_map(|bundle| bundle.archive_files())
            .collect();

        let mut modules: Vec<(PathBuf, PathBuf)> = self
            .entries
            .iter()
            .filter(|entry| bundle_sdk_modules || !entry.is_system())
            .map(|entry| (entry.js_path.clone(), module_destination(entry)))
            .collect();
        modules.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        modules.dedup();

        files.extend(modules);
        files
    }

    pub fn data_bundles(&self) -> impl Iterator<Item = &DataBundle> {
        self.data_bundles.values()
    }

    pub fn data_bundle(&self, package: &str) -> Option<&DataBundle> {
        self.data_bundles.get(package)
    }

    pub fn test_modules(&self) -> &[String] {
        &self.test_modules
    }

    pub fn deprecations(&self) -> &[DeprecatedPath] {
        &self.deprecations
    }

    /// Requirement graph over canonical paths; edge weights are the names as
    /// written in source. Literal requirements are left out.
    pub fn dependency_graph(&self) -> RequirementGraph {
        let mut graph = RequirementGraph::new();
        let nodes: Vec<NodeIndex> = self
            .entries
            .iter()
            .map(|entry| graph.add_node(entry.path()))
            .collect();

        for (source, entry) in self.entries.iter().enumerate() {
            for (name, requirement) in &entry.requirements {
                if let Requirement::Entry(target) = requirement {
                    graph.add_edge(nodes[source], nodes[target.0], name.clone());
                }
            }
        }

        graph
    }

    /// Groups of modules that reach each other through requirements, each
    /// sorted by path.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let graph = self.dependency_graph();
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1 || graph.contains_edge(component[0], component[0])
            })
            .map(|component| {
                let mut paths: Vec<String> =
                    component.into_iter().map(|idx| graph[idx].clone()).collect();
                paths.sort();
                paths
            })
            .collect();
        cycles.sort();
        cycles
    }
}

fn module_destination(entry: &ManifestEntry) -> PathBuf {
    let module = &entry.reference.module;
    let file = if module.ends_with(".js") || module.ends_with(".json") {
        module.clone()
    } else {
        format!("{module}.js")
    };
    PathBuf::from("resources")
        .join(&entry.reference.package)
        .join(entry.reference.section.as_str())
        .join(file)
}
