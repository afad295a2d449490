use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::error::{ManifestError, Result};
use crate::core::graph::{ModuleReference, Section};
use crate::packages::{LegacyMapping, PackageDescriptor, PackageRegistry};

/// Requiring this name grants privileged access; it is never a file.
pub const PRIVILEGED_NAMESPACE: &str = "chrome";
/// Names starting with this are runtime-provided pseudo-modules.
pub const PSEUDO_MODULE_SIGIL: char = '@';

/// A module located on disk, not yet recorded in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub reference: ModuleReference,
    pub js: PathBuf,
    pub docs: Option<PathBuf>,
}

impl ModuleInfo {
    pub fn new(reference: ModuleReference, js: impl Into<PathBuf>) -> Self {
        Self {
            reference,
            js: js.into(),
            docs: None,
        }
    }

    pub fn with_docs(mut self, docs: Option<PathBuf>) -> Self {
        self.docs = docs;
        self
    }

    pub fn package(&self) -> &str {
        &self.reference.package
    }

    pub fn section(&self) -> Section {
        self.reference.section
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Module(ModuleInfo),
    Literal(String),
}

/// A reference that only resolved through the legacy-layout table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeprecatedPath {
    pub old: String,
    pub new: String,
    pub used_by: PathBuf,
    pub line: Option<usize>,
}

impl fmt::Display for DeprecatedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = match self.line {
            Some(line) => format!("{}:{}", self.used_by.display(), line),
            None => self.used_by.display().to_string(),
        };
        write!(
            f,
            "Use of deprecated require path: In {location}: require('{}'). New path should be: require('{}')",
            self.old, self.new
        )
    }
}

/// Outcome of one lookup. `target` is `None` when nothing matched; `looked_in`
/// lists every candidate probed across all strategies either way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub target: Option<Resolved>,
    pub looked_in: Vec<PathBuf>,
    pub deprecation: Option<DeprecatedPath>,
}

impl Resolution {
    fn literal(name: &str) -> Self {
        Self {
            target: Some(Resolved::Literal(name.to_string())),
            ..Self::default()
        }
    }

    fn finish(&mut self, found: Option<ModuleInfo>) -> bool {
        match found {
            Some(info) => {
                self.target = Some(Resolved::Module(info));
                true
            }
            None => false,
        }
    }
}

/// Package-aware module lookup.
///
/// Holds no state between calls: a lookup depends only on the referring
/// module, the name, the registry and the legacy table.
pub struct ModuleResolver<'a> {
    registry: &'a PackageRegistry,
    mapping: &'a LegacyMapping,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(registry: &'a PackageRegistry, mapping: &'a LegacyMapping) -> Self {
        Self { registry, mapping }
    }

    pub fn registry(&self) -> &'a PackageRegistry {
        self.registry
    }

    /// Resolve `name` as written in `from`, trying each strategy in order.
    pub fn resolve(&self, from: &ModuleInfo, name: &str, line: Option<usize>) -> Result<Resolution> {
        if name.is_empty() {
            return Err(malformed(from, name, "no actual modulename"));
        }

        if name == PRIVILEGED_NAMESPACE || name.starts_with(PSEUDO_MODULE_SIGIL) {
            return Ok(Resolution::literal(name));
        }

        let sections = from.section().lookup_order();
        let mut resolution = Resolution::default();

        if name.starts_with("./") || name.starts_with("../") {
            let module = relative_module_name(from, name)?;
            let found = self.find_module_in_package(
                from.package(),
                sections,
                &module,
                &mut resolution.looked_in,
            );
            resolution.finish(found);
            return Ok(resolution);
        }

        if let Some((package, module)) = name.split_once('/') {
            let found =
                self.find_module_in_package(package, sections, module, &mut resolution.looked_in);
            if resolution.finish(found) {
                return Ok(resolution);
            }
        } else {
            let found = self.entry_point(name, &mut resolution.looked_in);
            if resolution.finish(found) {
                return Ok(resolution);
            }
        }

        let found = self.search_packages(from.package(), sections, name, &mut resolution.looked_in);
        if resolution.finish(found) {
            return Ok(resolution);
        }

        // Old-style bare names are only honoured once every current layout
        // lookup has failed.
        if let Some(canonical) = self.mapping.lookup(name) {
            tracing::debug!(old = name, new = canonical, "trying legacy layout mapping");
            resolution.deprecation = Some(DeprecatedPath {
                old: name.to_string(),
                new: canonical.to_string(),
                used_by: from.js.clone(),
                line,
            });
            let found =
                self.search_packages(from.package(), sections, canonical, &mut resolution.looked_in);
            resolution.finish(found);
        }

        Ok(resolution)
    }

    /// Look for `name` in the given sections of one package, probing every
    /// library directory in declared order.
    pub fn find_module_in_package(
        &self,
        package: &str,
        sections: &[Section],
        name: &str,
        looked_in: &mut Vec<PathBuf>,
    ) -> Option<ModuleInfo> {
        let package = self.registry.get(package)?;
        find_module_in(package, sections, name, looked_in)
    }

    /// A bare package name resolves to that package's main module.
    fn entry_point(&self, package: &str, looked_in: &mut Vec<PathBuf>) -> Option<ModuleInfo> {
        let package = self.registry.get(package)?;
        let main = package.main.as_deref()?;

        for js in main_candidates(package, main) {
            looked_in.push(js.clone());
            if !js.is_file() {
                continue;
            }
            return match uri_name_from_path(package, &js) {
                Ok(name) => Some(ModuleInfo::new(
                    ModuleReference::new(&package.name, Section::Lib, name),
                    js,
                )),
                Err(err) => {
                    tracing::debug!(
                        package = %package.name,
                        error = %err,
                        "main entry point is not addressable"
                    );
                    None
                }
            };
        }
        None
    }

    fn search_packages(
        &self,
        from_package: &str,
        sections: &[Section],
        name: &str,
        looked_in: &mut Vec<PathBuf>,
    ) -> Option<ModuleInfo> {
        self.search_path(from_package)
            .into_iter()
            .find_map(|package| self.find_module_in_package(package, sections, name, looked_in))
    }

    /// The referring package first, then its declared dependencies, or every
    /// known package by name when it declares none.
    pub fn search_path(&self, from_package: &str) -> Vec<&'a str> {
        let mut path: Vec<&'a str> = Vec::new();
        let Some(us) = self.registry.get(from_package) else {
            return path;
        };
        path.push(us.name.as_str());

        match us.declared_dependencies() {
            Some(deps) => path.extend(deps.iter().map(String::as_str)),
            None => path.extend(self.registry.names()),
        }

        let mut seen = std::collections::HashSet::new();
        path.retain(|name| seen.insert(*name));
        path
    }
}

fn malformed(from: &ModuleInfo, reference: &str, reason: &str) -> ManifestError {
    ManifestError::MalformedReference {
        reference: reference.to_string(),
        module: from.js.clone(),
        reason: reason.to_string(),
    }
}

/// Walk `./` and `../` markers against the referring module's own directory.
fn relative_module_name(from: &ModuleInfo, reference: &str) -> Result<String> {
    let mut base: Vec<&str> = from.reference.module.split('/').collect();
    base.pop();

    let mut bits = reference.split('/').peekable();
    while let Some(&marker) = bits.peek() {
        match marker {
            "." => {}
            ".." => {
                if base.pop().is_none() {
                    return Err(malformed(from, reference, "too many .."));
                }
            }
            _ => break,
        }
        bits.next();
    }

    let rest: Vec<&str> = bits.collect();
    if rest.is_empty() || rest.iter().all(|bit| bit.is_empty()) {
        return Err(malformed(from, reference, "no actual modulename"));
    }
    base.extend(rest);
    Ok(base.join("/"))
}

pub(crate) fn find_module_in(
    package: &PackageDescriptor,
    sections: &[Section],
    name: &str,
    looked_in: &mut Vec<PathBuf>,
) -> Option<ModuleInfo> {
    let (filename, basename) = if let Some(base) = name.strip_suffix(".js") {
        (name.to_string(), base)
    } else if let Some(base) = name.strip_suffix(".json") {
        (name.to_string(), base)
    } else {
        (format!("{name}.js"), name)
    };

    for &section in sections {
        for dir in package.section_dirs(section) {
            let js = join_slashed(&package.root_dir.join(dir), &filename);
            looked_in.push(js.clone());
            if !js.is_file() {
                continue;
            }
            let docs = match section {
                Section::Lib => {
                    let candidate =
                        join_slashed(&package.root_dir.join("docs"), &format!("{basename}.md"));
                    candidate.is_file().then_some(candidate)
                }
                Section::Tests => None,
            };
            return Some(
                ModuleInfo::new(ModuleReference::new(&package.name, section, name), js)
                    .with_docs(docs),
            );
        }
    }
    None
}

/// Candidate files for a package's `main`, which may be written as
/// `./lib/main.js`, `./lib/main` or `lib/main`.
pub fn main_candidates(package: &PackageDescriptor, main: &str) -> Vec<PathBuf> {
    let main = main.strip_suffix(".js").unwrap_or(main);
    let main = main.strip_prefix("./").unwrap_or(main);
    let lib_dir = package.primary_lib_dir();

    let mut candidates = vec![join_slashed(&package.root_dir, &format!("{main}.js"))];
    if !main.starts_with(lib_dir) {
        candidates.push(join_slashed(
            &package.root_dir.join(lib_dir),
            &format!("{main}.js"),
        ));
    }
    candidates
}

/// Module name of `js` relative to the package's first library directory.
pub fn uri_name_from_path(package: &PackageDescriptor, js: &Path) -> Result<String> {
    let lib_dir = package.root_dir.join(package.primary_lib_dir());
    let relative = js
        .strip_prefix(&lib_dir)
        .map_err(|_| ManifestError::UnreachableMain {
            path: js.to_path_buf(),
            lib_dir: lib_dir.clone(),
        })?;
    let name = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Ok(name.strip_suffix(".js").unwrap_or(&name).to_string())
}

fn join_slashed(base: &Path, slashed: &str) -> PathBuf {
    slashed
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(base.to_path_buf(), |path, part| path.join(part))
}
