use std::fmt;
use std::path::PathBuf;

use crate::core::graph::CallKind;
use crate::core::privilege::PrivilegeReport;

pub type Result<T> = std::result::Result<T, ManifestError>;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("malformed module reference: {reason} in require({reference}) from {module}")]
    MalformedReference {
        reference: String,
        module: PathBuf,
        reason: String,
    },

    #[error(transparent)]
    ModuleNotFound(Box<ModuleNotFound>),

    #[error(transparent)]
    PrivilegeViolation(Box<PrivilegeReport>),

    #[error("bad section '{0}': expected 'lib' or 'tests'")]
    BadSection(String),

    #[error("unreachable main: {path} is outside {lib_dir}")]
    UnreachableMain { path: PathBuf, lib_dir: PathBuf },

    #[error("main entry point '{main}' of package '{package}' not found, looked in: {candidates:?}")]
    MissingMain {
        package: String,
        main: String,
        candidates: Vec<PathBuf>,
    },

    #[error("unknown package '{0}'")]
    UnknownPackage(String),

    #[error("duplicate package '{name}' at {first} and {second}")]
    DuplicatePackage {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("required module {package}/{module} not found, looked in: {probed:?}")]
    MissingHarnessModule {
        package: String,
        module: String,
        probed: Vec<PathBuf>,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid package descriptor {path}: {source}")]
    InvalidDescriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid legacy mapping {path}: {source}")]
    InvalidMapping {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize data index for {package}: {source}")]
    DataIndex {
        package: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid test filter: {0}")]
    InvalidTestFilter(#[from] regex::Error),
}

impl ManifestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ModuleNotFound> for ManifestError {
    fn from(err: ModuleNotFound) -> Self {
        ManifestError::ModuleNotFound(Box::new(err))
    }
}

impl From<PrivilegeReport> for ManifestError {
    fn from(report: PrivilegeReport) -> Self {
        ManifestError::PrivilegeViolation(Box::new(report))
    }
}

/// A reference that no resolution strategy could satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNotFound {
    pub kind: CallKind,
    pub name: String,
    pub used_by: PathBuf,
    pub line: Option<usize>,
    /// Every candidate file probed, in probe order.
    pub looked_in: Vec<PathBuf>,
}

impl fmt::Display for ModuleNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = format!("{}({})", self.kind.as_str(), self.name);
        let location = match self.line {
            Some(line) => format!("{}:{}", self.used_by.display(), line),
            None => self.used_by.display().to_string(),
        };
        writeln!(f, "ModuleNotFoundError: unable to satisfy: {what} from")?;
        writeln!(f, "  {location}:")?;
        writeln!(f, "Looked for it in:")?;
        for path in &self.looked_in {
            writeln!(f, "  {}", path.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for ModuleNotFound {}
