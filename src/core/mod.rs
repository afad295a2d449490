pub mod builder;
pub mod data;
pub mod error;
pub mod graph;
pub mod hashing;
pub mod privilege;
pub mod resolver;
pub mod scanner;

pub use builder::{build_manifest, BuildOptions, ExtraModule, ManifestBuilder};
pub use data::{DataBundle, DataCollector};
pub use error::{ManifestError, ModuleNotFound, Result};
pub use graph::{
    CallKind, EntryId, Manifest, ManifestEntry, ManifestRecord, ModuleReference, Requirement,
    RequirementGraph, Section, SYSTEM_PACKAGE,
};
pub use privilege::{PrivilegeReport, PrivilegeScanner};
pub use resolver::{DeprecatedPath, ModuleInfo, ModuleResolver, Resolution, Resolved};
pub use scanner::{ReferenceScanner, ScannedReferences};
