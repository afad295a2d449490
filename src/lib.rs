//! # addon-manifest
//!
//! Module dependency resolution and packaging manifests for CommonJS-style
//! extension bundles.
//!
//! Starting from an extension's entry module, every reachable module is scanned
//! for `require()`/`define()` references, each reference is resolved through a
//! package-aware search, and the result is a manifest of modules, their SHA-256
//! hashes and their resolved requirement graph, ready for an archive packager.
//!
//! ## Resolution order
//!
//! 1. `chrome` and `@pseudo` modules pass through as literals
//! 2. `./` and `../` references, within the referring package
//! 3. `package/module` references
//! 4. bare package names, via the package's `main`
//! 5. the referring package, then its dependencies (or every package)
//! 6. the legacy-layout mapping table, with a deprecation warning
//!
//! ## Output Formats
//!
//! - **Harness**: full manifest document for the packager
//! - **JSON-Compact**: minimal requirement graph

pub mod core;
pub mod formatters;
pub mod logging;
pub mod packages;
