use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::scanner::is_comment;

/// The module loader itself is allowed to touch the privileged namespace.
pub const LOADER_FILENAME: &str = "cuddlefish.js";

static PRIVILEGED_ALIASES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"Components\.classes", "Cc"),
        (r"Components\.interfaces", "Ci"),
        (r"Components\.utils", "Cu"),
        (r"Components\.results", "Cr"),
        (r"Components\.manager", "Cm"),
    ]
    .into_iter()
    .map(|(pattern, alias)| {
        (
            Regex::new(pattern).expect("privileged alias pattern is valid"),
            alias,
        )
    })
    .collect()
});

static OTHER_PRIVILEGED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Components\.[a-zA-Z]").expect("privileged pattern is valid"));

/// Direct privileged-namespace access found in one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeReport {
    pub path: PathBuf,
    /// Short aliases the module should import instead, e.g. `Cc`.
    pub aliases: BTreeSet<String>,
    /// `(line number, stripped line)` for every offending line.
    pub lines: Vec<(usize, String)>,
}

impl fmt::Display for PrivilegeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let needs = self
            .aliases
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        writeln!(f, "The following lines from file {}:", self.path.display())?;
        for (line, text) in &self.lines {
            writeln!(f, " {line:>3}: {text}")?;
        }
        writeln!(
            f,
            "use 'Components' to access chrome authority. To do so, you need to add a"
        )?;
        writeln!(f, "line somewhat like the following:")?;
        writeln!(f)?;
        writeln!(f, "  const {{{needs}}} = require(\"chrome\");")?;
        writeln!(f)?;
        writeln!(
            f,
            "Then you can use any shortcuts to its properties that you import from the"
        )?;
        writeln!(
            f,
            "'chrome' module ('Cc', 'Ci', 'Cm', 'Cr', and 'Cu' for the 'classes',"
        )?;
        writeln!(
            f,
            "'interfaces', 'manager', 'results', and 'utils' properties, respectively. And"
        )?;
        write!(f, "`components` for `Components` object itself).")
    }
}

impl std::error::Error for PrivilegeReport {}

/// Detects voluntary direct use of the privileged namespace.
///
/// It does not try to catch every form of access; runtime enforcement does that.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivilegeScanner;

impl PrivilegeScanner {
    pub fn new() -> Self {
        Self
    }

    pub fn is_exempt(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name == LOADER_FILENAME)
            .unwrap_or(false)
    }

    /// Returns a report when `source` accesses the namespace directly.
    pub fn scan(&self, path: &Path, source: &str) -> Option<PrivilegeReport> {
        if self.is_exempt(path) {
            return None;
        }

        let mut aliases = BTreeSet::new();
        let mut lines = Vec::new();

        for (index, line) in source.lines().enumerate() {
            let line = line.trim();
            if is_comment(line) {
                continue;
            }

            let mut in_this_line: Vec<&str> = PRIVILEGED_ALIASES
                .iter()
                .filter(|(pattern, _)| pattern.is_match(line))
                .map(|(_, alias)| *alias)
                .collect();
            if in_this_line.is_empty() && OTHER_PRIVILEGED.is_match(line) {
                in_this_line.push("components");
            }

            if !in_this_line.is_empty() {
                aliases.extend(in_this_line.into_iter().map(str::to_string));
                lines.push((index + 1, line.to_string()));
            }
        }

        if aliases.is_empty() {
            None
        } else {
            Some(PrivilegeReport {
                path: path.to_path_buf(),
                aliases,
                lines,
            })
        }
    }
}
