use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::core::graph::CallKind;

/// Clause prefixes that mark a line as commentary or a side-effect-only call.
pub const COMMENT_PREFIXES: &[&str] = &["//", "/*", "*", "dump("];

/// `require("name")` with matching quotes on both sides of the name.
static REQUIRE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"require\s*\(\s*(?:"([^"']+)"|'([^"']+)')\s*\)"#)
        .expect("require pattern is valid")
});

/// `define("label", ["a", "b"], ...)` or `require(["a", "b"], ...)`. The list
/// may span several lines, so this runs over the joined source.
static DEFINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:require|define)\s*\(\s*(?:['"][^'"]+['"]\s*,)?\s*\[([^\]]+)\]"#)
        .expect("define pattern is valid")
});

/// A single list entry must be one quoted literal with no quotes inside.
static DEFINE_ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^['"][^'"]+['"]$"#).expect("define entry pattern is valid"));

/// Names found in one module's source.
///
/// Each name maps to the 1-indexed line of its first call-style reference, or
/// `None` when it was only seen inside a `define([...])` list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedReferences {
    names: BTreeMap<String, Option<usize>>,
}

impl ScannedReferences {
    /// Referenced names in sorted order with their first line, if known.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<usize>)> {
        self.names.iter().map(|(name, line)| (name.as_str(), *line))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn line_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied().flatten()
    }

    pub fn kind_of(&self, name: &str) -> CallKind {
        match self.line_of(name) {
            Some(_) => CallKind::Require,
            None => CallKind::Define,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn record_call(&mut self, name: &str, line: usize) {
        let slot = self.names.entry(name.to_string()).or_insert(None);
        if slot.is_none() {
            *slot = Some(line);
        }
    }

    fn record_declared(&mut self, name: &str) {
        self.names.entry(name.to_string()).or_insert(None);
    }
}

/// Lexical scanner for module references.
///
/// This is pattern matching, not parsing: computed names such as
/// `require(prefix + "x")` are invisible to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceScanner;

impl ReferenceScanner {
    pub fn new() -> Self {
        Self
    }

    pub fn scan(&self, source: &str) -> ScannedReferences {
        let mut found = ScannedReferences::default();

        for (index, line) in source.lines().enumerate() {
            for clause in line.split(';') {
                let clause = clause.trim();
                if is_comment(clause) {
                    continue;
                }
                for captures in REQUIRE_RE.captures_iter(clause) {
                    let Some(whole) = captures.get(0) else {
                        continue;
                    };
                    if preceded_by_quote(clause, whole.start()) {
                        continue;
                    }
                    let name = captures
                        .get(1)
                        .or_else(|| captures.get(2))
                        .map(|m| m.as_str())
                        .unwrap_or_default();
                    if name.trim().is_empty() {
                        continue;
                    }
                    found.record_call(name, index + 1);
                }
            }
        }

        for captures in DEFINE_RE.captures_iter(source) {
            let Some(list) = captures.get(1) else {
                continue;
            };
            for entry in list.as_str().split(',') {
                let entry = entry.trim();
                if entry.is_empty() || !DEFINE_ENTRY_RE.is_match(entry) {
                    continue;
                }
                let name = &entry[1..entry.len() - 1];
                if name == "exports" || name.trim().is_empty() {
                    continue;
                }
                found.record_declared(name);
            }
        }

        found
    }
}

/// True when the stripped clause starts with a comment or side-effect prefix.
pub fn is_comment(clause: &str) -> bool {
    COMMENT_PREFIXES
        .iter()
        .any(|prefix| clause.starts_with(prefix))
}

fn preceded_by_quote(text: &str, start: usize) -> bool {
    matches!(text[..start].chars().next_back(), Some('"') | Some('\''))
}
