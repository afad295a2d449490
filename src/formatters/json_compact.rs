use anyhow::Result;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::core::{Manifest, Requirement, Section};

/// Compact JSON dump of the requirement graph, for tooling and quick diffs.
pub struct JsonCompactFormatter {
    /// Include full metadata or just essential information
    minimal: bool,
}

impl JsonCompactFormatter {
    pub fn new() -> Self {
        Self { minimal: true }
    }

    pub fn verbose() -> Self {
        Self { minimal: false }
    }

    pub fn format_to_file(&self, manifest: &Manifest, output_path: &Path) -> Result<()> {
        let json_content = self.format_manifest(manifest)?;
        fs::write(output_path, json_content)?;
        Ok(())
    }

    pub fn format_manifest(&self, manifest: &Manifest) -> Result<String> {
        let graph = manifest.dependency_graph();
        let node_indices: Vec<NodeIndex> = graph.node_indices().collect();

        // Package table, in first-seen order
        let mut package_map: HashMap<&str, u16> = HashMap::new();
        let mut packages: Vec<&str> = Vec::new();
        for (_, entry) in manifest.entries() {
            if !package_map.contains_key(entry.package()) {
                package_map.insert(entry.package(), packages.len() as u16);
                packages.push(entry.package());
            }
        }

        // Graph nodes are added in entry order, so node index == entry index
        let mut nodes = Vec::with_capacity(node_indices.len());
        let mut literals = Vec::new();
        for ((id, entry), &idx) in manifest.entries().zip(&node_indices) {
            let package_id = package_map[entry.package()];
            let node_json = if self.minimal {
                json!({
                    "p": graph[idx],
                    "k": package_id,
                    "s": self.section_code(entry.section()),
                })
            } else {
                json!({
                    "path": graph[idx],
                    "package": package_id,
                    "section": self.section_code(entry.section()),
                    "module": entry.reference.module,
                    "sha256": entry.js_hash,
                    "docs": entry.docs_hash,
                })
            };
            nodes.push(node_json);

            for (name, requirement) in &entry.requirements {
                if let Requirement::Literal(literal) = requirement {
                    literals.push(json!([id.index(), name, literal]));
                }
            }
        }

        let mut edges = Vec::with_capacity(graph.edge_count());
        for edge_ref in graph.edge_references() {
            let src = edge_ref.source().index();
            let tgt = edge_ref.target().index();
            let edge_json = if self.minimal {
                json!([src, tgt])
            } else {
                json!({ "src": src, "tgt": tgt, "name": edge_ref.weight() })
            };
            edges.push(edge_json);
        }

        let output = json!({
            "meta": {
                "modules": graph.node_count(),
                "edges": graph.edge_count(),
                "cycles": manifest.cycles().len(),
                "format": if self.minimal { "compact" } else { "full" }
            },
            "packages": packages,
            "nodes": nodes,
            "edges": edges,
            "literals": literals,
        });

        Ok(serde_json::to_string(&output)?)
    }

    fn section_code(&self, section: Section) -> u8 {
        match section {
            Section::Lib => 0,
            Section::Tests => 1,
        }
    }
}

impl Default for JsonCompactFormatter {
    fn default() -> Self {
        Self::new()
    }
}
