//! Mermaid flowchart of the relation graph.

use crate::index::OntologyIndex;
use crate::models::graph::RelationGraph;
use std::fmt::Write;

/// Render every entity as a node and every resolvable relation as an edge.
pub fn render(index: &OntologyIndex) -> String {
    let mut out = String::from("graph TD\n");
    for entity in index.iter() {
        let _ = writeln!(out, "    {}[\"{}\"]", entity.id, escape_label(&entity.name));
    }
    for (source, target, edge) in RelationGraph::build(index).edges() {
        let _ = writeln!(out, "    {} -->|{}| {}", source, edge.relation_type, target);
    }
    out
}

// Mermaid labels take HTML entity codes for quotes.
fn escape_label(name: &str) -> String {
    name.replace('"', "#quot;").replace('\n', " ")
}
