//! Export commands: tabular export and the Mermaid graph.

use super::{Output, json};
use crate::Result;
use crate::export::xlsx::SheetCount;
use crate::export::{ExportFilter, ExportFormat, csv, mermaid, xlsx};
use crate::ontology::Ontology;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Where `graph` writes when no output is given.
pub const DEFAULT_GRAPH_OUTPUT: &str = "visuals/ontology.mmd";

/// Default export file for a format, relative to the working directory.
pub fn default_export_path(format: ExportFormat) -> PathBuf {
    PathBuf::from(format!("ontology_export.{}", format))
}

// === export ===

#[derive(Serialize)]
pub struct ExportResult {
    pub format: ExportFormat,
    pub path: PathBuf,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheets: Option<Vec<SheetCount>>,
}

impl Output for ExportResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Exported {} objects to {}", self.rows, self.path.display());
        for sheet in self.sheets.iter().flatten() {
            let _ = write!(out, "\n  - {}: {} objects", sheet.sheet, sheet.rows);
        }
        out
    }
}

/// Export to CSV or XLSX. Filters apply to CSV; the workbook always holds
/// every kind.
pub fn export(
    root: &Path,
    format: ExportFormat,
    output: Option<PathBuf>,
    filter: ExportFilter,
) -> Result<ExportResult> {
    let ontology = Ontology::open(root)?;
    let path = output.unwrap_or_else(|| default_export_path(format));

    let (rows, sheets) = match format {
        ExportFormat::Csv => (csv::export_csv(ontology.index(), &path, &filter)?, None),
        ExportFormat::Xlsx => {
            if filter != ExportFilter::default() {
                warn!("filters are ignored for xlsx export");
            }
            let sheets = xlsx::export_xlsx(ontology.index(), &path)?;
            (sheets.iter().map(|s| s.rows).sum(), Some(sheets))
        }
    };
    Ok(ExportResult {
        format,
        path,
        rows,
        sheets,
    })
}

// === graph ===

#[derive(Serialize)]
pub struct GraphResult {
    pub path: PathBuf,
    pub nodes: usize,
    pub edges: usize,
}

impl Output for GraphResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Graph written to {}\nNodes: {}, edges: {}\nRender with: mmdc -i {} -o {}",
            self.path.display(),
            self.nodes,
            self.edges,
            self.path.display(),
            self.path.with_extension("png").display()
        )
    }
}

/// Write the Mermaid graph of the ontology.
pub fn graph(root: &Path, output: Option<PathBuf>) -> Result<GraphResult> {
    let ontology = Ontology::open(root)?;
    let path = output.unwrap_or_else(|| PathBuf::from(DEFAULT_GRAPH_OUTPUT));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, mermaid::render(ontology.index()))?;

    let graph = ontology.graph();
    Ok(GraphResult {
        path,
        nodes: graph.node_count(),
        edges: graph.edge_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::entity::{add, approve, init, relate};
    use crate::models::{ConceptStatus, EntityKind, RelationType};
    use crate::test_utils::TestEnv;

    fn populated() -> TestEnv {
        let env = TestEnv::new();
        init(&env.root(), None).unwrap();
        add(&env.root(), "Goal", EntityKind::Concept).unwrap();
        add(&env.root(), "Habit", EntityKind::Concept).unwrap();
        add(&env.root(), "Review", EntityKind::Method).unwrap();
        approve(&env.root(), "C_1").unwrap();
        relate(&env.root(), "C_1", "M_1", RelationType::Requires, None).unwrap();
        relate(&env.root(), "C_2", "C_5", RelationType::RelatesTo, None).unwrap();
        env
    }

    #[test]
    fn test_export_csv_with_filter() {
        let env = populated();
        let path = env.path().join("out/approved.csv");
        let filter = ExportFilter {
            kind: None,
            status: Some(ConceptStatus::Approved),
        };
        let result = export(&env.root(), ExportFormat::Csv, Some(path.clone()), filter).unwrap();
        assert_eq!(result.rows, 1);
        assert!(result.sheets.is_none());
        assert!(fs::read_to_string(&path).unwrap().contains("C_1"));
    }

    #[test]
    fn test_export_xlsx_counts_sheets() {
        let env = populated();
        let path = env.path().join("all.xlsx");
        let result =
            export(&env.root(), ExportFormat::Xlsx, Some(path.clone()), ExportFilter::default())
                .unwrap();
        assert_eq!(result.rows, 3);
        let sheets = result.sheets.unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].sheet, "Concepts");
        assert!(path.exists());
    }

    #[test]
    fn test_graph_skips_dangling_edges() {
        let env = populated();
        let path = env.path().join("visuals/graph.mmd");
        let result = graph(&env.root(), Some(path.clone())).unwrap();
        assert_eq!(result.nodes, 3);
        assert_eq!(result.edges, 1);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("graph TD\n"));
        assert!(content.contains("C_1 -->|requires| M_1"));
        assert!(!content.contains("C_5"));
    }
}
