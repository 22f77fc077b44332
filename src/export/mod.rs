//! Exporters: CSV, XLSX workbook and Mermaid graph.

pub mod csv;
pub mod mermaid;
pub mod xlsx;

use crate::index::OntologyIndex;
use crate::models::{ConceptStatus, Entity, EntityKind};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;

/// Tabular export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Xlsx => write!(f, "xlsx"),
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            _ => Err(format!("Invalid export format: {}. Valid: csv, xlsx", s)),
        }
    }
}

/// Restricts which entities are exported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportFilter {
    pub kind: Option<EntityKind>,
    /// Only concepts carry a status, so setting this excludes other kinds.
    pub status: Option<ConceptStatus>,
}

impl ExportFilter {
    pub fn matches(&self, entity: &Entity) -> bool {
        self.kind.is_none_or(|k| entity.kind() == k)
            && self.status.is_none_or(|s| entity.status() == Some(s))
    }
}

/// Entities passing `filter`, in index order.
pub fn select<'a>(index: &'a OntologyIndex, filter: &ExportFilter) -> Vec<&'a Entity> {
    index.iter().filter(|e| filter.matches(e)).collect()
}

/// Examples joined by `; `.
pub fn join_examples(entity: &Entity) -> String {
    entity.examples.join("; ")
}

/// Relations as `type:target` joined by `; `.
pub fn join_relations(entity: &Entity) -> String {
    entity
        .relations
        .iter()
        .map(|r| format!("{}:{}", r.relation_type, r.target))
        .collect::<Vec<_>>()
        .join("; ")
}

pub(crate) fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
