//! Command implementations for the `ontology` CLI.
//!
//! Each command loads what it needs from the ontology root, does its work
//! through the library, and returns a result that renders as JSON or as
//! human-readable text:
//! - [`entity`] - init, add, show, list, relate, unrelate, approve, remove
//! - [`analysis`] - audit, fix-relations, related
//! - [`export`] - CSV/XLSX export and the Mermaid graph
//! - [`ai`] - config-ai, fill, extract

pub mod ai;
pub mod analysis;
pub mod entity;
pub mod export;

pub use ai::{
    ConfigAiResult, ExtractResult, FillResult, ProviderListResult, config_ai, config_ai_providers,
    extract, fill,
};
pub use analysis::{AuditResult, FixRelationsResult, RelatedResult, audit, fix_relations, related};
pub use entity::{
    AddResult, ApproveResult, InitResult, ListResult, RelateResult, RemoveResult, ShowResult,
    UnrelateResult, add, approve, init, list, relate, remove, show, unrelate,
};
pub use export::{ExportResult, GraphResult, export, graph};

use crate::models::{Entity, EntityId};
use crate::{Error, Result};
use serde::Serialize;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to a single-line JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Compact JSON for any serializable result.
pub(crate) fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

/// Parse an entity ID argument.
pub(crate) fn parse_id(raw: &str) -> Result<EntityId> {
    raw.parse()
}

/// Parse an ID that must name an entity of the loaded ontology.
pub(crate) fn require<'a>(
    ontology: &'a crate::ontology::Ontology,
    raw: &str,
) -> Result<&'a Entity> {
    let id = parse_id(raw)?;
    ontology.get(&id)
}

/// Short one-line description of an entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntitySummary {
    pub id: EntityId,
    pub name: String,
    pub kind: crate::models::EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<crate::models::ConceptStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_meta: Option<crate::models::MetaMetaType>,
    pub filled: bool,
}

impl From<&Entity> for EntitySummary {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
            kind: entity.kind(),
            status: entity.status(),
            meta_meta: entity.meta_meta(),
            filled: entity.is_filled(),
        }
    }
}

/// Truncate `text` to `max` characters, marking the cut with `...`.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

pub(crate) fn not_a_concept(id: &EntityId) -> Error {
    Error::Validation(format!("{} is not a concept", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Привет, мир", 6), "Привет...");
    }

    #[test]
    fn test_json_is_single_line() {
        let out = json(&serde_json::json!({"a": [1, 2], "b": "x"}));
        assert!(!out.contains('\n'));
        assert!(out.contains("\"a\":[1,2]"));
    }
}
