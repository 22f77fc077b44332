//! Graph analysis commands: audit, fix-relations, related.

use super::{EntitySummary, Output, json, require};
use crate::ontology::{AuditReport, FixReport, Ontology};
use crate::storage::LoadFailure;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Broken links listed in human output before eliding the rest.
const HUMAN_BROKEN_LIMIT: usize = 10;

/// Suggestions offered by `related`.
const MAX_SUGGESTIONS: usize = 5;

// === audit ===

#[derive(Serialize)]
pub struct AuditResult {
    #[serde(flatten)]
    pub report: AuditReport,
    pub failures: Vec<LoadFailure>,
}

impl AuditResult {
    /// Whether the audit found a condition worth a non-zero exit.
    pub fn has_broken_links(&self) -> bool {
        self.report.broken_links > 0
    }
}

impl Output for AuditResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let r = &self.report;
        let mut out = format!("Ontology audit\n  Total objects: {}", r.total_objects);
        out.push_str("\n  By prefix:");
        for (prefix, count) in &r.by_prefix {
            let _ = write!(out, " {}={}", prefix, count);
        }
        out.push_str("\n  Concept status:");
        for (status, count) in &r.by_status {
            let _ = write!(out, " {}={}", status, count);
        }
        let _ = write!(
            out,
            "\n  Relations: {}\n  Components: {}\n  Isolated nodes: {}",
            r.edges, r.components, r.isolated_nodes
        );

        if !self.failures.is_empty() {
            let _ = write!(out, "\n\n{} files failed to load:", self.failures.len());
            for f in &self.failures {
                let _ = write!(out, "\n  - {}: {}", f.path.display(), f.reason);
            }
        }

        if r.broken.is_empty() {
            out.push_str("\n\nAll relations resolve.");
        } else {
            let _ = write!(out, "\n\nFound {} broken links:", r.broken_links);
            for link in r.broken.iter().take(HUMAN_BROKEN_LIMIT) {
                let _ = write!(
                    out,
                    "\n  - {} -[{}]-> {}: {}",
                    link.source, link.relation_type, link.target, link.reason
                );
            }
            if r.broken.len() > HUMAN_BROKEN_LIMIT {
                let _ = write!(out, "\n  ... and {} more", r.broken.len() - HUMAN_BROKEN_LIMIT);
            }
            out.push_str("\n\nFix with: ontology fix-relations --apply");
        }
        out
    }
}

pub fn audit(root: &Path) -> Result<AuditResult> {
    let ontology = Ontology::open(root)?;
    Ok(AuditResult {
        report: ontology.audit(),
        failures: ontology.load_failures().to_vec(),
    })
}

// === fix-relations ===

#[derive(Serialize)]
pub struct FixRelationsResult {
    #[serde(flatten)]
    pub report: FixReport,
    pub saved: Vec<PathBuf>,
}

impl Output for FixRelationsResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let r = &self.report;
        if r.broken == 0 {
            return "No broken relations.".to_string();
        }
        if r.dry_run {
            return format!(
                "Found {} broken relations (dry run). Re-run with --apply to remove them.",
                r.broken
            );
        }
        let ids: Vec<String> = r.touched.iter().map(|i| i.to_string()).collect();
        format!(
            "Removed {} broken relations from {} entities: {}",
            r.removed,
            r.touched.len(),
            ids.join(", ")
        )
    }
}

/// Count broken relations; with `apply`, strip them and save the entities
/// that changed.
///
/// `apply` is refused while any file fails to load: its links would look
/// broken and be stripped for good.
pub fn fix_relations(root: &Path, apply: bool) -> Result<FixRelationsResult> {
    let mut ontology = Ontology::open(root)?;
    if apply && !ontology.load_failures().is_empty() {
        let paths: Vec<String> = ontology
            .load_failures()
            .iter()
            .map(|f| f.path.display().to_string())
            .collect();
        return Err(Error::Validation(format!(
            "{} files failed to load, fix them before --apply: {}",
            paths.len(),
            paths.join(", ")
        )));
    }
    let report = ontology.fix_relations(!apply)?;
    let saved = report
        .touched
        .iter()
        .map(|id| ontology.save(id))
        .collect::<Result<Vec<_>>>()?;
    Ok(FixRelationsResult { report, saved })
}

// === related ===

#[derive(Serialize)]
pub struct RelatedResult {
    pub id: crate::models::EntityId,
    pub depth: usize,
    pub related: Vec<EntitySummary>,
    /// Entities two hops away that are not linked directly
    pub suggestions: Vec<EntitySummary>,
}

impl Output for RelatedResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = if self.related.is_empty() {
            format!("No entities within {} hops of {}", self.depth, self.id)
        } else {
            format!("{} entities within {} hops of {}:", self.related.len(), self.depth, self.id)
        };
        for e in &self.related {
            let _ = write!(out, "\n  {} {}", e.id, e.name);
        }
        if !self.suggestions.is_empty() {
            out.push_str("\nSuggested relations:");
            for e in &self.suggestions {
                let _ = write!(out, "\n  {} {}", e.id, e.name);
            }
        }
        out
    }
}

pub fn related(root: &Path, id: &str, depth: usize) -> Result<RelatedResult> {
    let ontology = Ontology::open(root)?;
    let id = require(&ontology, id)?.id;
    let summaries = |ids: Vec<crate::models::EntityId>| -> Vec<EntitySummary> {
        ids.iter()
            .filter_map(|i| ontology.index().get(i))
            .map(EntitySummary::from)
            .collect()
    };
    Ok(RelatedResult {
        id,
        depth,
        related: summaries(ontology.neighbors(&id, depth).into_iter().collect()),
        suggestions: summaries(ontology.suggest_relations(&id, MAX_SUGGESTIONS)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::entity::{add, init, relate};
    use crate::models::{EntityKind, RelationType};
    use crate::test_utils::TestEnv;

    fn chain(env: &TestEnv) {
        init(&env.root(), None).unwrap();
        for name in ["A", "B", "C", "D"] {
            add(&env.root(), name, EntityKind::Concept).unwrap();
        }
        relate(&env.root(), "C_1", "C_2", RelationType::Requires, None).unwrap();
        relate(&env.root(), "C_2", "C_3", RelationType::Enables, None).unwrap();
    }

    #[test]
    fn test_audit_and_fix_flow() {
        let env = TestEnv::new();
        chain(&env);
        relate(&env.root(), "C_3", "C_9", RelationType::PartOf, None).unwrap();

        let report = audit(&env.root()).unwrap();
        assert!(report.has_broken_links());
        assert_eq!(report.report.total_objects, 4);
        assert_eq!(report.report.isolated_nodes, 1);
        assert!(report.to_human().contains("C_3 -[part_of]-> C_9"));

        let dry = fix_relations(&env.root(), false).unwrap();
        assert_eq!(dry.report.broken, 1);
        assert!(dry.saved.is_empty());
        assert!(audit(&env.root()).unwrap().has_broken_links());

        let applied = fix_relations(&env.root(), true).unwrap();
        assert_eq!(applied.report.removed, 1);
        assert_eq!(applied.saved.len(), 1);
        assert!(!audit(&env.root()).unwrap().has_broken_links());
    }

    #[test]
    fn test_fix_apply_refused_while_files_fail_to_load() {
        let env = TestEnv::new();
        chain(&env);
        relate(&env.root(), "C_3", "C_4", RelationType::RelatesTo, None).unwrap();
        env.write_raw("concepts", "C_4_d.md", "no front matter");

        let dry = fix_relations(&env.root(), false).unwrap();
        assert_eq!(dry.report.broken, 1);

        let err = fix_relations(&env.root(), true).err().unwrap();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("C_4_d.md")));
        let ontology = Ontology::open(&env.root()).unwrap();
        let c3: crate::models::EntityId = "C_3".parse().unwrap();
        assert!(ontology.get(&c3).unwrap().has_relation("C_4", None));
    }

    #[test]
    fn test_audit_json_is_flat() {
        let env = TestEnv::new();
        chain(&env);
        let out = audit(&env.root()).unwrap().to_json();
        assert!(out.contains("\"total_objects\":4"));
        assert!(out.contains("\"broken_links\":0"));
    }

    #[test]
    fn test_related_and_suggestions() {
        let env = TestEnv::new();
        chain(&env);

        let one = related(&env.root(), "C_1", 1).unwrap();
        let ids: Vec<String> = one.related.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["C_2"]);
        let suggested: Vec<String> = one.suggestions.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(suggested, vec!["C_3"]);

        assert_eq!(related(&env.root(), "C_1", 2).unwrap().related.len(), 2);
        assert!(related(&env.root(), "C_1", 0).unwrap().related.is_empty());
        assert!(related(&env.root(), "C_4", 3).unwrap().related.is_empty());
    }
}
