//! Entity commands: init, add, show, list, relate, unrelate, approve, remove.

use super::{EntitySummary, Output, json, not_a_concept, parse_id, require, truncate};
use crate::config::OntologyConfig;
use crate::config::resolver::DEFAULT_PROJECT_NAME;
use crate::models::{ConceptStatus, Entity, EntityId, EntityKind, RelationType};
use crate::ontology::Ontology;
use crate::storage::Storage;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// === init ===

#[derive(Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub root: PathBuf,
    pub project_name: String,
    pub config_path: PathBuf,
    pub config_created: bool,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = if self.initialized {
            format!("Initialized ontology '{}' at {}", self.project_name, self.root.display())
        } else {
            format!("Ontology already initialized at {}", self.root.display())
        };
        if self.config_created {
            let _ = write!(out, "\nWrote {}", self.config_path.display());
        }
        out
    }
}

/// Create the ontology layout and its `config.kdl`. Running it again only
/// fills in what is missing.
pub fn init(root: &Path, project: Option<&str>) -> Result<InitResult> {
    let project_name = project
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PROJECT_NAME)
        .to_string();
    let initialized = !Storage::exists(root);
    let storage = Storage::init(root, &project_name)?;

    let config_path = storage.config_path();
    let config_created = !config_path.exists();
    if config_created {
        OntologyConfig::for_project(&project_name).write_file(&config_path)?;
    }
    info!(root = %root.display(), "ontology initialized");

    Ok(InitResult {
        initialized,
        root: root.to_path_buf(),
        project_name,
        config_path,
        config_created,
    })
}

// === add ===

#[derive(Serialize)]
pub struct AddResult {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ConceptStatus>,
    pub path: PathBuf,
}

impl Output for AddResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Created {} {}: {}", self.kind, self.id, self.name);
        let _ = write!(out, "\nFile: {}", self.path.display());
        if let Some(status) = self.status {
            let _ = write!(out, "\nStatus: {} (needs filling)", status);
        }
        out
    }
}

/// Add a draft entity of `kind`. A second entity of the same kind with the
/// same normalized name is refused.
pub fn add(root: &Path, name: &str, kind: EntityKind) -> Result<AddResult> {
    let mut ontology = Ontology::open(root)?;
    if let Some(existing) = ontology
        .index()
        .find_by_name(name)
        .into_iter()
        .find(|e| e.kind() == kind)
    {
        return Err(Error::Validation(format!(
            "{} '{}' already exists as {}",
            kind,
            name.trim(),
            existing.id
        )));
    }

    let id = ontology.create_entity(kind, name, None)?.id;
    let path = ontology.save_new(&id)?;
    let entity = ontology.get(&id)?;
    Ok(AddResult {
        id,
        name: entity.name.clone(),
        kind,
        status: entity.status(),
        path,
    })
}

// === show ===

/// A relation pointing at the shown entity.
#[derive(Serialize)]
pub struct IncomingRelation {
    pub source: EntityId,
    pub relation_type: RelationType,
}

#[derive(Serialize)]
pub struct ShowResult {
    pub entity: Entity,
    pub incoming: Vec<IncomingRelation>,
}

impl Output for ShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let e = &self.entity;
        let mut out = format!("{} {} ({})", e.id, e.name, e.kind());
        if let Some(status) = e.status() {
            let _ = write!(out, "\n  Status: {}", status);
        }
        if let Some(meta) = e.meta_meta() {
            let _ = write!(out, "\n  Type: {}", meta);
        }
        let _ = write!(out, "\n  Definition: {}", e.definition);
        let _ = write!(out, "\n  Purpose: {}", e.purpose);
        if !e.examples.is_empty() {
            out.push_str("\n  Examples:");
            for example in &e.examples {
                let _ = write!(out, "\n    - {}", example);
            }
        }
        if !e.relations.is_empty() {
            out.push_str("\n  Relations:");
            for r in &e.relations {
                let _ = write!(out, "\n    {} -> {}", r.relation_type, r.target);
                if let Some(d) = &r.description {
                    let _ = write!(out, " ({})", d);
                }
            }
        }
        if !self.incoming.is_empty() {
            out.push_str("\n  Referenced by:");
            for r in &self.incoming {
                let _ = write!(out, "\n    {} <- {}", r.relation_type, r.source);
            }
        }
        if let Some(notes) = &e.notes {
            let _ = write!(out, "\n  Notes: {}", notes);
        }
        let _ = write!(
            out,
            "\n  Created: {}\n  Updated: {}",
            e.created.format("%Y-%m-%d %H:%M"),
            e.updated.format("%Y-%m-%d %H:%M")
        );
        out
    }
}

pub fn show(root: &Path, id: &str) -> Result<ShowResult> {
    let ontology = Ontology::open(root)?;
    let entity = require(&ontology, id)?.clone();
    let target = entity.id.to_string();
    let incoming = ontology
        .index()
        .iter()
        .flat_map(|source| {
            source
                .relations
                .iter()
                .filter(|r| r.target == target)
                .map(move |r| IncomingRelation {
                    source: source.id,
                    relation_type: r.relation_type,
                })
        })
        .collect();
    Ok(ShowResult { entity, incoming })
}

// === list ===

#[derive(Serialize)]
pub struct ListResult {
    pub count: usize,
    pub entities: Vec<EntitySummary>,
}

impl Output for ListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.entities.is_empty() {
            return "No entities found.".to_string();
        }
        let mut out = format!("{} entities:", self.count);
        for e in &self.entities {
            let status = e.status.map(|s| s.as_str()).unwrap_or("-");
            let meta = e.meta_meta.map(|m| m.as_str()).unwrap_or("-");
            let _ = write!(
                out,
                "\n  {:<6} {:<50} {:<13} {}",
                e.id.to_string(),
                truncate(&e.name, 50),
                status,
                meta
            );
        }
        out
    }
}

/// List entities, optionally filtered by kind and concept status. A status
/// filter only matches concepts.
pub fn list(
    root: &Path,
    status: Option<ConceptStatus>,
    kind: Option<EntityKind>,
) -> Result<ListResult> {
    let ontology = Ontology::open(root)?;
    let entities: Vec<EntitySummary> = ontology
        .index()
        .iter()
        .filter(|e| kind.is_none_or(|k| e.kind() == k))
        .filter(|e| status.is_none_or(|s| e.status() == Some(s)))
        .map(EntitySummary::from)
        .collect();
    Ok(ListResult {
        count: entities.len(),
        entities,
    })
}

// === relate / unrelate ===

#[derive(Serialize)]
pub struct RelateResult {
    pub source: EntityId,
    pub target: String,
    pub relation_type: RelationType,
    pub added: bool,
    pub target_exists: bool,
}

impl Output for RelateResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let sentence = self
            .relation_type
            .describe(&self.source.to_string(), &self.target);
        let mut out = if self.added {
            format!("Linked: {}", sentence)
        } else {
            format!("Already linked: {}", sentence)
        };
        if !self.target_exists {
            let _ = write!(out, "\nWarning: {} does not exist yet", self.target);
        }
        out
    }
}

/// Add a typed relation from `source` to `target`.
///
/// The target is not required to exist; a dangling target is reported by
/// `audit`.
pub fn relate(
    root: &Path,
    source: &str,
    target: &str,
    relation_type: RelationType,
    description: Option<String>,
) -> Result<RelateResult> {
    let mut ontology = Ontology::open(root)?;
    let source_id = require(&ontology, source)?.id;
    let target_id = parse_id(target)?;
    if source_id == target_id {
        return Err(Error::Validation(format!("{} cannot relate to itself", source_id)));
    }
    let target = target_id.to_string();
    let target_exists = ontology.index().contains(&target_id);
    if !target_exists {
        warn!(source = %source_id, target = %target, "relating to a missing entity");
    }

    let added = ontology.update(&source_id, |e| {
        e.add_relation(target.clone(), relation_type, description)
    })?;
    if added {
        ontology.save(&source_id)?;
    }
    Ok(RelateResult {
        source: source_id,
        target,
        relation_type,
        added,
        target_exists,
    })
}

#[derive(Serialize)]
pub struct UnrelateResult {
    pub source: EntityId,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<RelationType>,
    pub removed: bool,
}

impl Output for UnrelateResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.removed {
            format!("Removed relation {} -> {}", self.source, self.target)
        } else {
            format!("No matching relation {} -> {}", self.source, self.target)
        }
    }
}

/// Remove relations from `source` to `target`; all types unless one is given.
/// The target string is matched as written, so broken links can be removed.
pub fn unrelate(
    root: &Path,
    source: &str,
    target: &str,
    relation_type: Option<RelationType>,
) -> Result<UnrelateResult> {
    let mut ontology = Ontology::open(root)?;
    let source_id = require(&ontology, source)?.id;
    let target = target.trim().to_string();
    let removed = ontology.update(&source_id, |e| e.remove_relation(&target, relation_type))?;
    if removed {
        ontology.save(&source_id)?;
    }
    Ok(UnrelateResult {
        source: source_id,
        target,
        relation_type,
        removed,
    })
}

// === approve ===

#[derive(Serialize)]
pub struct ApproveResult {
    pub id: EntityId,
    pub status: ConceptStatus,
    pub changed: bool,
    /// Definition or purpose still holds a placeholder
    pub incomplete: bool,
}

impl Output for ApproveResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = if self.changed {
            format!("Approved {}", self.id)
        } else {
            format!("{} is already approved", self.id)
        };
        if self.incomplete {
            out.push_str("\nWarning: definition or purpose is still empty");
        }
        out
    }
}

pub fn approve(root: &Path, id: &str) -> Result<ApproveResult> {
    let mut ontology = Ontology::open(root)?;
    let entity = require(&ontology, id)?;
    let id = entity.id;
    if entity.kind() != EntityKind::Concept {
        return Err(not_a_concept(&id));
    }
    let changed = ontology.update(&id, |e| e.approve())?;
    if changed {
        ontology.save(&id)?;
    }
    let entity = ontology.get(&id)?;
    Ok(ApproveResult {
        id,
        status: entity.status().unwrap_or(ConceptStatus::Approved),
        changed,
        incomplete: !entity.is_filled(),
    })
}

// === remove ===

#[derive(Serialize)]
pub struct RemoveResult {
    pub id: EntityId,
    pub name: String,
    /// Entities whose relations now point at nothing
    pub referenced_by: Vec<EntityId>,
}

impl Output for RemoveResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Removed {} {}", self.id, self.name);
        if !self.referenced_by.is_empty() {
            let ids: Vec<String> = self.referenced_by.iter().map(|i| i.to_string()).collect();
            let _ = write!(
                out,
                "\nWarning: still referenced by {}; run `ontology fix-relations --apply`",
                ids.join(", ")
            );
        }
        out
    }
}

pub fn remove(root: &Path, id: &str) -> Result<RemoveResult> {
    let mut ontology = Ontology::open(root)?;
    let id = parse_id(id)?;
    let removed = ontology.remove_entity(&id)?;
    let target = id.to_string();
    let referenced_by = ontology
        .index()
        .iter()
        .filter(|e| e.has_relation(&target, None))
        .map(|e| e.id)
        .collect();
    Ok(RemoveResult {
        id,
        name: removed.name,
        referenced_by,
    })
}
