//! The ontology: storage, index and the relation checks built on them.

use crate::index::OntologyIndex;
use crate::models::graph::RelationGraph;
use crate::models::{ConceptStatus, Entity, EntityId, EntityKind, RelationType};
use crate::storage::{LoadFailure, Storage};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A relation whose target is not in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenLink {
    pub source: EntityId,
    pub target: String,
    pub relation_type: RelationType,
    pub reason: String,
}

/// Outcome of [`Ontology::fix_relations`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixReport {
    /// Broken relations found
    pub broken: usize,
    /// Relations actually removed; zero on a dry run
    pub removed: usize,
    pub dry_run: bool,
    /// Entities whose relation lists changed
    pub touched: Vec<EntityId>,
}

/// Aggregate health counts for the whole ontology.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub total_objects: usize,
    pub by_prefix: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub broken_links: usize,
    pub isolated_nodes: usize,
    pub edges: usize,
    pub components: usize,
    pub load_failures: usize,
    /// The broken links counted above
    pub broken: Vec<BrokenLink>,
}

/// A loaded ontology.
///
/// Holds the storage handle and owns the index of every entity that decoded
/// successfully. Mutations go through the index; persisting them is an
/// explicit [`Ontology::save`].
#[derive(Debug)]
pub struct Ontology {
    storage: Storage,
    index: OntologyIndex,
    load_failures: Vec<LoadFailure>,
}

impl Ontology {
    /// Open the ontology at `root` and load every entity.
    pub fn open(root: &Path) -> Result<Self> {
        Self::load(Storage::open(root)?)
    }

    /// Load every entity from `storage` into a fresh index.
    ///
    /// Files that fail to decode, or repeat an ID already loaded, are kept
    /// as load failures rather than aborting the load.
    pub fn load(storage: Storage) -> Result<Self> {
        let report = storage.load_all()?;
        let mut index = OntologyIndex::new();
        let mut load_failures = report.failures;

        for (path, entity) in report.entities {
            let id = entity.id;
            if let Err(e) = index.add(entity) {
                tracing::warn!(path = %path.display(), id = %id, "skipping duplicate entity");
                load_failures.push(LoadFailure {
                    path,
                    reason: e.to_string(),
                });
            }
        }

        info!(
            loaded = index.len(),
            failed = load_failures.len(),
            "ontology loaded from {}",
            storage.root().display()
        );
        Ok(Self {
            storage,
            index,
            load_failures,
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn root(&self) -> &Path {
        self.storage.root()
    }

    pub fn index(&self) -> &OntologyIndex {
        &self.index
    }

    pub fn load_failures(&self) -> &[LoadFailure] {
        &self.load_failures
    }

    /// Look up an entity, failing with `NotFound`.
    pub fn get(&self, id: &EntityId) -> Result<&Entity> {
        self.index
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn next_id(&self, kind: EntityKind) -> EntityId {
        self.index.next_id(kind)
    }

    /// Create a draft entity and add it to the index.
    ///
    /// Without an explicit ID the next free ID for `kind` is allocated.
    pub fn create_entity(
        &mut self,
        kind: EntityKind,
        name: &str,
        id: Option<EntityId>,
    ) -> Result<&Entity> {
        let id = id.unwrap_or_else(|| self.index.next_id(kind));
        if id.kind != kind {
            return Err(Error::Validation(format!("ID {} does not belong to a {}", id, kind)));
        }
        self.add_entity(Entity::create(kind, name, id)?)?;
        self.get(&id)
    }

    /// Add an already built entity to the index.
    pub fn add_entity(&mut self, entity: Entity) -> Result<()> {
        debug!(id = %entity.id, name = %entity.name, "adding entity");
        self.index.add(entity)
    }

    /// Mutate an entity in place.
    pub fn update<T>(&mut self, id: &EntityId, f: impl FnOnce(&mut Entity) -> T) -> Result<T> {
        self.index.update(id, f)
    }

    /// Remove an entity from the index and delete its file.
    ///
    /// Relations pointing at the removed entity are left alone; they show up
    /// as broken links until fixed.
    pub fn remove_entity(&mut self, id: &EntityId) -> Result<Entity> {
        let entity = self
            .index
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        match self.storage.delete(id) {
            Ok(_) | Err(Error::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        Ok(entity)
    }

    /// Write an entity to disk, replacing its previous file.
    pub fn save(&self, id: &EntityId) -> Result<PathBuf> {
        self.storage.save(self.get(id)?, true)
    }

    /// Write a new entity to disk, failing if a file for its ID exists.
    pub fn save_new(&self, id: &EntityId) -> Result<PathBuf> {
        self.storage.save(self.get(id)?, false)
    }

    /// Build the relation graph over the current index.
    pub fn graph(&self) -> RelationGraph {
        RelationGraph::build(&self.index)
    }

    /// Every relation whose target is absent from the index.
    ///
    /// Scans raw relation lists, so it sees exactly the relations the graph
    /// leaves out.
    pub fn validate(&self) -> Vec<BrokenLink> {
        let mut broken = Vec::new();
        for entity in self.index.iter() {
            for relation in &entity.relations {
                if !self.index.contains_str(&relation.target) {
                    broken.push(BrokenLink {
                        source: entity.id,
                        target: relation.target.clone(),
                        relation_type: relation.relation_type,
                        reason: format!("target {} not found", relation.target),
                    });
                }
            }
        }
        broken
    }

    /// Count broken relations and, unless `dry_run`, remove them.
    ///
    /// Only the index is changed; persist the touched entities with
    /// [`Ontology::save`].
    pub fn fix_relations(&mut self, dry_run: bool) -> Result<FixReport> {
        let broken = self.validate();
        let mut report = FixReport {
            broken: broken.len(),
            removed: 0,
            dry_run,
            touched: Vec::new(),
        };
        if dry_run {
            return Ok(report);
        }

        let mut touched = BTreeSet::new();
        for link in &broken {
            let removed = self.index.update(&link.source, |e| {
                let before = e.relations.len();
                e.remove_relation(&link.target, Some(link.relation_type));
                before - e.relations.len()
            })?;
            if removed > 0 {
                report.removed += removed;
                touched.insert(link.source);
            }
        }
        report.touched = touched.into_iter().collect();
        info!(removed = report.removed, "removed broken relations");
        Ok(report)
    }

    /// Entities within `depth` hops of `id`, in either direction.
    pub fn neighbors(&self, id: &EntityId, depth: usize) -> BTreeSet<EntityId> {
        self.graph().neighbors(id, depth)
    }

    /// Candidate relations for `id`: entities two hops away that are not
    /// already direct neighbors.
    pub fn suggest_relations(&self, id: &EntityId, max: usize) -> Vec<EntityId> {
        let graph = self.graph();
        let direct = graph.neighbors(id, 1);
        graph
            .neighbors(id, 2)
            .into_iter()
            .filter(|candidate| !direct.contains(candidate))
            .take(max)
            .collect()
    }

    /// Aggregate counts over the index and graph.
    pub fn audit(&self) -> AuditReport {
        let graph = self.graph();
        let broken = self.validate();

        let by_prefix = EntityKind::all()
            .iter()
            .map(|kind| (kind.prefix().to_string(), self.index.count_kind(*kind)))
            .collect();
        let by_status = ConceptStatus::all()
            .iter()
            .map(|status| (status.as_str().to_string(), self.index.count_status(*status)))
            .collect();

        AuditReport {
            total_objects: self.index.len(),
            by_prefix,
            by_status,
            broken_links: broken.len(),
            isolated_nodes: graph.isolated_nodes().len(),
            edges: graph.edge_count(),
            components: graph.components().len(),
            load_failures: self.load_failures.len(),
            broken,
        }
    }
}
