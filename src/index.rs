//! In-memory index over loaded entities.

use crate::models::{ConceptStatus, Entity, EntityId, EntityKind};
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Normalize a name for lookups: trim, lowercase, fold `ё` into `е`.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace('ё', "е")
}

/// Entities keyed by ID with secondary lookups by name, kind and status.
///
/// The index owns its entities. Secondary maps are kept in step on every
/// insert, removal and update.
#[derive(Debug, Clone, Default)]
pub struct OntologyIndex {
    by_id: BTreeMap<EntityId, Entity>,
    by_name: HashMap<String, Vec<EntityId>>,
    by_kind: BTreeMap<EntityKind, BTreeSet<EntityId>>,
    by_status: BTreeMap<ConceptStatus, BTreeSet<EntityId>>,
    /// Highest number ever seen per kind; never lowered on removal.
    high_water: BTreeMap<EntityKind, u32>,
}

impl OntologyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity. Fails if its ID is already present.
    pub fn add(&mut self, entity: Entity) -> Result<()> {
        if self.by_id.contains_key(&entity.id) {
            return Err(Error::DuplicateId(entity.id.to_string()));
        }
        let id = entity.id;
        self.link(&entity);
        let mark = self.high_water.entry(id.kind).or_insert(0);
        *mark = (*mark).max(id.number);
        self.by_id.insert(id, entity);
        Ok(())
    }

    /// Remove an entity and all of its secondary entries.
    pub fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        let entity = self.by_id.remove(id)?;
        self.unlink(&entity);
        Some(entity)
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.by_id.get(id)
    }

    /// Look up an entity by its textual ID, written exactly as it prints.
    pub fn get_str(&self, id: &str) -> Option<&Entity> {
        EntityId::parse_exact(id).and_then(|id| self.by_id.get(&id))
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Whether a relation target string resolves to an indexed entity.
    pub fn contains_str(&self, id: &str) -> bool {
        self.get_str(id).is_some()
    }

    /// Mutate an entity in place, keeping the secondary maps current.
    ///
    /// The closure must not change the entity's ID; if it does the change is
    /// rejected and the entity is left as it was before the call.
    pub fn update<T>(&mut self, id: &EntityId, f: impl FnOnce(&mut Entity) -> T) -> Result<T> {
        let mut entity = self
            .by_id
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.unlink(&entity);

        let original = entity.clone();
        let out = f(&mut entity);
        if entity.id != *id {
            self.link(&original);
            self.by_id.insert(*id, original);
            return Err(Error::Validation(format!(
                "{}: ID cannot be changed to {}",
                id, entity.id
            )));
        }

        self.link(&entity);
        self.by_id.insert(*id, entity);
        Ok(out)
    }

    /// Entities whose normalized name equals the normalized query.
    pub fn find_by_name(&self, name: &str) -> Vec<&Entity> {
        self.by_name
            .get(&normalize_name(name))
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// Entities of one kind, ordered by ID.
    pub fn by_kind(&self, kind: EntityKind) -> Vec<&Entity> {
        self.by_kind
            .get(&kind)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// Concepts in the given status, ordered by ID.
    pub fn by_status(&self, status: ConceptStatus) -> Vec<&Entity> {
        self.by_status
            .get(&status)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// All entities ordered by kind, then number.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.by_id.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.by_id.keys()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Number of entities of a kind.
    pub fn count_kind(&self, kind: EntityKind) -> usize {
        self.by_kind.get(&kind).map_or(0, BTreeSet::len)
    }

    /// Number of concepts in a status.
    pub fn count_status(&self, status: ConceptStatus) -> usize {
        self.by_status.get(&status).map_or(0, BTreeSet::len)
    }

    /// Next free ID for a kind: one past the highest number ever indexed.
    pub fn next_id(&self, kind: EntityKind) -> EntityId {
        let number = self.high_water.get(&kind).copied().unwrap_or(0) + 1;
        EntityId { kind, number }
    }

    /// Forget all entities and reset allocation counters.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn link(&mut self, entity: &Entity) {
        self.by_name
            .entry(normalize_name(&entity.name))
            .or_default()
            .push(entity.id);
        self.by_kind.entry(entity.kind()).or_default().insert(entity.id);
        if let Some(status) = entity.status() {
            self.by_status.entry(status).or_default().insert(entity.id);
        }
    }

    fn unlink(&mut self, entity: &Entity) {
        let key = normalize_name(&entity.name);
        if let Some(ids) = self.by_name.get_mut(&key) {
            ids.retain(|id| *id != entity.id);
            if ids.is_empty() {
                self.by_name.remove(&key);
            }
        }
        if let Some(ids) = self.by_kind.get_mut(&entity.kind()) {
            ids.remove(&entity.id);
        }
        if let Some(status) = entity.status() {
            if let Some(ids) = self.by_status.get_mut(&status) {
                ids.remove(&entity.id);
            }
        }
    }
}
