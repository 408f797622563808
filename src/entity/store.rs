//! Entity store - single owner of every simulation entity
//!
//! Ids come from a monotonic counter and are never reused. Entities are kept
//! in a `BTreeMap` keyed by id, so enumeration order is creation order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::EntityId;
use crate::entity::{Entity, EntityData, EntityPatch, EntityType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoreRecord", into = "StoreRecord")]
pub struct EntityStore {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u64,
}

/// Serialized form: entities as a list plus the id counter
#[derive(Serialize, Deserialize)]
struct StoreRecord {
    next_id: u64,
    entities: Vec<Entity>,
}

impl From<StoreRecord> for EntityStore {
    fn from(record: StoreRecord) -> Self {
        let entities: BTreeMap<EntityId, Entity> =
            record.entities.into_iter().map(|e| (e.id, e)).collect();
        // Never hand out an id that is already present
        let floor = entities.keys().next_back().map_or(0, |id| id.0 + 1);
        Self {
            entities,
            next_id: record.next_id.max(floor),
        }
    }
}

impl From<EntityStore> for StoreRecord {
    fn from(store: EntityStore) -> Self {
        Self {
            next_id: store.next_id,
            entities: store.entities.into_values().collect(),
        }
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity with type defaults overlaid by `patch`
    pub fn create(
        &mut self,
        kind: EntityType,
        patch: EntityPatch,
        config: &SimulationConfig,
    ) -> Result<EntityId> {
        let id = EntityId(self.next_id);
        let mut entity = Entity::new(id, EntityData::defaults(kind, config));
        patch.apply(&mut entity)?;
        self.next_id += 1;
        self.entities.insert(id, entity);
        tracing::debug!("created {:?} {:?}", kind, id);
        Ok(id)
    }

    pub fn update(&mut self, id: EntityId, patch: EntityPatch) -> Result<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SimError::EntityNotFound(id))?;
        patch.apply(entity)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Snapshot of current ids in enumeration order
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn query<P>(&self, predicate: P) -> Vec<&Entity>
    where
        P: Fn(&Entity) -> bool,
    {
        self.entities.values().filter(|e| predicate(e)).collect()
    }

    pub fn of_type(&self, kind: EntityType) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(move |e| e.is(kind))
    }

    pub fn count(&self, kind: EntityType) -> usize {
        self.of_type(kind).count()
    }

    /// Remove an entity for exclusive mutation; pair with `restore`
    ///
    /// Lets per-entity update code hold `&mut Entity` and `&mut EntityStore`
    /// (everyone else) at the same time.
    pub fn take(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn restore(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    /// Mutable access to two distinct entities at once
    ///
    /// Returns `None` if `a == b` or either id is missing.
    pub fn with_pair<R>(
        &mut self,
        a: EntityId,
        b: EntityId,
        f: impl FnOnce(&mut Entity, &mut Entity) -> R,
    ) -> Option<R> {
        if a == b {
            return None;
        }
        let mut second = self.entities.remove(&b)?;
        let result = self.entities.get_mut(&a).map(|first| f(first, &mut second));
        self.entities.insert(b, second);
        result
    }
}
