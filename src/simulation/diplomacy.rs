//! Relations between tribes, keyed by their leaders

use serde::{Deserialize, Serialize};

use crate::core::types::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    #[default]
    Neutral,
    Hostile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub a: EntityId,
    pub b: EntityId,
    pub relation: Relation,
}

/// Symmetric relation table; unknown pairs are neutral
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diplomacy {
    records: Vec<RelationRecord>,
}

fn ordered(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Diplomacy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relation(&self, a: EntityId, b: EntityId) -> Relation {
        let (a, b) = ordered(a, b);
        self.records
            .iter()
            .find(|r| r.a == a && r.b == b)
            .map_or(Relation::Neutral, |r| r.relation)
    }

    pub fn set(&mut self, a: EntityId, b: EntityId, relation: Relation) {
        if a == b {
            return;
        }
        let (a, b) = ordered(a, b);
        match self.records.iter_mut().find(|r| r.a == a && r.b == b) {
            Some(existing) => existing.relation = relation,
            None => self.records.push(RelationRecord { a, b, relation }),
        }
    }

    /// Hand a dead leader's relations to their successor
    pub fn transfer(&mut self, from: EntityId, to: EntityId) {
        let moved: Vec<(EntityId, Relation)> = self
            .records
            .iter()
            .filter_map(|r| {
                if r.a == from {
                    Some((r.b, r.relation))
                } else if r.b == from {
                    Some((r.a, r.relation))
                } else {
                    None
                }
            })
            .collect();
        self.forget(from);
        for (other, relation) in moved {
            self.set(to, other, relation);
        }
    }

    /// Remove every relation involving `leader`
    pub fn forget(&mut self, leader: EntityId) {
        self.records.retain(|r| r.a != leader && r.b != leader);
    }

    pub fn hostile_pairs(&self) -> impl Iterator<Item = (EntityId, EntityId)> + '_ {
        self.records
            .iter()
            .filter(|r| r.relation == Relation::Hostile)
            .map(|r| (r.a, r.b))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
