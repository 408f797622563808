//! Per-agent behavior tree memory
//!
//! Keys are namespaced by convention: `cooldown/<label>` and `cache/<label>`
//! belong to the decorator nodes, `<scope>/...` to multi-tick actions that a
//! scoped sequence owns.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ai::behavior_tree::Status;
use crate::core::scratch::Scratch;
use crate::core::types::Tick;

/// A remembered child result and the tick it stops being valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResult {
    pub status: Status,
    pub expires_at: Tick,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blackboard {
    entries: Scratch,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.entries.get(key)
    }

    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        self.entries.set(key, value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key)
    }

    /// Drop everything a scoped action left behind
    pub fn clear_scope(&mut self, scope: &str) -> usize {
        self.entries.clear_scope(scope)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys()
    }

    pub fn last_entry(&self, label: &str) -> Option<Tick> {
        self.get(&cooldown_key(label))
    }

    pub fn record_entry(&mut self, label: &str, tick: Tick) {
        self.set(cooldown_key(label), tick);
    }

    /// Cached result for `label` if it is still valid at `tick`
    pub fn cached(&self, label: &str, tick: Tick) -> Option<Status> {
        self.get::<CachedResult>(&cache_key(label))
            .filter(|c| tick < c.expires_at)
            .map(|c| c.status)
    }

    pub fn store_cached(&mut self, label: &str, status: Status, expires_at: Tick) {
        self.set(cache_key(label), CachedResult { status, expires_at });
    }

    pub fn invalidate(&mut self, label: &str) -> bool {
        self.remove(&cache_key(label))
    }
}

fn cooldown_key(label: &str) -> String {
    format!("cooldown/{}", label)
}

fn cache_key(label: &str) -> String {
    format!("cache/{}", label)
}
