//! Typed key/value scratch storage
//!
//! Values are stored as JSON so the map is heterogeneous and still
//! round-trips through any serde format. Call sites get typed access via
//! `get::<T>` / `set`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scratch {
    entries: BTreeMap<String, Value>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value; a missing key or a value of another type reads as `None`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!("scratch key '{}' has unexpected type: {}", key, e);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(v) => {
                self.entries.insert(key, v);
            }
            Err(e) => tracing::warn!("scratch key '{}' could not be stored: {}", key, e),
        }
    }

    pub fn with<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Self {
        self.set(key, value);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every key under `scope/`
    pub fn clear_scope(&mut self, scope: &str) -> usize {
        let prefix = format!("{}/", scope);
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(&prefix));
        before - self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
