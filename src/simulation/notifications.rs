//! Transient event records for UI overlays
//!
//! Write-only from the simulation's point of view: rules emit them, nothing
//! in the engine reads them back.

use serde::{Deserialize, Serialize};

use crate::core::types::{SimTime, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Hit,
    Miss,
    Damage,
    Death,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub position: Vec2,
    pub created_at: SimTime,
    pub duration_ms: f64,
}

impl Notification {
    pub fn is_expired(&self, now: SimTime) -> bool {
        now - self.created_at >= self.duration_ms
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationLog {
    items: Vec<Notification>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        position: Vec2,
        created_at: SimTime,
        duration_ms: f64,
    ) {
        self.items.push(Notification {
            kind,
            message: message.into(),
            position,
            created_at,
            duration_ms,
        });
    }

    /// Drop notifications older than their duration
    pub fn expire(&mut self, now: SimTime) -> usize {
        let before = self.items.len();
        self.items.retain(|n| !n.is_expired(now));
        before - self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.items.iter().filter(|n| n.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
