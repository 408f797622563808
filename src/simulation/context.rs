//! Per-tick update context handed to states, hooks and behaviors
//!
//! Replaces process-wide singletons: everything a per-entity update may touch
//! besides the entity itself is borrowed here for the duration of one tick.

use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{EntityId, SimTime, Tick, Vec2};
use crate::entity::{EntityPatch, EntityStore, EntityType};
use crate::simulation::diplomacy::Diplomacy;
use crate::simulation::environment::Environment;
use crate::simulation::notifications::{NotificationKind, NotificationLog};
use crate::spatial::bounds::WorldBounds;

pub struct UpdateContext<'a> {
    /// Simulation time at the end of this step
    pub now: SimTime,
    pub delta_ms: f64,
    pub tick: Tick,
    pub config: &'a SimulationConfig,
    pub bounds: WorldBounds,
    /// Every entity except the one being updated
    pub entities: &'a mut EntityStore,
    pub environment: &'a mut Environment,
    pub notifications: &'a mut NotificationLog,
    pub diplomacy: &'a mut Diplomacy,
    pub rng: &'a mut ChaCha8Rng,
}

impl<'a> UpdateContext<'a> {
    /// Step length in seconds
    #[inline]
    pub fn dt(&self) -> f32 {
        (self.delta_ms / 1000.0) as f32
    }

    pub fn notify(&mut self, kind: NotificationKind, message: impl Into<String>, position: Vec2) {
        self.notifications.push(
            kind,
            message,
            position,
            self.now,
            self.config.notifications.duration_ms,
        );
    }

    /// Create an entity mid-tick; failures are logged, never propagated
    pub fn spawn(&mut self, kind: EntityType, patch: EntityPatch) -> Option<EntityId> {
        match self.entities.create(kind, patch, self.config) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("failed to spawn {:?}: {}", kind, e);
                None
            }
        }
    }
}

/// Narrower context for interaction rules, which receive both entities
/// of a pair directly
pub struct InteractionContext<'a> {
    pub now: SimTime,
    pub delta_ms: f64,
    pub tick: Tick,
    pub config: &'a SimulationConfig,
    pub bounds: WorldBounds,
    pub notifications: &'a mut NotificationLog,
    pub rng: &'a mut ChaCha8Rng,
}

impl<'a> InteractionContext<'a> {
    #[inline]
    pub fn dt(&self) -> f32 {
        (self.delta_ms / 1000.0) as f32
    }

    pub fn notify(&mut self, kind: NotificationKind, message: impl Into<String>, position: Vec2) {
        self.notifications.push(
            kind,
            message,
            position,
            self.now,
            self.config.notifications.duration_ms,
        );
    }
}
