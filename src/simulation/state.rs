//! Complete world state
//!
//! `GameWorldState` is everything a renderer reads after a step and
//! everything a save would need: entities (blackboards and FSM cursors
//! included), sectors, notifications, clock, flags and the RNG position.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{EntityId, SimTime, Tick};
use crate::entity::{EntityPatch, EntityStore, EntityType};
use crate::fsm::{self, StateCursor};
use crate::simulation::context::{InteractionContext, UpdateContext};
use crate::simulation::diplomacy::Diplomacy;
use crate::simulation::environment::Environment;
use crate::simulation::notifications::NotificationLog;
use crate::spatial::bounds::WorldBounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameVariant {
    /// Player lion, prey and hunters in a wrap-around savanna
    #[default]
    Chase,
    /// Tribes of humans and roaming predators in a walled valley
    Tribal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverCause {
    Starvation,
    KilledByHunters,
    TribesExtinct,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameOver {
    pub cause: GameOverCause,
    pub survived_ms: SimTime,
    pub tick: Tick,
}

/// Process-wide toggles owned by the embedding application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationFlags {
    pub paused: bool,
    pub spawning: bool,
}

impl Default for SimulationFlags {
    fn default() -> Self {
        Self {
            paused: false,
            spawning: true,
        }
    }
}

/// Timestamps of the last periodic spawns
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnerState {
    pub last_prey_at: SimTime,
    pub last_hunter_at: SimTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameWorldState {
    pub variant: GameVariant,
    pub config: SimulationConfig,
    pub bounds: WorldBounds,
    pub entities: EntityStore,
    pub environment: Environment,
    pub notifications: NotificationLog,
    pub diplomacy: Diplomacy,
    pub time_ms: SimTime,
    pub tick: Tick,
    pub game_over: Option<GameOver>,
    pub flags: SimulationFlags,
    pub spawner: SpawnerState,
    /// The player-controlled lion in the chase game
    pub player: Option<EntityId>,
    pub rng: ChaCha8Rng,
}

impl GameWorldState {
    /// A world with no entities, no sectors and spawning disabled
    pub fn empty(variant: GameVariant, config: SimulationConfig) -> Self {
        let bounds = WorldBounds::new(config.world.width, config.world.height, config.world.boundary);
        let rng = ChaCha8Rng::seed_from_u64(config.world.seed);
        Self {
            variant,
            config,
            bounds,
            entities: EntityStore::new(),
            environment: Environment::default(),
            notifications: NotificationLog::new(),
            diplomacy: Diplomacy::new(),
            time_ms: 0.0,
            tick: 0,
            game_over: None,
            flags: SimulationFlags {
                paused: false,
                spawning: false,
            },
            spawner: SpawnerState::default(),
            player: None,
            rng,
        }
    }

    /// Create an entity, starting it in its kind's initial FSM state
    pub fn spawn(&mut self, kind: EntityType, patch: EntityPatch) -> Result<EntityId> {
        let patch = match (patch.state.is_none(), fsm::initial_state(kind)) {
            (true, Some(initial)) => patch.with_state(StateCursor::new(initial, self.time_ms)),
            _ => patch,
        };
        self.entities.create(kind, patch, &self.config)
    }

    /// Borrow the world for a per-entity update at the current clock
    pub fn update_context(&mut self, delta_ms: f64) -> UpdateContext<'_> {
        UpdateContext {
            now: self.time_ms,
            delta_ms,
            tick: self.tick,
            config: &self.config,
            bounds: self.bounds,
            entities: &mut self.entities,
            environment: &mut self.environment,
            notifications: &mut self.notifications,
            diplomacy: &mut self.diplomacy,
            rng: &mut self.rng,
        }
    }

    /// Split borrow for interaction resolution: the store plus a context
    pub fn interaction_parts(&mut self, delta_ms: f64) -> (&mut EntityStore, InteractionContext<'_>) {
        let ctx = InteractionContext {
            now: self.time_ms,
            delta_ms,
            tick: self.tick,
            config: &self.config,
            bounds: self.bounds,
            notifications: &mut self.notifications,
            rng: &mut self.rng,
        };
        (&mut self.entities, ctx)
    }

    pub fn is_over(&self) -> bool {
        self.game_over.is_some()
    }

    pub fn population(&self) -> BTreeMap<EntityType, usize> {
        let mut counts: BTreeMap<EntityType, usize> =
            EntityType::ALL.iter().map(|k| (*k, 0)).collect();
        for entity in self.entities.iter() {
            *counts.entry(entity.entity_type()).or_default() += 1;
        }
        counts
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let state: Self = serde_json::from_str(json)?;
        state.config.validate()?;
        Ok(state)
    }
}
