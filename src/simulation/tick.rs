//! World update orchestrator
//!
//! One call to `advance_world` is one fixed step:
//! interactions -> per-entity physics + FSM/behavior tree + post-update
//! hooks -> lifecycle sweep -> environment -> spawner -> notification expiry.

use serde::Serialize;

use crate::ai::Brains;
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{EntityId, Vec2};
use crate::entity::kinds::{LionAction, Target};
use crate::entity::{Entity, EntityType};
use crate::fsm;
use crate::interaction::InteractionRegistry;
use crate::simulation::lifecycle;
use crate::simulation::physics;
use crate::simulation::setup;
use crate::simulation::spawner;
use crate::simulation::state::{
    GameOver, GameOverCause, GameVariant, GameWorldState, SimulationFlags,
};
use crate::simulation::vitals;

/// Things worth telling the embedding application about after a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimulationEvent {
    /// A mortal entity died and was replaced by carrion
    Died {
        id: EntityId,
        kind: EntityType,
        position: Vec2,
    },
    Spawned {
        id: EntityId,
        kind: EntityType,
    },
    /// A tribe leader died and `leader` took over
    Succession {
        previous: EntityId,
        leader: EntityId,
    },
    GameOver(GameOver),
}

/// Owns the world plus the stateless machinery that steps it
pub struct Simulation {
    pub state: GameWorldState,
    interactions: InteractionRegistry,
    brains: Brains,
}

impl Simulation {
    /// The lion chase game with the default preset
    pub fn chase(seed: u64) -> Result<Self> {
        let mut config = SimulationConfig::chase();
        config.world.seed = seed;
        Self::from_config(GameVariant::Chase, config)
    }

    /// The tribal survival game with the default preset
    pub fn tribal(seed: u64) -> Result<Self> {
        let mut config = SimulationConfig::tribal();
        config.world.seed = seed;
        Self::from_config(GameVariant::Tribal, config)
    }

    pub fn from_config(variant: GameVariant, config: SimulationConfig) -> Result<Self> {
        let state = setup::build(variant, config)?;
        Ok(Self::from_state(state))
    }

    /// Resume a world, e.g. one loaded from a JSON snapshot
    pub fn from_state(state: GameWorldState) -> Self {
        let interactions = InteractionRegistry::standard(&state.config);
        let brains = Brains::new(&state.config);
        Self {
            state,
            interactions,
            brains,
        }
    }

    pub fn state(&self) -> &GameWorldState {
        &self.state
    }

    pub fn player(&self) -> Option<&Entity> {
        self.state.player.and_then(|id| self.state.entities.get(id))
    }

    /// Rebuild the initial world from the current variant and seed
    ///
    /// Flags set by the embedding application survive the restart.
    pub fn restart(&mut self) -> Result<()> {
        let flags = self.state.flags;
        let mut state = setup::build(self.state.variant, self.state.config.clone())?;
        state.flags = flags;
        tracing::info!("restarting {:?} game", state.variant);
        *self = Self::from_state(state);
        Ok(())
    }

    pub fn set_flags(&mut self, flags: SimulationFlags) {
        self.state.flags = flags;
    }

    /// Point a lion at a position and/or entity; `None` clears the target
    pub fn set_lion_target(&mut self, id: EntityId, target: Option<Target>) -> Result<()> {
        let entity = self
            .state
            .entities
            .get_mut(id)
            .ok_or(SimError::EntityNotFound(id))?;
        let actual = entity.entity_type();
        let lion = entity.as_lion_mut().ok_or(SimError::WrongEntityKind {
            id,
            expected: EntityType::Lion,
            actual,
        })?;
        lion.target = target;
        Ok(())
    }

    pub fn set_lion_action(&mut self, id: EntityId, action: Option<LionAction>) -> Result<()> {
        let entity = self
            .state
            .entities
            .get_mut(id)
            .ok_or(SimError::EntityNotFound(id))?;
        let actual = entity.entity_type();
        let lion = entity.as_lion_mut().ok_or(SimError::WrongEntityKind {
            id,
            expected: EntityType::Lion,
            actual,
        })?;
        lion.action = action;
        Ok(())
    }

    /// Advance the world by `delta_ms` of simulation time
    ///
    /// Paused or finished worlds and non-positive steps are left untouched.
    pub fn advance_world(&mut self, delta_ms: f64) -> Vec<SimulationEvent> {
        let mut events = Vec::new();
        if self.state.flags.paused || self.state.is_over() {
            tracing::debug!("step skipped: paused or game over");
            return events;
        }
        if !(delta_ms > 0.0 && delta_ms.is_finite()) {
            tracing::debug!("step skipped: delta {} ms", delta_ms);
            return events;
        }

        self.state.time_ms += delta_ms;
        self.state.tick += 1;
        let dt = (delta_ms / 1000.0) as f32;

        let (entities, mut ictx) = self.state.interaction_parts(delta_ms);
        self.interactions.resolve(entities, &mut ictx);

        for id in self.state.entities.ids() {
            self.update_entity(id, delta_ms, dt);
        }

        let cause = self.game_over_cause();
        lifecycle::sweep(&mut self.state, &mut events);
        self.state
            .environment
            .regenerate(&self.state.config.environment, dt);
        spawner::run(&mut self.state, &mut events);
        self.state.notifications.expire(self.state.time_ms);

        if let Some(cause) = cause {
            let over = GameOver {
                cause,
                survived_ms: self.state.time_ms,
                tick: self.state.tick,
            };
            tracing::info!(
                "game over at tick {}: {:?} after {:.1}s",
                over.tick,
                over.cause,
                over.survived_ms / 1000.0
            );
            self.state.game_over = Some(over);
            events.push(SimulationEvent::GameOver(over));
        }

        tracing::debug!(
            "tick {} done: {} entities, {} events",
            self.state.tick,
            self.state.entities.len(),
            events.len()
        );
        events
    }

    /// Physics, then the entity's FSM or behavior tree, then its hooks
    fn update_entity(&mut self, id: EntityId, delta_ms: f64, dt: f32) {
        let Some(mut entity) = self.state.entities.take(id) else {
            return;
        };

        let result = physics::integrate(
            &mut entity,
            &self.state.config.physics,
            &self.state.bounds,
            self.state.time_ms,
            dt,
        );
        if result.recovered {
            tracing::warn!(
                "{:?} {:?} had a non-finite position or velocity and was reset",
                entity.entity_type(),
                id
            );
        }

        {
            let mut ctx = self.state.update_context(delta_ms);
            if entity.state.is_some() {
                fsm::update_entity(&mut entity, &mut ctx);
            } else {
                self.brains.think(&mut entity, &mut ctx);
            }
            vitals::post_update(&mut entity, &mut ctx);
        }

        self.state.entities.restore(entity);
    }

    fn game_over_cause(&self) -> Option<GameOverCause> {
        match self.state.variant {
            GameVariant::Chase => {
                let player = self.state.player?;
                match self.state.entities.get(player).and_then(|e| e.as_lion()) {
                    None => Some(GameOverCause::KilledByHunters),
                    Some(lion) if lion.health <= 0.0 => Some(GameOverCause::KilledByHunters),
                    Some(lion) if lion.hunger <= 0.0 => Some(GameOverCause::Starvation),
                    Some(_) => None,
                }
            }
            GameVariant::Tribal => {
                let alive = self
                    .state
                    .entities
                    .of_type(EntityType::Human)
                    .any(|e| !e.is_dead());
                (!alive).then_some(GameOverCause::TribesExtinct)
            }
        }
    }
}
