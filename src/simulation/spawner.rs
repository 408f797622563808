//! Periodic prey and hunter spawning for the chase game

use rand::Rng;
use std::f32::consts::TAU;

use crate::core::error::Result;
use crate::core::types::EntityId;
use crate::entity::kinds::HunterData;
use crate::entity::{EntityData, EntityPatch, EntityType};
use crate::simulation::state::{GameVariant, GameWorldState};
use crate::simulation::tick::SimulationEvent;

/// Spawn whatever is due; each timer restarts whether or not the cap
/// allowed a spawn
pub fn run(state: &mut GameWorldState, events: &mut Vec<SimulationEvent>) {
    if state.variant != GameVariant::Chase || !state.flags.spawning {
        return;
    }
    let now = state.time_ms;
    let config = state.config.spawner.clone();

    if now - state.spawner.last_prey_at >= config.prey_interval_ms {
        state.spawner.last_prey_at = now;
        if state.entities.count(EntityType::Prey) < config.prey_cap {
            record(spawn_prey(state), EntityType::Prey, events);
        }
    }
    if now - state.spawner.last_hunter_at >= config.hunter_interval_ms {
        state.spawner.last_hunter_at = now;
        if state.entities.count(EntityType::Hunter) < config.hunter_cap {
            record(spawn_hunter(state), EntityType::Hunter, events);
        }
    }
}

fn record(result: Result<EntityId>, kind: EntityType, events: &mut Vec<SimulationEvent>) {
    match result {
        Ok(id) => {
            tracing::debug!("spawned {:?} {:?}", kind, id);
            events.push(SimulationEvent::Spawned { id, kind });
        }
        Err(e) => tracing::warn!("spawning {:?} failed: {}", kind, e),
    }
}

/// A prey at a random spot, facing a random way
pub fn spawn_prey(state: &mut GameWorldState) -> Result<EntityId> {
    let position = state.bounds.random_point(&mut state.rng);
    let facing = state.rng.gen_range(0.0..TAU);
    state.spawn(EntityType::Prey, EntityPatch::at(position).facing(facing))
}

/// A hunter with a random looping patrol route starting where it stands
pub fn spawn_hunter(state: &mut GameWorldState) -> Result<EntityId> {
    let config = &state.config.spawner;
    let stops = state
        .rng
        .gen_range(config.patrol_points_min..=config.patrol_points_max);
    let patrol: Vec<_> = (0..stops)
        .map(|_| state.bounds.random_point(&mut state.rng))
        .collect();

    let mut hunter = HunterData::new(&state.config);
    let position = patrol.first().copied().unwrap_or_else(|| state.bounds.center());
    hunter.patrol = patrol;
    state.spawn(
        EntityType::Hunter,
        EntityPatch::at(position).with_data(EntityData::Hunter(hunter)),
    )
}
