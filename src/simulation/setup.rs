//! Initial world construction for both games

use rand::Rng;
use std::f32::consts::TAU;

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{EntityId, Vec2};
use crate::entity::kinds::{AgentData, Gender, LionData};
use crate::entity::{EntityData, EntityPatch, EntityType};
use crate::simulation::environment::Environment;
use crate::simulation::spawner;
use crate::simulation::state::{GameVariant, GameWorldState};

/// Build a populated world; the seed comes from `config.world.seed`
pub fn build(variant: GameVariant, config: SimulationConfig) -> Result<GameWorldState> {
    config.validate()?;
    let mut state = GameWorldState::empty(variant, config);
    state.environment = Environment::generate(&state.config.environment, &state.bounds, &mut state.rng);

    match variant {
        GameVariant::Chase => populate_chase(&mut state)?,
        GameVariant::Tribal => populate_tribal(&mut state)?,
    }
    state.flags.spawning = true;

    tracing::info!(
        "built {:?} world: {} entities, {} sectors, seed {}",
        variant,
        state.entities.len(),
        state.environment.sectors.len(),
        state.config.world.seed
    );
    Ok(state)
}

fn populate_chase(state: &mut GameWorldState) -> Result<()> {
    let mut lion = LionData::new(&state.config);
    lion.is_player = true;
    let player = state.spawn(
        EntityType::Lion,
        EntityPatch::at(state.bounds.center()).with_data(EntityData::Lion(lion)),
    )?;
    state.player = Some(player);

    for _ in 0..state.config.spawner.initial_prey {
        spawner::spawn_prey(state)?;
    }
    for _ in 0..state.config.spawner.initial_hunters {
        spawner::spawn_hunter(state)?;
    }
    Ok(())
}

fn populate_tribal(state: &mut GameWorldState) -> Result<()> {
    for _ in 0..state.config.tribe.initial_tribes {
        found_tribe(state)?;
    }
    for _ in 0..state.config.predator.initial_count {
        let position = state.bounds.random_point(&mut state.rng);
        state.spawn(EntityType::Predator, EntityPatch::at(position))?;
    }
    Ok(())
}

/// A point away from the world edge
fn inland_point(state: &mut GameWorldState) -> Vec2 {
    let margin_x = state.bounds.width * 0.15;
    let margin_y = state.bounds.height * 0.15;
    Vec2::new(
        state.rng.gen_range(margin_x..state.bounds.width - margin_x),
        state.rng.gen_range(margin_y..state.bounds.height - margin_y),
    )
}

fn spawn_human(
    state: &mut GameWorldState,
    center: Vec2,
    age: f32,
    gender: Gender,
    leader: Option<EntityId>,
    parent: Option<EntityId>,
) -> Result<EntityId> {
    let mut agent = AgentData::new(state.config.tribe.max_health, age, gender);
    agent.leader = leader;
    agent.parent = parent;
    let offset = Vec2::from_angle(state.rng.gen_range(0.0..TAU)) * state.rng.gen_range(0.0..40.0);
    let position = state.bounds.contain_point(center + offset);
    state.spawn(
        EntityType::Human,
        EntityPatch::at(position).with_data(EntityData::Human(agent)),
    )
}

/// A leader plus couples with children until the tribe is full
///
/// Children point at their mother through `parent`, so family trees are
/// visible to the split behavior from the first tick.
fn found_tribe(state: &mut GameWorldState) -> Result<EntityId> {
    let center = inland_point(state);
    let size = state.config.tribe.initial_size.max(1) as usize;

    let leader_age = state.rng.gen_range(30.0..45.0);
    let leader = spawn_human(state, center, leader_age, Gender::Male, None, None)?;
    if let Some(agent) = state.entities.get_mut(leader).and_then(|e| e.as_agent_mut()) {
        agent.leader = Some(leader);
    }

    let mut members = 1;
    let mut oldest_adult: Option<(EntityId, f32)> = None;
    while members < size {
        let mother_age = state.rng.gen_range(20.0..40.0);
        let mother = spawn_human(state, center, mother_age, Gender::Female, Some(leader), None)?;
        members += 1;
        if oldest_adult.map_or(true, |(_, age)| mother_age > age) {
            oldest_adult = Some((mother, mother_age));
        }

        if members < size {
            let father_age = state.rng.gen_range(20.0..40.0);
            let father = spawn_human(state, center, father_age, Gender::Male, Some(leader), None)?;
            members += 1;
            if oldest_adult.map_or(true, |(_, age)| father_age > age) {
                oldest_adult = Some((father, father_age));
            }
        }

        let children = state.rng.gen_range(0..=2);
        for _ in 0..children {
            if members >= size {
                break;
            }
            let age = state.rng.gen_range(0.0..12.0);
            let gender = Gender::random(&mut state.rng);
            spawn_human(state, center, age, gender, Some(leader), Some(mother))?;
            members += 1;
        }
    }

    if let Some(agent) = state.entities.get_mut(leader).and_then(|e| e.as_agent_mut()) {
        agent.heir = oldest_adult.map(|(id, _)| id);
    }
    tracing::debug!("tribe of {:?} founded with {} members", leader, members);
    Ok(leader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::lion;

    #[test]
    fn test_chase_world_has_player_at_center() {
        let state = build(GameVariant::Chase, SimulationConfig::chase()).unwrap();
        let player = state.player.and_then(|id| state.entities.get(id)).unwrap();
        assert!(player.as_lion().unwrap().is_player);
        assert_eq!(player.position, state.bounds.center());
        assert_eq!(player.state_id(), Some(lion::IDLE));
        assert_eq!(
            state.entities.count(EntityType::Prey),
            state.config.spawner.initial_prey as usize
        );
        assert!(!state.environment.sectors.is_empty());
        assert!(state.flags.spawning);
    }

    #[test]
    fn test_tribal_world_has_led_tribes() {
        let state = build(GameVariant::Tribal, SimulationConfig::tribal()).unwrap();
        let config = &state.config;
        assert_eq!(
            state.entities.count(EntityType::Human),
            (config.tribe.initial_tribes * config.tribe.initial_size) as usize
        );
        let leaders: Vec<_> = state
            .entities
            .of_type(EntityType::Human)
            .filter(|e| e.as_agent().is_some_and(|a| a.is_leader(e.id)))
            .collect();
        assert_eq!(leaders.len(), config.tribe.initial_tribes as usize);
        for leader in leaders {
            let heir = leader.as_agent().unwrap().heir.unwrap();
            let heir_agent = state.entities.get(heir).unwrap().as_agent().unwrap();
            assert_eq!(heir_agent.leader, Some(leader.id));
        }
        assert_eq!(
            state.entities.count(EntityType::Predator),
            config.predator.initial_count as usize
        );
    }

    #[test]
    fn test_same_seed_same_world() {
        let a = build(GameVariant::Tribal, SimulationConfig::tribal()).unwrap();
        let b = build(GameVariant::Tribal, SimulationConfig::tribal()).unwrap();
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }
}
