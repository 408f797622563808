//! Predator behavior tree: hunt when hungry, otherwise roam

use rand::Rng;
use std::f32::consts::TAU;

use crate::ai::behavior_tree::{BehaviorNode, Status};
use crate::ai::blackboard::Blackboard;
use crate::core::config::PredatorConfig;
use crate::core::error::Result;
use crate::core::types::EntityId;
use crate::entity::{Entity, EntityType};
use crate::fsm::steering;
use crate::simulation::context::UpdateContext;

pub const HUNT: &str = "hunt";
pub const HUNT_TARGET: &str = "hunt/target";

const ACQUIRE_PREY: &str = "acquire_prey";

/// Prey further than this multiple of the sense range is given up
const LOSE_FACTOR: f32 = 1.5;

pub fn predator_tree(config: &PredatorConfig) -> BehaviorNode {
    BehaviorNode::selector(vec![
        BehaviorNode::scoped(
            HUNT,
            vec![
                BehaviorNode::condition("hungry", hungry),
                BehaviorNode::caching(
                    ACQUIRE_PREY,
                    config.search_cache_ticks,
                    BehaviorNode::action(ACQUIRE_PREY, acquire_prey),
                ),
                BehaviorNode::action("chase", chase),
            ],
        ),
        BehaviorNode::cooldown(
            "roam",
            config.roam_cooldown_ticks,
            BehaviorNode::action("pick_heading", |entity, _, ctx| {
                entity.target_direction = ctx.rng.gen_range(0.0..TAU);
                entity.acceleration = ctx.config.predator.roam_acceleration;
                Ok(Status::Success)
            }),
        ),
        BehaviorNode::action("drift", |entity, _, ctx| {
            entity.acceleration = ctx.config.predator.roam_acceleration * 0.5;
            Ok(Status::Success)
        }),
    ])
}

fn hungry(entity: &Entity, _: &Blackboard, ctx: &UpdateContext) -> bool {
    entity
        .as_agent()
        .is_some_and(|a| a.hunger < ctx.config.predator.hunt_threshold)
}

fn acquire_prey(entity: &mut Entity, bb: &mut Blackboard, ctx: &mut UpdateContext) -> Result<Status> {
    let found = steering::nearest(ctx.entities, entity.position, &ctx.bounds, |e| {
        e.is(EntityType::Human) && !e.is_dead()
    })
    .filter(|(_, _, d)| *d <= ctx.config.predator.sense_range);

    match found {
        Some((id, _, _)) => {
            bb.set(HUNT_TARGET, id);
            Ok(Status::Success)
        }
        None => Ok(Status::Failure),
    }
}

fn chase(entity: &mut Entity, bb: &mut Blackboard, ctx: &mut UpdateContext) -> Result<Status> {
    let config = &ctx.config.predator;
    let target = bb
        .get::<EntityId>(HUNT_TARGET)
        .and_then(|id| ctx.entities.get(id))
        .filter(|t| !t.is_dead())
        .map(|t| t.position)
        .filter(|pos| ctx.bounds.distance(entity.position, *pos) <= config.sense_range * LOSE_FACTOR);

    match target {
        Some(pos) => {
            steering::steer_towards(entity, pos, config.hunt_acceleration, &ctx.bounds);
            Ok(Status::Running)
        }
        None => {
            bb.invalidate(ACQUIRE_PREY);
            Ok(Status::Failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::Vec2;
    use crate::entity::{EntityData, EntityPatch};
    use crate::simulation::state::{GameVariant, GameWorldState};

    fn hungry_predator(at: Vec2) -> Entity {
        let config = SimulationConfig::tribal();
        let mut e = Entity::new(EntityId(1_000), EntityData::defaults(EntityType::Predator, &config));
        e.position = at;
        if let Some(a) = e.as_agent_mut() {
            a.hunger = 10.0;
        }
        e
    }

    #[test]
    fn test_hunts_nearest_human() {
        let mut state = GameWorldState::empty(GameVariant::Tribal, SimulationConfig::tribal());
        let near = state
            .spawn(EntityType::Human, EntityPatch::at(Vec2::new(150.0, 100.0)))
            .unwrap();
        state
            .spawn(EntityType::Human, EntityPatch::at(Vec2::new(300.0, 100.0)))
            .unwrap();
        let tree = predator_tree(&state.config.predator);
        let mut predator = hungry_predator(Vec2::new(100.0, 100.0));
        let mut bb = Blackboard::new();
        let mut ctx = state.update_context(16.0);

        assert_eq!(tree.tick(&mut predator, &mut bb, &mut ctx).unwrap(), Status::Running);
        assert_eq!(bb.get::<EntityId>(HUNT_TARGET), Some(near));
        assert_eq!(predator.acceleration, ctx.config.predator.hunt_acceleration);
    }

    #[test]
    fn test_lost_prey_clears_hunt_and_roams() {
        let mut state = GameWorldState::empty(GameVariant::Tribal, SimulationConfig::tribal());
        let prey = state
            .spawn(EntityType::Human, EntityPatch::at(Vec2::new(150.0, 100.0)))
            .unwrap();
        let tree = predator_tree(&state.config.predator);
        let mut predator = hungry_predator(Vec2::new(100.0, 100.0));
        let mut bb = Blackboard::new();

        {
            let mut ctx = state.update_context(16.0);
            tree.tick(&mut predator, &mut bb, &mut ctx).unwrap();
        }
        state.entities.remove(prey);

        let mut ctx = state.update_context(16.0);
        assert_eq!(tree.tick(&mut predator, &mut bb, &mut ctx).unwrap(), Status::Success);
        assert!(!bb.contains(HUNT_TARGET));
        assert_eq!(predator.acceleration, ctx.config.predator.roam_acceleration);
    }

    #[test]
    fn test_fed_predator_does_not_hunt() {
        let mut state = GameWorldState::empty(GameVariant::Tribal, SimulationConfig::tribal());
        state
            .spawn(EntityType::Human, EntityPatch::at(Vec2::new(110.0, 100.0)))
            .unwrap();
        let tree = predator_tree(&state.config.predator);
        let mut predator = hungry_predator(Vec2::new(100.0, 100.0));
        if let Some(a) = predator.as_agent_mut() {
            a.hunger = 100.0;
        }
        let mut bb = Blackboard::new();
        let mut ctx = state.update_context(16.0);

        tree.tick(&mut predator, &mut bb, &mut ctx).unwrap();
        assert!(!bb.contains(HUNT_TARGET));
    }
}
