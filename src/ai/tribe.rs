//! Human behavior tree: survival, tribe politics, family
//!
//! Priority order, highest first: flee a predator, continue a migration
//! trip, split off a new tribe, decide on a migration, forage, procreate,
//! follow the leader, idle.
//!
//! The agent being evaluated is taken out of the store for the duration of
//! its update, so every tribe-wide count adds the agent itself back in.

use rand::Rng;
use std::collections::BTreeSet;
use std::f32::consts::TAU;

use crate::ai::behavior_tree::{BehaviorNode, Status};
use crate::ai::blackboard::Blackboard;
use crate::core::config::TribeConfig;
use crate::core::error::Result;
use crate::core::types::{EntityId, Vec2};
use crate::entity::kinds::{clamp_stat, Gender, Pregnancy};
use crate::entity::{Entity, EntityType};
use crate::fsm::steering;
use crate::simulation::context::UpdateContext;
use crate::simulation::diplomacy::Relation;
use crate::simulation::environment::SectorKind;
use crate::simulation::notifications::NotificationKind;

pub const MIGRATION: &str = "migration";
pub const MIGRATION_TARGET: &str = "migration/target";
/// Outside the migration scope so it survives the trip's cleanup
pub const LAST_MIGRATION_AT: &str = "last_migration_at";
pub const SPLIT: &str = "split";
pub const SPLIT_TARGET: &str = "split/target";

const SPLIT_ELIGIBLE: &str = "split_eligible";
const MIGRATION_DECISION: &str = "migration_decision";

pub fn human_tree(config: &TribeConfig) -> BehaviorNode {
    BehaviorNode::selector(vec![
        BehaviorNode::sequence(vec![
            BehaviorNode::condition("predator_nearby", predator_nearby),
            BehaviorNode::action("flee", flee),
        ]),
        BehaviorNode::scoped(
            MIGRATION,
            vec![
                BehaviorNode::condition("migrating", |_, bb, _| bb.contains(MIGRATION_TARGET)),
                BehaviorNode::action("travel", travel),
            ],
        ),
        split_behavior(config),
        migration_behavior(config),
        BehaviorNode::sequence(vec![
            BehaviorNode::condition("hungry", hungry),
            BehaviorNode::action("forage", forage),
        ]),
        BehaviorNode::cooldown(
            "procreation",
            config.procreation_cooldown_ticks,
            BehaviorNode::sequence(vec![
                BehaviorNode::condition("can_conceive", can_conceive),
                BehaviorNode::action("conceive", conceive),
            ]),
        ),
        BehaviorNode::sequence(vec![
            BehaviorNode::condition("has_leader", has_other_leader),
            BehaviorNode::action("follow", follow),
        ]),
        BehaviorNode::action("idle", |entity, _, _| {
            steering::halt(entity);
            Ok(Status::Success)
        }),
    ])
}

/// Eligibility (cached) -> walk away from the tribe -> break away
pub fn split_behavior(config: &TribeConfig) -> BehaviorNode {
    BehaviorNode::scoped(
        SPLIT,
        vec![
            BehaviorNode::caching(
                SPLIT_ELIGIBLE,
                config.split_eligibility_cache_ticks,
                BehaviorNode::condition(SPLIT_ELIGIBLE, split_eligible),
            ),
            BehaviorNode::action("seek_safety", seek_safety),
            BehaviorNode::action("split_tribe", split_tribe),
        ],
    )
}

/// `Cooldown(Caching(Sequence(is_leader, interval elapsed, initiate)))`
pub fn migration_behavior(config: &TribeConfig) -> BehaviorNode {
    BehaviorNode::cooldown(
        MIGRATION,
        config.migration_cooldown_ticks,
        BehaviorNode::caching(
            MIGRATION_DECISION,
            config.migration_decision_cache_ticks,
            BehaviorNode::sequence(vec![
                BehaviorNode::condition("is_leader", |e, _, _| is_leader(e)),
                BehaviorNode::condition("migration_due", migration_due),
                BehaviorNode::action("initiate_migration", initiate_migration),
            ]),
        ),
    )
}

fn is_leader(entity: &Entity) -> bool {
    entity.as_agent().is_some_and(|a| a.is_leader(entity.id))
}

fn leader_of(entity: &Entity) -> Option<EntityId> {
    entity.as_agent().and_then(|a| a.leader)
}

/// Tribe members other than the agent being evaluated
fn members<'c>(ctx: &'c UpdateContext, leader: EntityId) -> impl Iterator<Item = &'c Entity> {
    ctx.entities
        .of_type(EntityType::Human)
        .filter(move |e| leader_of(e) == Some(leader))
}

fn tribe_size(entity: &Entity, ctx: &UpdateContext) -> usize {
    match leader_of(entity) {
        Some(leader) => members(ctx, leader).count() + 1,
        None => 1,
    }
}

fn tribe_center(entity: &Entity, ctx: &UpdateContext) -> Vec2 {
    let Some(leader) = leader_of(entity) else {
        return entity.position;
    };
    let (sum, count) = members(ctx, leader)
        .fold((entity.position, 1.0f32), |(sum, n), e| (sum + e.position, n + 1.0));
    sum * (1.0 / count)
}

/// The agent plus every tribe member descended from it
fn family(entity: &Entity, ctx: &UpdateContext) -> BTreeSet<EntityId> {
    let mut found = BTreeSet::from([entity.id]);
    let Some(leader) = leader_of(entity) else {
        return found;
    };
    let tribe: Vec<(EntityId, Option<EntityId>)> = members(ctx, leader)
        .map(|e| (e.id, e.as_agent().and_then(|a| a.parent)))
        .collect();
    loop {
        let before = found.len();
        for (id, parent) in &tribe {
            if parent.is_some_and(|p| found.contains(&p)) {
                found.insert(*id);
            }
        }
        if found.len() == before {
            return found;
        }
    }
}

fn predator_nearby(entity: &Entity, _: &Blackboard, ctx: &UpdateContext) -> bool {
    nearest_predator(entity, ctx).is_some()
}

fn nearest_predator(entity: &Entity, ctx: &UpdateContext) -> Option<Vec2> {
    steering::nearest(ctx.entities, entity.position, &ctx.bounds, |e| {
        e.is(EntityType::Predator)
    })
    .filter(|(_, _, d)| *d <= ctx.config.tribe.flee_radius)
    .map(|(_, pos, _)| pos)
}

fn flee(entity: &mut Entity, _: &mut Blackboard, ctx: &mut UpdateContext) -> Result<Status> {
    match nearest_predator(entity, ctx) {
        Some(threat) => {
            steering::steer_away(entity, threat, ctx.config.tribe.flee_acceleration, &ctx.bounds);
            Ok(Status::Success)
        }
        None => Ok(Status::Failure),
    }
}

fn travel(entity: &mut Entity, bb: &mut Blackboard, ctx: &mut UpdateContext) -> Result<Status> {
    let Some(target) = bb.get::<Vec2>(MIGRATION_TARGET) else {
        return Ok(Status::Failure);
    };
    let config = &ctx.config.tribe;
    let remaining = steering::steer_towards(entity, target, config.walk_acceleration, &ctx.bounds);
    if remaining > config.arrival_radius {
        return Ok(Status::Running);
    }
    steering::halt(entity);
    bb.remove(MIGRATION_TARGET);
    bb.set(LAST_MIGRATION_AT, ctx.now);
    // The cached "start a trip" answer is stale once the trip is over
    bb.invalidate(MIGRATION_DECISION);
    tracing::debug!("tribe of {:?} arrived at {:?}", entity.id, target);
    Ok(Status::Success)
}

fn migration_due(_: &Entity, bb: &Blackboard, ctx: &UpdateContext) -> bool {
    let last = bb.get::<f64>(LAST_MIGRATION_AT).unwrap_or(0.0);
    ctx.now - last >= ctx.config.tribe.migration_interval_ms
}

/// Pick the richest far-enough grass sector and start the trip
fn initiate_migration(entity: &mut Entity, bb: &mut Blackboard, ctx: &mut UpdateContext) -> Result<Status> {
    let min_distance = ctx.config.tribe.migration_min_distance;
    let bounds = ctx.bounds;
    let destination = ctx
        .environment
        .sectors
        .iter()
        .filter(|s| s.kind() == SectorKind::Grass && s.is_available())
        .map(|s| (s.center(), s.density(), bounds.distance(entity.position, s.center())))
        .filter(|(_, _, d)| *d >= min_distance)
        .max_by(|a, b| a.1.total_cmp(&b.1).then(b.2.total_cmp(&a.2)))
        .map(|(center, _, _)| center);

    let Some(destination) = destination else {
        return Ok(Status::Failure);
    };
    bb.set(MIGRATION_TARGET, destination);
    ctx.notify(NotificationKind::Info, "The tribe migrates", entity.position);
    tracing::debug!("leader {:?} migrating to {:?}", entity.id, destination);
    Ok(Status::Success)
}

fn split_eligible(entity: &Entity, _: &Blackboard, ctx: &UpdateContext) -> bool {
    let config = &ctx.config.tribe;
    let Some(agent) = entity.as_agent() else {
        return false;
    };
    let Some(leader) = agent.leader else {
        return false;
    };
    if agent.age < config.adult_age || leader == entity.id {
        return false;
    }
    let is_heir = ctx
        .entities
        .get(leader)
        .and_then(|l| l.as_agent())
        .is_some_and(|l| l.heir == Some(entity.id));
    if is_heir {
        return false;
    }

    let size = tribe_size(entity, ctx);
    if size < config.split_min_tribe_size {
        return false;
    }
    let family = family(entity, ctx).len();
    family >= 2 && family as f32 >= config.split_family_fraction * size as f32
}

/// Walk to a point `split_distance` out from the tribe centre
fn seek_safety(entity: &mut Entity, bb: &mut Blackboard, ctx: &mut UpdateContext) -> Result<Status> {
    let target = match bb.get::<Vec2>(SPLIT_TARGET) {
        Some(target) => target,
        None => {
            let center = tribe_center(entity, ctx);
            let mut away = ctx.bounds.delta(center, entity.position).normalize();
            if away == Vec2::ZERO {
                away = Vec2::from_angle(ctx.rng.gen_range(0.0..TAU));
            }
            let target = ctx
                .bounds
                .contain_point(center + away * ctx.config.tribe.split_distance);
            bb.set(SPLIT_TARGET, target);
            target
        }
    };
    let config = &ctx.config.tribe;
    let remaining = steering::steer_towards(entity, target, config.walk_acceleration, &ctx.bounds);
    if remaining > config.arrival_radius {
        Ok(Status::Running)
    } else {
        steering::halt(entity);
        Ok(Status::Success)
    }
}

/// Become a leader, take the family along, and fall out with the old leader
fn split_tribe(entity: &mut Entity, bb: &mut Blackboard, ctx: &mut UpdateContext) -> Result<Status> {
    let id = entity.id;
    let Some(old_leader) = leader_of(entity) else {
        return Ok(Status::Failure);
    };
    let family = family(entity, ctx);

    for member in ctx.entities.iter_mut() {
        if family.contains(&member.id) {
            if let Some(agent) = member.as_agent_mut() {
                agent.leader = Some(id);
            }
        }
    }
    if let Some(agent) = entity.as_agent_mut() {
        agent.leader = Some(id);
        agent.heir = None;
    }
    ctx.diplomacy.set(id, old_leader, Relation::Hostile);
    bb.invalidate(SPLIT_ELIGIBLE);
    ctx.notify(NotificationKind::Info, "A new tribe breaks away", entity.position);
    tracing::info!(
        "{:?} split from {:?} with {} followers",
        id,
        old_leader,
        family.len() - 1
    );
    Ok(Status::Success)
}

fn hungry(entity: &Entity, _: &Blackboard, ctx: &UpdateContext) -> bool {
    entity
        .as_agent()
        .is_some_and(|a| a.hunger < ctx.config.tribe.forage_threshold)
}

/// Graze when standing on grass, otherwise head for the nearest patch
fn forage(entity: &mut Entity, _: &mut Blackboard, ctx: &mut UpdateContext) -> Result<Status> {
    let config = ctx.config;
    let dt = ctx.dt();
    let radius = entity.entity_type().footprint_radius();

    if let Some(index) = ctx
        .environment
        .overlapping(SectorKind::Grass, entity.position, radius, &ctx.bounds)
    {
        steering::halt(entity);
        let grazed = ctx
            .environment
            .graze(index, config.tribe.graze_depletion_per_sec * dt);
        if grazed > 0.0 {
            if let Some(agent) = entity.as_agent_mut() {
                agent.hunger = clamp_stat(agent.hunger + config.tribe.forage_rate_per_sec * dt);
            }
        }
        return Ok(Status::Success);
    }

    match ctx
        .environment
        .nearest(SectorKind::Grass, entity.position, &ctx.bounds)
        .and_then(|(index, _)| ctx.environment.get(index))
        .map(|s| s.center())
    {
        Some(center) => {
            steering::steer_towards(entity, center, config.tribe.walk_acceleration, &ctx.bounds);
            Ok(Status::Running)
        }
        None => Ok(Status::Failure),
    }
}

fn can_conceive(entity: &Entity, _: &Blackboard, ctx: &UpdateContext) -> bool {
    let config = &ctx.config.tribe;
    let Some(agent) = entity.as_agent() else {
        return false;
    };
    let fertile = agent.gender == Gender::Female
        && agent.age >= config.adult_age
        && agent.age <= config.fertile_until_age
        && agent.pregnancy.is_none()
        && agent.hunger >= config.procreation_hunger_min;
    let Some(leader) = agent.leader.filter(|_| fertile) else {
        return false;
    };
    members(ctx, leader).any(|e| {
        e.as_agent()
            .is_some_and(|a| a.gender == Gender::Male && a.age >= config.adult_age)
            && ctx.bounds.distance(entity.position, e.position) <= config.partner_range
    })
}

fn conceive(entity: &mut Entity, _: &mut Blackboard, ctx: &mut UpdateContext) -> Result<Status> {
    let now = ctx.now;
    match entity.as_agent_mut() {
        Some(agent) => {
            agent.pregnancy = Some(Pregnancy { since: now });
            tracing::debug!("human {:?} is pregnant", entity.id);
            Ok(Status::Success)
        }
        None => Ok(Status::Failure),
    }
}

fn has_other_leader(entity: &Entity, _: &Blackboard, ctx: &UpdateContext) -> bool {
    leader_of(entity).is_some_and(|leader| leader != entity.id && ctx.entities.contains(leader))
}

fn follow(entity: &mut Entity, _: &mut Blackboard, ctx: &mut UpdateContext) -> Result<Status> {
    let Some(leader) = leader_of(entity).and_then(|id| ctx.entities.get(id)) else {
        return Ok(Status::Failure);
    };
    let leader_pos = leader.position;
    let config = &ctx.config.tribe;
    if ctx.bounds.distance(entity.position, leader_pos) > config.follow_distance {
        steering::steer_towards(entity, leader_pos, config.walk_acceleration, &ctx.bounds);
    } else {
        steering::halt(entity);
    }
    Ok(Status::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::entity::kinds::AgentData;
    use crate::entity::{EntityData, EntityPatch};
    use crate::simulation::environment::Sector;
    use crate::simulation::state::{GameVariant, GameWorldState};

    fn world() -> GameWorldState {
        GameWorldState::empty(GameVariant::Tribal, SimulationConfig::tribal())
    }

    fn human(leader: EntityId, age: f32, gender: Gender, parent: Option<EntityId>) -> EntityData {
        let mut agent = AgentData::new(100.0, age, gender);
        agent.leader = Some(leader);
        agent.parent = parent;
        EntityData::Human(agent)
    }

    fn spawn_at(state: &mut GameWorldState, pos: Vec2, data: EntityData) -> EntityId {
        state
            .spawn(EntityType::Human, EntityPatch::at(pos).with_data(data))
            .unwrap()
    }

    #[test]
    fn test_family_follows_parent_links() {
        let mut state = world();
        let leader = EntityId(500);
        let child = spawn_at(&mut state, Vec2::new(10.0, 10.0), human(leader, 20.0, Gender::Male, Some(EntityId(900))));
        let grandchild = spawn_at(&mut state, Vec2::new(10.0, 10.0), human(leader, 2.0, Gender::Female, Some(child)));
        spawn_at(&mut state, Vec2::new(10.0, 10.0), human(leader, 30.0, Gender::Male, None));

        let ctx = state.update_context(16.0);
        let me = Entity::new(EntityId(900), human(leader, 45.0, Gender::Female, None));
        let found = family(&me, &ctx);
        assert_eq!(found, BTreeSet::from([EntityId(900), child, grandchild]));
        assert_eq!(tribe_size(&me, &ctx), 4);
    }

    #[test]
    fn test_leader_starts_migration_to_far_grass() {
        let mut state = world();
        state
            .environment
            .sectors
            .push(Sector::grass(Vec2::new(100.0, 100.0), 40.0, 40.0, 1.0));
        state
            .environment
            .sectors
            .push(Sector::grass(Vec2::new(900.0, 900.0), 40.0, 40.0, 0.8));
        state.time_ms = state.config.tribe.migration_interval_ms;
        let tree = migration_behavior(&state.config.tribe);

        let mut leader = Entity::new(EntityId(1), human(EntityId(1), 30.0, Gender::Male, None));
        leader.position = Vec2::new(110.0, 110.0);
        let mut bb = Blackboard::new();
        let mut ctx = state.update_context(16.0);

        assert_eq!(tree.tick(&mut leader, &mut bb, &mut ctx).unwrap(), Status::Success);
        assert_eq!(bb.get::<Vec2>(MIGRATION_TARGET), Some(Vec2::new(920.0, 920.0)));
        assert_eq!(ctx.notifications.count(NotificationKind::Info), 1);

        // Inside the cooldown the subtree is skipped entirely
        assert_eq!(tree.tick(&mut leader, &mut bb, &mut ctx).unwrap(), Status::Failure);
    }

    #[test]
    fn test_arrival_forgets_cached_migration_decision() {
        let mut state = world();
        state
            .environment
            .sectors
            .push(Sector::grass(Vec2::new(900.0, 900.0), 40.0, 40.0, 0.8));
        state.time_ms = state.config.tribe.migration_interval_ms;
        let tree = migration_behavior(&state.config.tribe);

        let mut leader = Entity::new(EntityId(1), human(EntityId(1), 30.0, Gender::Male, None));
        leader.position = Vec2::new(110.0, 110.0);
        let mut bb = Blackboard::new();
        let mut ctx = state.update_context(16.0);

        assert_eq!(tree.tick(&mut leader, &mut bb, &mut ctx).unwrap(), Status::Success);
        assert_eq!(bb.cached(MIGRATION_DECISION, ctx.tick), Some(Status::Success));

        leader.position = Vec2::new(920.0, 920.0);
        assert_eq!(travel(&mut leader, &mut bb, &mut ctx).unwrap(), Status::Success);
        assert!(!bb.contains(MIGRATION_TARGET));
        assert_eq!(bb.cached(MIGRATION_DECISION, ctx.tick), None);
    }

    #[test]
    fn test_followers_never_decide_migration() {
        let mut state = world();
        state.time_ms = 1.0e9;
        let tree = migration_behavior(&state.config.tribe);
        let mut follower = Entity::new(EntityId(2), human(EntityId(1), 30.0, Gender::Male, None));
        let mut bb = Blackboard::new();
        let mut ctx = state.update_context(16.0);

        assert_eq!(tree.tick(&mut follower, &mut bb, &mut ctx).unwrap(), Status::Failure);
        assert!(!bb.contains(MIGRATION_TARGET));
    }

    #[test]
    fn test_split_breaks_family_away() {
        let mut state = world();
        let old_leader = spawn_at(&mut state, Vec2::new(400.0, 400.0), human(EntityId(0), 50.0, Gender::Male, None));
        // Re-point the leader at itself now that its id is known
        if let Some(a) = state.entities.get_mut(old_leader).and_then(|e| e.as_agent_mut()) {
            a.leader = Some(old_leader);
        }
        let founder_id = EntityId(10_000);
        let mut kids = Vec::new();
        for _ in 0..3 {
            kids.push(spawn_at(&mut state, Vec2::new(400.0, 400.0), human(old_leader, 5.0, Gender::Male, Some(founder_id))));
        }
        for _ in 0..6 {
            spawn_at(&mut state, Vec2::new(400.0, 400.0), human(old_leader, 30.0, Gender::Female, None));
        }

        let mut founder = Entity::new(founder_id, human(old_leader, 30.0, Gender::Female, None));
        founder.position = Vec2::new(400.0, 400.0);
        let tree = split_behavior(&state.config.tribe);
        let mut bb = Blackboard::new();

        let mut ctx = state.update_context(16.0);
        assert_eq!(tree.tick(&mut founder, &mut bb, &mut ctx).unwrap(), Status::Running);
        let target = bb.get::<Vec2>(SPLIT_TARGET).unwrap();
        assert!(ctx.bounds.distance(target, Vec2::new(400.0, 400.0)) > 0.0);

        // Arrive and break away
        founder.position = target;
        assert_eq!(tree.tick(&mut founder, &mut bb, &mut ctx).unwrap(), Status::Success);
        assert!(!bb.contains(SPLIT_TARGET));
        assert_eq!(founder.as_agent().unwrap().leader, Some(founder_id));
        for kid in kids {
            assert_eq!(ctx.entities.get(kid).unwrap().as_agent().unwrap().leader, Some(founder_id));
        }
        assert_eq!(ctx.diplomacy.relation(founder_id, old_leader), Relation::Hostile);
    }

    #[test]
    fn test_abandoned_split_trip_is_cleared() {
        let mut state = world();
        let tree = split_behavior(&state.config.tribe);
        // Not eligible: a child with no tribe to speak of
        let mut child = Entity::new(EntityId(3), human(EntityId(1), 4.0, Gender::Male, None));
        let mut bb = Blackboard::new();
        bb.set(SPLIT_TARGET, Vec2::new(1.0, 1.0));
        let mut ctx = state.update_context(16.0);

        assert_eq!(tree.tick(&mut child, &mut bb, &mut ctx).unwrap(), Status::Failure);
        assert!(!bb.contains(SPLIT_TARGET));
    }

    #[test]
    fn test_human_flees_predator_first() {
        let mut state = world();
        state
            .spawn(EntityType::Predator, EntityPatch::at(Vec2::new(130.0, 100.0)))
            .unwrap();
        let tree = human_tree(&state.config.tribe);
        let mut me = Entity::new(EntityId(77), human(EntityId(77), 30.0, Gender::Male, None));
        me.position = Vec2::new(100.0, 100.0);
        let mut bb = Blackboard::new();
        let mut ctx = state.update_context(16.0);

        assert_eq!(tree.tick(&mut me, &mut bb, &mut ctx).unwrap(), Status::Success);
        assert_eq!(me.acceleration, ctx.config.tribe.flee_acceleration);
        // Facing away from the predator, which sits on +x
        assert!(Vec2::from_angle(me.target_direction).x < 0.0);
    }
}
