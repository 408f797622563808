//! Lion states
//!
//! The lion is player driven: inbound calls set `target` and `action`, and
//! these states turn that intent into steering.
//!
//! | from     | to       | when                                          |
//! |----------|----------|-----------------------------------------------|
//! | idle     | moving   | position target set                           |
//! | idle     | chasing  | entity target set and attack intent           |
//! | idle     | ambush   | ambush intent                                 |
//! | idle     | eating   | eat intent and carrion within eating range    |
//! | ambush   | chasing  | entity target acquired (boosted)              |
//! | ambush   | idle     | ambush intent cleared                         |
//! | chasing  | idle     | target lost or attack intent cleared          |
//! | eating   | idle     | eat intent cleared or carrion gone            |

use crate::core::types::{EntityId, Vec2};
use crate::entity::{Entity, EntityType, LionAction, Target};
use crate::fsm::steering;
use crate::fsm::{StateData, StateDefinition, Transition};
use crate::simulation::context::UpdateContext;

pub const IDLE: &str = "idle";
pub const MOVING: &str = "moving_to_target";
pub const CHASING: &str = "chasing";
pub const AMBUSH: &str = "ambush";
pub const EATING: &str = "eating";

pub static STATES: [StateDefinition; 5] = [
    StateDefinition {
        id: IDLE,
        update: idle_update,
        on_enter: None,
        on_exit: None,
    },
    StateDefinition {
        id: MOVING,
        update: moving_update,
        on_enter: None,
        on_exit: None,
    },
    StateDefinition {
        id: CHASING,
        update: chasing_update,
        on_enter: Some(chasing_enter),
        on_exit: None,
    },
    StateDefinition {
        id: AMBUSH,
        update: ambush_update,
        on_enter: None,
        on_exit: Some(ambush_exit),
    },
    StateDefinition {
        id: EATING,
        update: eating_update,
        on_enter: None,
        on_exit: None,
    },
];

/// Carrion the lion could eat right now: its entity target if that is
/// carrion, otherwise the nearest carrion within eating range
fn edible_carrion(entity: &Entity, ctx: &UpdateContext) -> Option<EntityId> {
    let range = ctx.config.lion.eating_range;
    let targeted = entity
        .as_lion()
        .and_then(|l| l.target)
        .and_then(|t| t.entity_id)
        .and_then(|id| ctx.entities.get(id))
        .filter(|e| e.is(EntityType::Carrion));

    match targeted {
        Some(carrion) => {
            (ctx.bounds.distance(entity.position, carrion.position) <= range).then_some(carrion.id)
        }
        None => steering::nearest(ctx.entities, entity.position, &ctx.bounds, |e| {
            e.is(EntityType::Carrion)
        })
        .filter(|(_, _, d)| *d <= range)
        .map(|(id, _, _)| id),
    }
}

/// Where the current target sits, if it still exists
fn target_position(entity: &Entity, ctx: &UpdateContext) -> Option<Vec2> {
    let target = entity.as_lion()?.target?;
    match target.entity_id {
        Some(id) => ctx.entities.get(id).map(|e| e.position),
        None => target.position,
    }
}

/// State implied by the current intent, checked from idle and moving
fn intent_state(entity: &mut Entity, ctx: &UpdateContext) -> Option<&'static str> {
    let lion = entity.as_lion()?;
    let target = lion.target.unwrap_or_default();
    let action = lion.action;
    match action {
        Some(LionAction::Ambush) => Some(AMBUSH),
        Some(LionAction::Eat) => match edible_carrion(entity, ctx) {
            Some(carrion) => {
                if let Some(lion) = entity.as_lion_mut() {
                    lion.target = Some(Target::entity(carrion));
                }
                Some(EATING)
            }
            None if target.entity_id.is_some() || target.position.is_some() => Some(MOVING),
            None => None,
        },
        Some(LionAction::Attack) if target.entity_id.is_some() => Some(CHASING),
        _ if target.position.is_some() || target.entity_id.is_some() => Some(MOVING),
        _ => None,
    }
}

fn idle_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    steering::halt(entity);
    match intent_state(entity, ctx) {
        Some(next) => Transition::to(next),
        None => Transition::stay(IDLE, data.clone()),
    }
}

fn moving_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    if let Some(next) = intent_state(entity, ctx).filter(|s| *s != MOVING) {
        return Transition::to(next);
    }

    let Some(destination) = target_position(entity, ctx) else {
        if let Some(lion) = entity.as_lion_mut() {
            lion.clear_target();
        }
        steering::halt(entity);
        return Transition::to(IDLE);
    };

    let config = &ctx.config.lion;
    let distance = steering::steer_towards(entity, destination, config.walk_acceleration, &ctx.bounds);
    if distance <= config.arrive_radius {
        steering::halt(entity);
        if let Some(lion) = entity.as_lion_mut() {
            lion.target = None;
            if lion.action == Some(LionAction::Walk) {
                lion.action = None;
            }
        }
        return Transition::to(IDLE);
    }
    Transition::stay(MOVING, data.clone())
}

fn chasing_enter(entity: &mut Entity, data: StateData, ctx: &mut UpdateContext) -> StateData {
    let boosted = entity.as_lion().is_some_and(|l| l.is_boosted(ctx.now));
    data.with_field("boosted", boosted)
}

fn chasing_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    let Some(lion) = entity.as_lion() else {
        return Transition::stay(CHASING, data.clone());
    };
    let attacking = lion.action == Some(LionAction::Attack);
    let prey = lion
        .target
        .and_then(|t| t.entity_id)
        .and_then(|id| ctx.entities.get(id))
        .map(|e| e.position);

    let Some(prey_position) = prey.filter(|_| attacking) else {
        steering::halt(entity);
        if let Some(lion) = entity.as_lion_mut() {
            lion.clear_target();
        }
        return Transition::to(IDLE);
    };

    let config = &ctx.config.lion;
    let thrust = if entity.as_lion().is_some_and(|l| l.is_boosted(ctx.now)) {
        config.boost_acceleration
    } else {
        config.chase_acceleration
    };
    steering::steer_towards(entity, prey_position, thrust, &ctx.bounds);
    Transition::stay(CHASING, data.clone())
}

fn ambush_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    let Some(lion) = entity.as_lion() else {
        return Transition::stay(AMBUSH, data.clone());
    };
    let acquired = lion
        .target
        .and_then(|t| t.entity_id)
        .is_some_and(|id| ctx.entities.contains(id));
    let still_ambushing = lion.action == Some(LionAction::Ambush);
    let sneak_to = lion.target.and_then(|t| t.position);

    if acquired {
        if let Some(lion) = entity.as_lion_mut() {
            lion.action = Some(LionAction::Attack);
        }
        return Transition::to(CHASING);
    }
    if !still_ambushing {
        steering::halt(entity);
        return Transition::to(IDLE);
    }

    let config = &ctx.config.lion;
    match sneak_to {
        Some(pos) => {
            let distance = steering::steer_towards(entity, pos, config.ambush_acceleration, &ctx.bounds);
            if distance <= config.arrive_radius {
                steering::halt(entity);
            }
        }
        None => steering::halt(entity),
    }
    Transition::stay(AMBUSH, data.clone())
}

/// Springing out of an ambush grants a temporary thrust boost
fn ambush_exit(entity: &mut Entity, _data: &StateData, next: &str, ctx: &mut UpdateContext) {
    if next == CHASING {
        let until = ctx.now + ctx.config.lion.boost_duration_ms;
        if let Some(lion) = entity.as_lion_mut() {
            lion.boost_until = Some(until);
        }
    }
}

fn eating_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    let eating = entity
        .as_lion()
        .is_some_and(|l| l.action == Some(LionAction::Eat));
    let carrion = edible_carrion(entity, ctx).and_then(|id| ctx.entities.get(id)).map(|e| e.position);

    match carrion.filter(|_| eating) {
        Some(pos) => {
            steering::face(entity, pos, &ctx.bounds);
            Transition::stay(EATING, data.clone())
        }
        None => {
            steering::halt(entity);
            if let Some(lion) = entity.as_lion_mut() {
                lion.clear_target();
            }
            Transition::to(IDLE)
        }
    }
}
