//! Hunter states
//!
//! Patrolling -> Chasing on spotting a lion inside the view cone, Chasing ->
//! Shooting inside firing range, Shooting -> Reloading once the magazine is
//! empty. A finished reload re-enters Shooting or Chasing by the last
//! measured target distance. Waiting is a stochastic pause.

use rand::Rng;

use crate::core::types::{EntityId, Vec2};
use crate::entity::{DebuffKind, Entity, EntityType};
use crate::fsm::steering;
use crate::fsm::{lion, StateData, StateDefinition, Transition};
use crate::simulation::context::UpdateContext;
use crate::simulation::notifications::NotificationKind;

pub const PATROLLING: &str = "patrolling";
pub const WAITING: &str = "waiting";
pub const CHASING: &str = "chasing";
pub const SHOOTING: &str = "shooting";
pub const RELOADING: &str = "reloading";

pub static STATES: [StateDefinition; 5] = [
    StateDefinition {
        id: PATROLLING,
        update: patrolling_update,
        on_enter: Some(patrolling_enter),
        on_exit: None,
    },
    StateDefinition {
        id: WAITING,
        update: waiting_update,
        on_enter: Some(waiting_enter),
        on_exit: None,
    },
    StateDefinition {
        id: CHASING,
        update: chasing_update,
        on_enter: None,
        on_exit: None,
    },
    StateDefinition {
        id: SHOOTING,
        update: shooting_update,
        on_enter: Some(shooting_enter),
        on_exit: None,
    },
    StateDefinition {
        id: RELOADING,
        update: reloading_update,
        on_enter: Some(reloading_enter),
        on_exit: None,
    },
];

const WAIT_FOR: &str = "wait_ms";

/// Nearest lion inside range and field of view
///
/// Range shrinks against a lion lying in ambush.
fn spot_lion(entity: &Entity, ctx: &UpdateContext) -> Option<EntityId> {
    let hunter = entity.as_hunter()?;
    let config = &ctx.config.hunter;
    let facing = Vec2::from_angle(entity.direction);
    let half_fov = config.field_of_view / 2.0;

    ctx.entities
        .of_type(EntityType::Lion)
        .filter_map(|lion| {
            let delta = ctx.bounds.delta(entity.position, lion.position);
            let distance = delta.length();
            let range = if lion.in_state(lion::AMBUSH) {
                hunter.detection_range * config.ambush_detection_factor
            } else {
                hunter.detection_range
            };
            let in_view = facing.angle_between(&delta) <= half_fov;
            (distance <= range && in_view).then_some((lion.id, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

fn start_chase(entity: &mut Entity, lion: EntityId) -> Transition {
    if let Some(hunter) = entity.as_hunter_mut() {
        hunter.target = Some(lion);
    }
    Transition::to(CHASING)
}

/// Target position and distance, recording the distance on the hunter
fn measure_target(entity: &mut Entity, ctx: &UpdateContext) -> Option<(Vec2, f32)> {
    let target = entity.as_hunter()?.target?;
    let position = ctx.entities.get(target)?.position;
    let distance = ctx.bounds.distance(entity.position, position);
    if let Some(hunter) = entity.as_hunter_mut() {
        hunter.target_distance = Some(distance);
    }
    Some((position, distance))
}

fn give_up(entity: &mut Entity, ctx: &mut UpdateContext) -> Transition {
    steering::halt(entity);
    if let Some(hunter) = entity.as_hunter_mut() {
        hunter.target = None;
        hunter.target_distance = None;
    }
    if ctx.rng.gen_bool(ctx.config.hunter.wait_chance) {
        Transition::to(WAITING)
    } else {
        Transition::to(PATROLLING)
    }
}

fn patrolling_enter(entity: &mut Entity, data: StateData, _ctx: &mut UpdateContext) -> StateData {
    if let Some(hunter) = entity.as_hunter_mut() {
        hunter.interrupted = false;
    }
    data
}

fn patrolling_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    if let Some(lion) = spot_lion(entity, ctx) {
        return start_chase(entity, lion);
    }

    let Some(waypoint) = entity.as_hunter().and_then(|h| h.current_waypoint()) else {
        steering::halt(entity);
        return Transition::stay(PATROLLING, data.clone());
    };

    let config = &ctx.config.hunter;
    let distance = steering::steer_towards(entity, waypoint, config.patrol_acceleration, &ctx.bounds);
    if distance <= config.waypoint_radius {
        if let Some(hunter) = entity.as_hunter_mut() {
            hunter.advance_waypoint();
        }
        if ctx.rng.gen_bool(config.wait_chance) {
            steering::halt(entity);
            return Transition::to(WAITING);
        }
    }
    Transition::stay(PATROLLING, data.clone())
}

fn waiting_enter(entity: &mut Entity, data: StateData, ctx: &mut UpdateContext) -> StateData {
    steering::halt(entity);
    let config = &ctx.config.hunter;
    let wait = ctx.rng.gen_range(config.wait_min_ms..=config.wait_max_ms);
    data.with_field(WAIT_FOR, wait)
}

fn waiting_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    if let Some(lion) = spot_lion(entity, ctx) {
        return start_chase(entity, lion);
    }
    steering::halt(entity);

    // Look around while standing still
    let sweep = ctx.rng.gen_range(-0.05f32..=0.05);
    entity.target_direction = crate::core::types::wrap_angle(entity.target_direction + sweep);

    let wait = data.field::<f64>(WAIT_FOR).unwrap_or(ctx.config.hunter.wait_min_ms);
    if data.elapsed(ctx.now) >= wait {
        return Transition::to(PATROLLING);
    }
    Transition::stay(WAITING, data.clone())
}

fn chasing_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    let Some((position, distance)) = measure_target(entity, ctx) else {
        return give_up(entity, ctx);
    };

    let config = &ctx.config.hunter;
    if distance > config.lose_range || data.elapsed(ctx.now) > config.chase_timeout_ms {
        return give_up(entity, ctx);
    }

    if distance <= config.firing_range {
        steering::face(entity, position, &ctx.bounds);
        let empty = entity.as_hunter().is_some_and(|h| h.ammunition == 0);
        return Transition::to(if empty { RELOADING } else { SHOOTING });
    }

    steering::steer_towards(entity, position, config.chase_acceleration, &ctx.bounds);
    Transition::stay(CHASING, data.clone())
}

fn shooting_enter(entity: &mut Entity, data: StateData, _ctx: &mut UpdateContext) -> StateData {
    steering::halt(entity);
    data
}

/// Probability that a shot at `distance` lands
pub fn hit_chance(
    accuracy: f32,
    distance: f32,
    target_speed: f32,
    target_in_ambush: bool,
    ctx: &UpdateContext,
) -> f64 {
    let config = &ctx.config.hunter;
    let range = config.firing_range.max(1.0);
    let mut chance = accuracy - config.distance_penalty * (distance / range).min(1.0);
    if target_speed > config.moving_speed_threshold {
        chance -= config.moving_target_penalty;
    }
    if target_in_ambush {
        chance *= config.ambush_hit_factor;
    }
    chance.clamp(0.0, 1.0) as f64
}

fn shooting_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    let interrupted = entity.as_hunter().is_some_and(|h| h.interrupted);
    if interrupted {
        if let Some(hunter) = entity.as_hunter_mut() {
            hunter.interrupted = false;
        }
        return Transition::to(CHASING);
    }

    let Some((position, distance)) = measure_target(entity, ctx) else {
        return give_up(entity, ctx);
    };
    let config = &ctx.config.hunter;
    if distance > config.firing_range {
        return Transition::to(CHASING);
    }
    steering::face(entity, position, &ctx.bounds);

    let Some(hunter) = entity.as_hunter() else {
        return Transition::stay(SHOOTING, data.clone());
    };
    if hunter.ammunition == 0 {
        return Transition::to(RELOADING);
    }
    let ready = hunter
        .last_shot_at
        .map_or(true, |at| ctx.now - at >= config.fire_interval_ms);
    if !ready {
        return Transition::stay(SHOOTING, data.clone());
    }

    let accuracy = hunter.accuracy;
    let Some(target_id) = hunter.target else {
        return give_up(entity, ctx);
    };
    fire(entity, target_id, accuracy, distance, ctx);
    Transition::stay(SHOOTING, data.clone())
}

fn fire(entity: &mut Entity, target_id: EntityId, accuracy: f32, distance: f32, ctx: &mut UpdateContext) {
    if let Some(hunter) = entity.as_hunter_mut() {
        hunter.ammunition = hunter.ammunition.saturating_sub(1);
        hunter.last_shot_at = Some(ctx.now);
    }

    let Some((speed, in_ambush, position)) = ctx
        .entities
        .get(target_id)
        .map(|t| (t.velocity.length(), t.in_state(lion::AMBUSH), t.position))
    else {
        return;
    };
    let chance = hit_chance(accuracy, distance, speed, in_ambush, ctx);
    let roll: f64 = ctx.rng.gen();

    if roll < chance {
        let config = &ctx.config.hunter;
        let (damage, slow_ms, now) = (config.shot_damage, config.shot_slow_ms, ctx.now);
        if let Some(target) = ctx.entities.get_mut(target_id) {
            if let Some(health) = target.health_mut() {
                *health = (*health - damage).max(0.0);
            }
            target.refresh_debuff(DebuffKind::Slow, now, slow_ms);
        }
        ctx.notify(NotificationKind::Hit, format!("Hit! -{:.0}", damage), position);
        tracing::debug!("hunter {:?} hit {:?} (p={:.2})", entity.id, target_id, chance);
    } else {
        ctx.notify(NotificationKind::Miss, "Miss", position);
    }
}

fn reloading_enter(entity: &mut Entity, data: StateData, ctx: &mut UpdateContext) -> StateData {
    steering::halt(entity);
    if let Some(hunter) = entity.as_hunter_mut() {
        hunter.reload_timer_ms = ctx.config.hunter.reload_time_ms;
    }
    data
}

fn reloading_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    steering::halt(entity);
    let config = &ctx.config.hunter;
    let Some(hunter) = entity.as_hunter_mut() else {
        return Transition::stay(RELOADING, data.clone());
    };

    hunter.interrupted = false;
    hunter.reload_timer_ms -= ctx.delta_ms;
    if hunter.reload_timer_ms > 0.0 {
        return Transition::stay(RELOADING, data.clone());
    }

    hunter.reload_timer_ms = 0.0;
    hunter.ammunition = config.max_ammunition;
    let in_range = hunter
        .target_distance
        .is_some_and(|d| d <= config.firing_range);
    Transition::to(if in_range { SHOOTING } else { CHASING })
}
