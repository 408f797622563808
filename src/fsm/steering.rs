//! Movement intent helpers shared by states and behaviors
//!
//! These only write `target_direction` and `acceleration`; physics turns
//! intent into motion on the next integration.

use crate::core::types::{EntityId, Vec2, VECTOR_EPSILON};
use crate::entity::{Entity, EntityStore};
use crate::spatial::bounds::WorldBounds;

/// Face and thrust toward `target`; returns the remaining distance
pub fn steer_towards(entity: &mut Entity, target: Vec2, acceleration: f32, bounds: &WorldBounds) -> f32 {
    let delta = bounds.delta(entity.position, target);
    let distance = delta.length();
    if distance > VECTOR_EPSILON {
        entity.target_direction = delta.angle();
        entity.acceleration = acceleration;
    } else {
        entity.acceleration = 0.0;
    }
    distance
}

/// Face and thrust directly away from `threat`
pub fn steer_away(entity: &mut Entity, threat: Vec2, acceleration: f32, bounds: &WorldBounds) {
    let delta = bounds.delta(threat, entity.position);
    if delta.length() > VECTOR_EPSILON {
        entity.target_direction = delta.angle();
    }
    entity.acceleration = acceleration;
}

/// Turn toward `target` without moving
pub fn face(entity: &mut Entity, target: Vec2, bounds: &WorldBounds) {
    let delta = bounds.delta(entity.position, target);
    if delta.length() > VECTOR_EPSILON {
        entity.target_direction = delta.angle();
    }
    entity.acceleration = 0.0;
}

pub fn halt(entity: &mut Entity) {
    entity.acceleration = 0.0;
}

/// Closest entity accepted by `filter`, with its position and distance
///
/// Ties resolve to the lowest id (store order).
pub fn nearest<F>(
    entities: &EntityStore,
    from: Vec2,
    bounds: &WorldBounds,
    filter: F,
) -> Option<(EntityId, Vec2, f32)>
where
    F: Fn(&Entity) -> bool,
{
    entities
        .iter()
        .filter(|e| filter(e))
        .map(|e| (e.id, e.position, bounds.distance(from, e.position)))
        .fold(None, |best: Option<(EntityId, Vec2, f32)>, candidate| match best {
            Some(b) if b.2 <= candidate.2 => Some(b),
            _ => Some(candidate),
        })
}
