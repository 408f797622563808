//! Prey states
//!
//! Threat checks run first in every non-fleeing state. Thirst is served
//! before hunger. `Fleeing` has a minimum dwell time so a lion hovering at
//! the edge of the threat radius cannot make the prey flicker.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

use crate::core::types::{EntityId, Vec2};
use crate::entity::{Entity, EntityType};
use crate::fsm::steering;
use crate::fsm::{StateData, StateDefinition, Transition};
use crate::simulation::context::UpdateContext;
use crate::simulation::environment::SectorKind;

pub const IDLE: &str = "idle";
pub const MOVING: &str = "moving";
pub const FLEEING: &str = "fleeing";
pub const EATING: &str = "eating";
pub const DRINKING: &str = "drinking";

pub static STATES: [StateDefinition; 5] = [
    StateDefinition {
        id: IDLE,
        update: idle_update,
        on_enter: Some(stop_on_enter),
        on_exit: None,
    },
    StateDefinition {
        id: MOVING,
        update: moving_update,
        on_enter: None,
        on_exit: Some(moving_exit),
    },
    StateDefinition {
        id: FLEEING,
        update: fleeing_update,
        on_enter: None,
        on_exit: None,
    },
    StateDefinition {
        id: EATING,
        update: eating_update,
        on_enter: Some(stop_on_enter),
        on_exit: None,
    },
    StateDefinition {
        id: DRINKING,
        update: drinking_update,
        on_enter: Some(stop_on_enter),
        on_exit: None,
    },
];

/// Why a prey is in `Moving`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovePurpose {
    Drink,
    Eat,
    Wander,
}

const PURPOSE: &str = "purpose";
const THREAT: &str = "threat";

fn stop_on_enter(entity: &mut Entity, data: StateData, _ctx: &mut UpdateContext) -> StateData {
    steering::halt(entity);
    data
}

fn moving_exit(entity: &mut Entity, _data: &StateData, _next: &str, _ctx: &mut UpdateContext) {
    if let Some(prey) = entity.as_prey_mut() {
        prey.target_position = None;
    }
}

/// Nearest lion close enough to notice
///
/// The radius is full when the lion is ahead of the prey and shrinks by the
/// peripheral factor when it is behind.
fn detect_threat(entity: &Entity, ctx: &UpdateContext) -> Option<EntityId> {
    let config = &ctx.config.prey;
    let facing = Vec2::from_angle(entity.direction);
    ctx.entities
        .of_type(EntityType::Lion)
        .filter_map(|lion| {
            let delta = ctx.bounds.delta(entity.position, lion.position);
            let distance = delta.length();
            let radius = if facing.angle_between(&delta) <= FRAC_PI_2 {
                config.threat_radius
            } else {
                config.threat_radius * config.peripheral_factor
            };
            (distance <= radius).then_some((lion.id, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

fn flee_from(threat: EntityId) -> Transition {
    Transition::to_with(FLEEING, StateData::default().with_field(THREAT, threat))
}

/// Pick a movement goal for a need, or settle in place when already there
fn seek(entity: &mut Entity, kind: SectorKind, ctx: &UpdateContext) -> Option<Transition> {
    let radius = entity.entity_type().footprint_radius();
    if ctx
        .environment
        .overlapping(kind, entity.position, radius, &ctx.bounds)
        .is_some()
    {
        return Some(Transition::to(match kind {
            SectorKind::Water => DRINKING,
            SectorKind::Grass => EATING,
        }));
    }

    let (index, _) = ctx.environment.nearest(kind, entity.position, &ctx.bounds)?;
    let goal = ctx.environment.get(index)?.center();
    if let Some(prey) = entity.as_prey_mut() {
        prey.target_position = Some(goal);
    }
    let purpose = match kind {
        SectorKind::Water => MovePurpose::Drink,
        SectorKind::Grass => MovePurpose::Eat,
    };
    Some(Transition::to_with(MOVING, StateData::default().with_field(PURPOSE, purpose)))
}

fn idle_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    steering::halt(entity);
    if let Some(threat) = detect_threat(entity, ctx) {
        return flee_from(threat);
    }

    let Some(vitals) = entity.as_prey().map(|p| p.vitals) else {
        return Transition::stay(IDLE, data.clone());
    };
    let config = &ctx.config.prey;

    if vitals.thirst < config.thirst_threshold {
        if let Some(t) = seek(entity, SectorKind::Water, ctx) {
            return t;
        }
    }
    if vitals.hunger < config.hunger_threshold {
        if let Some(t) = seek(entity, SectorKind::Grass, ctx) {
            return t;
        }
    }

    let chance = (config.wander_chance_per_sec as f64 * ctx.delta_ms / 1000.0).clamp(0.0, 1.0);
    if ctx.rng.gen_bool(chance) {
        let angle = ctx.rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI);
        let distance = ctx.rng.gen_range(0.25..=1.0) * config.wander_distance;
        let goal = ctx
            .bounds
            .contain_point(entity.position + Vec2::from_angle(angle) * distance);
        if let Some(prey) = entity.as_prey_mut() {
            prey.target_position = Some(goal);
        }
        return Transition::to_with(
            MOVING,
            StateData::default().with_field(PURPOSE, MovePurpose::Wander),
        );
    }

    Transition::stay(IDLE, data.clone())
}

fn moving_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    if let Some(threat) = detect_threat(entity, ctx) {
        return flee_from(threat);
    }

    let purpose = data.field::<MovePurpose>(PURPOSE).unwrap_or(MovePurpose::Wander);
    let radius = entity.entity_type().footprint_radius();
    let settle = match purpose {
        MovePurpose::Drink => Some((SectorKind::Water, DRINKING)),
        MovePurpose::Eat => Some((SectorKind::Grass, EATING)),
        MovePurpose::Wander => None,
    };
    if let Some((kind, next)) = settle {
        if ctx
            .environment
            .overlapping(kind, entity.position, radius, &ctx.bounds)
            .is_some()
        {
            return Transition::to(next);
        }
    }

    let Some(goal) = entity.as_prey().and_then(|p| p.target_position) else {
        return Transition::to(IDLE);
    };
    let config = &ctx.config.prey;
    let distance = steering::steer_towards(entity, goal, config.walk_acceleration, &ctx.bounds);
    if distance <= config.arrive_radius {
        // Reached the goal; a depleted or missing sector sends us back to idle
        return Transition::to(IDLE);
    }
    Transition::stay(MOVING, data.clone())
}

fn fleeing_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    let config = &ctx.config.prey;
    let nearest = steering::nearest(ctx.entities, entity.position, &ctx.bounds, |e| {
        e.is(EntityType::Lion)
    })
    .filter(|(_, _, d)| *d <= config.calm_radius);

    match nearest {
        Some((id, lion_position, _)) => {
            let stamina = entity.as_prey().map_or(100.0, |p| p.vitals.stamina);
            let factor = (stamina / 100.0).max(config.min_stamina_factor);
            steering::steer_away(entity, lion_position, config.flee_acceleration * factor, &ctx.bounds);
            let data = data.clone().with_field(THREAT, id);
            Transition::stay(FLEEING, data)
        }
        None if data.elapsed(ctx.now) >= config.flee_min_ms => {
            steering::halt(entity);
            Transition::to(IDLE)
        }
        None => {
            // Threat out of sight but dwell time not served: keep running
            let stamina = entity.as_prey().map_or(100.0, |p| p.vitals.stamina);
            let factor = (stamina / 100.0).max(config.min_stamina_factor);
            entity.acceleration = config.flee_acceleration * factor;
            Transition::stay(FLEEING, data.clone())
        }
    }
}

fn eating_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    if let Some(threat) = detect_threat(entity, ctx) {
        return flee_from(threat);
    }
    steering::halt(entity);

    let radius = entity.entity_type().footprint_radius();
    let Some(index) = ctx
        .environment
        .overlapping(SectorKind::Grass, entity.position, radius, &ctx.bounds)
    else {
        return Transition::to(IDLE);
    };

    let config = &ctx.config.prey;
    let dt = ctx.dt();
    let grazed = ctx.environment.graze(index, config.graze_depletion_per_sec * dt);
    let Some(prey) = entity.as_prey_mut() else {
        return Transition::to(IDLE);
    };
    if grazed > 0.0 {
        prey.vitals.hunger = (prey.vitals.hunger + config.eat_rate_per_sec * dt).min(100.0);
    }
    if prey.vitals.hunger >= config.full_threshold || grazed <= 0.0 {
        return Transition::to(IDLE);
    }
    Transition::stay(EATING, data.clone())
}

fn drinking_update(entity: &mut Entity, data: &StateData, ctx: &mut UpdateContext) -> Transition {
    if let Some(threat) = detect_threat(entity, ctx) {
        return flee_from(threat);
    }
    steering::halt(entity);

    let radius = entity.entity_type().footprint_radius();
    if ctx
        .environment
        .overlapping(SectorKind::Water, entity.position, radius, &ctx.bounds)
        .is_none()
    {
        return Transition::to(IDLE);
    }

    let config = &ctx.config.prey;
    let dt = ctx.dt();
    let Some(prey) = entity.as_prey_mut() else {
        return Transition::to(IDLE);
    };
    prey.vitals.thirst = (prey.vitals.thirst + config.drink_rate_per_sec * dt).min(100.0);
    if prey.vitals.thirst >= config.full_threshold {
        return Transition::to(IDLE);
    }
    Transition::stay(DRINKING, data.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::entity::{EntityData, EntityPatch};
    use crate::fsm::{advance, StateCursor};
    use crate::simulation::environment::Sector;
    use crate::simulation::state::{GameVariant, GameWorldState};

    fn world() -> GameWorldState {
        let mut config = SimulationConfig::chase();
        config.prey.wander_chance_per_sec = 0.0;
        GameWorldState::empty(GameVariant::Chase, config)
    }

    fn prey_at(pos: Vec2, facing: f32) -> Entity {
        let config = SimulationConfig::chase();
        let mut e = Entity::new(EntityId(999), EntityData::defaults(EntityType::Prey, &config));
        e.position = pos;
        e.direction = facing;
        e
    }

    #[test]
    fn test_peripheral_awareness_is_weaker() {
        let mut state = world();
        // Lion 130 units to the east: inside the full radius, outside the
        // peripheral one
        state
            .spawn(EntityType::Lion, EntityPatch::at(Vec2::new(330.0, 300.0)))
            .unwrap();
        let ctx = state.update_context(16.0);

        let facing_lion = prey_at(Vec2::new(200.0, 300.0), 0.0);
        let facing_away = prey_at(Vec2::new(200.0, 300.0), std::f32::consts::PI);
        assert!(detect_threat(&facing_lion, &ctx).is_some());
        assert!(detect_threat(&facing_away, &ctx).is_none());
    }

    #[test]
    fn test_flee_dwell_time() {
        let mut state = world();
        let mut prey = prey_at(Vec2::new(200.0, 300.0), 0.0);
        let mut ctx = state.update_context(16.0);
        let min_dwell = ctx.config.prey.flee_min_ms;

        // No lion around, but the dwell time has not elapsed
        let cursor = StateCursor {
            state: FLEEING.into(),
            data: StateData::entered(ctx.now - min_dwell / 2.0),
        };
        let out = advance(&STATES, &mut prey, cursor, &mut ctx);
        assert_eq!(out.state, FLEEING);

        let cursor = StateCursor {
            state: FLEEING.into(),
            data: StateData::entered(ctx.now - min_dwell),
        };
        let out = advance(&STATES, &mut prey, cursor, &mut ctx);
        assert_eq!(out.state, IDLE);
    }

    #[test]
    fn test_hungry_prey_heads_for_grass() {
        let mut state = world();
        state
            .environment
            .sectors
            .push(Sector::grass(Vec2::new(400.0, 300.0), 40.0, 40.0, 1.0));
        let mut prey = prey_at(Vec2::new(200.0, 300.0), 0.0);
        if let Some(p) = prey.as_prey_mut() {
            p.vitals.hunger = 10.0;
        }
        let mut ctx = state.update_context(16.0);

        let out = advance(&STATES, &mut prey, StateCursor::new(IDLE, 0.0), &mut ctx);
        assert_eq!(out.state, MOVING);
        assert_eq!(out.data.field::<MovePurpose>(PURPOSE), Some(MovePurpose::Eat));
        assert_eq!(prey.as_prey().unwrap().target_position, Some(Vec2::new(420.0, 320.0)));
    }
}
