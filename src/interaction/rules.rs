//! The standard interaction rules
//!
//! Rates are per second and scaled by the step length, so a contact that
//! lasts one simulated second deals the configured amount regardless of the
//! tick rate.

use rand::Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{Vec2, VECTOR_EPSILON};
use crate::entity::kinds::{clamp_stat, LionAction};
use crate::entity::{DebuffKind, Entity, EntityType};
use crate::fsm::hunter::SHOOTING;
use crate::fsm::lion::EATING;
use crate::interaction::InteractionRule;
use crate::simulation::context::InteractionContext;

pub fn standard_rules(config: &SimulationConfig) -> Vec<InteractionRule> {
    let c = &config.interaction;
    vec![
        InteractionRule {
            name: "collision",
            source: None,
            target: None,
            range: c.collision_radius,
            check: collision_check,
            perform: collision_push,
        },
        InteractionRule {
            name: "lion_prey",
            source: Some(EntityType::Lion),
            target: Some(EntityType::Prey),
            range: c.lion_attack_range,
            check: lion_prey_check,
            perform: lion_prey_attack,
        },
        InteractionRule {
            name: "lion_carrion",
            source: Some(EntityType::Lion),
            target: Some(EntityType::Carrion),
            range: config.lion.eating_range,
            check: lion_carrion_check,
            perform: lion_carrion_feed,
        },
        InteractionRule {
            name: "hunter_lion",
            source: Some(EntityType::Hunter),
            target: Some(EntityType::Lion),
            range: c.hunter_contact_range,
            check: hunter_lion_check,
            perform: hunter_lion_struggle,
        },
        InteractionRule {
            name: "predator_human",
            source: Some(EntityType::Predator),
            target: Some(EntityType::Human),
            range: c.predator_contact_range,
            check: predator_human_check,
            perform: predator_human_attack,
        },
    ]
}

fn within(a: &Entity, b: &Entity, range: f32, ctx: &InteractionContext) -> bool {
    ctx.bounds.distance(a.position, b.position) < range
}

// === COLLISION ===

pub fn collision_check(a: &Entity, b: &Entity, ctx: &InteractionContext) -> bool {
    !a.is(EntityType::Carrion)
        && !b.is(EntityType::Carrion)
        && within(a, b, ctx.config.interaction.collision_radius, ctx)
}

/// Push `b` away from `a`, harder the closer they are
///
/// Coincident entities separate along x, in opposite directions for the
/// two orderings of the pair.
pub fn collision_push(a: &mut Entity, b: &mut Entity, ctx: &mut InteractionContext) {
    let config = &ctx.config.interaction;
    let delta = ctx.bounds.delta(a.position, b.position);
    let distance = delta.length();
    let normal = if distance > VECTOR_EPSILON {
        delta.normalize()
    } else if a.id < b.id {
        Vec2::new(1.0, 0.0)
    } else {
        Vec2::new(-1.0, 0.0)
    };
    b.apply_force(normal * (config.collision_strength / distance.max(config.min_separation)));
}

// === LION x PREY ===

fn lion_prey_check(lion: &Entity, prey: &Entity, ctx: &InteractionContext) -> bool {
    lion.as_lion().is_some_and(|l| l.action == Some(LionAction::Attack))
        && within(lion, prey, ctx.config.interaction.lion_attack_range, ctx)
}

/// Bite: damage, slow, and drag the prey toward the lion
fn lion_prey_attack(lion: &mut Entity, prey: &mut Entity, ctx: &mut InteractionContext) {
    let config = &ctx.config.interaction;
    let dt = ctx.dt();
    if let Some(p) = prey.as_prey_mut() {
        p.vitals.health = clamp_stat(p.vitals.health - config.lion_damage_per_sec * dt);
    }
    prey.refresh_debuff(DebuffKind::Slow, ctx.now, config.prey_slow_ms);
    let pull = ctx.bounds.delta(prey.position, lion.position).normalize();
    prey.apply_force(pull * config.pull_strength);
}

// === LION x CARRION ===

fn lion_carrion_check(lion: &Entity, carrion: &Entity, ctx: &InteractionContext) -> bool {
    lion.in_state(EATING)
        && carrion.as_carrion().is_some_and(|c| c.food > 0.0)
        && ctx.bounds.distance(lion.position, carrion.position) <= ctx.config.lion.eating_range
}

/// Eat at most `carrion_eat_rate_per_sec * dt` this tick
fn lion_carrion_feed(lion: &mut Entity, carrion: &mut Entity, ctx: &mut InteractionContext) {
    let config = &ctx.config.interaction;
    let Some(c) = carrion.as_carrion_mut() else {
        return;
    };
    let eaten = c.food.min(config.carrion_eat_rate_per_sec * ctx.dt());
    c.food -= eaten;
    if let Some(l) = lion.as_lion_mut() {
        l.hunger = clamp_stat(l.hunger + eaten * config.carrion_nutrition);
    }
}

// === HUNTER x LION ===

fn hunter_lion_check(hunter: &Entity, lion: &Entity, ctx: &InteractionContext) -> bool {
    within(hunter, lion, ctx.config.interaction.hunter_contact_range, ctx)
}

/// The lion mauls the hunter; a shooting hunter may lose its aim
fn hunter_lion_struggle(hunter: &mut Entity, lion: &mut Entity, ctx: &mut InteractionContext) {
    let config = &ctx.config.interaction;
    let dt = ctx.dt();
    let shooting = hunter.in_state(SHOOTING);

    if let Some(h) = hunter.as_hunter_mut() {
        h.health = clamp_stat(h.health - config.hunter_damage_per_sec * dt);
    }
    if let Some(l) = lion.as_lion_mut() {
        l.hunger = clamp_stat(l.hunger + config.lion_hunger_from_hunter_per_sec * dt);
    }
    hunter.refresh_debuff(DebuffKind::Slow, ctx.now, config.hunter_slow_ms);

    if shooting && ctx.rng.gen_bool(config.shooting_interrupt_chance) {
        if let Some(h) = hunter.as_hunter_mut() {
            h.interrupted = true;
        }
        tracing::debug!("hunter {:?} interrupted by lion {:?}", hunter.id, lion.id);
    }
}

// === PREDATOR x HUMAN ===

fn predator_human_check(predator: &Entity, human: &Entity, ctx: &InteractionContext) -> bool {
    within(predator, human, ctx.config.interaction.predator_contact_range, ctx)
}

fn predator_human_attack(predator: &mut Entity, human: &mut Entity, ctx: &mut InteractionContext) {
    let config = &ctx.config.interaction;
    let dt = ctx.dt();
    if let Some(h) = human.as_agent_mut() {
        h.health = clamp_stat(h.health - config.predator_damage_per_sec * dt);
    }
    human.refresh_debuff(DebuffKind::Slow, ctx.now, config.human_slow_ms);
    if let Some(p) = predator.as_agent_mut() {
        p.hunger = clamp_stat(p.hunger + config.predator_hunger_gain_per_sec * dt);
    }
}
