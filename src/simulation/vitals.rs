//! Per-kind post-update hooks: metabolism, aging, decay
//!
//! Run after physics and the FSM/behavior step for each entity. Every hook
//! leaves its stats clamped to [0, 100].

use rand::Rng;

use crate::core::types::{EntityId, Vec2};
use crate::entity::kinds::clamp_stat;
use crate::entity::{AgentData, Entity, EntityData, EntityPatch, EntityType, Gender};
use crate::fsm::prey;
use crate::simulation::context::UpdateContext;
use crate::simulation::notifications::NotificationKind;

pub fn post_update(entity: &mut Entity, ctx: &mut UpdateContext) {
    if entity.is(EntityType::Human) {
        human_update(entity, ctx);
        return;
    }
    let dt = ctx.dt();
    let fleeing = entity.in_state(prey::FLEEING);

    match &mut entity.data {
        EntityData::Lion(lion) => {
            lion.hunger = clamp_stat(lion.hunger - ctx.config.lion.hunger_decay_per_sec * dt);
            lion.health = clamp_stat(lion.health);
        }
        EntityData::Prey(p) => {
            let config = &ctx.config.prey;
            let v = &mut p.vitals;
            v.hunger -= config.hunger_decay_per_sec * dt;
            v.thirst -= config.thirst_decay_per_sec * dt;
            if fleeing {
                v.stamina -= config.stamina_drain_per_sec * dt;
            } else {
                v.stamina += config.stamina_regen_per_sec * dt;
            }
            if v.hunger <= 0.0 || v.thirst <= 0.0 {
                v.health -= config.starvation_damage_per_sec * dt;
            }
            v.clamp();
        }
        EntityData::Hunter(h) => {
            h.health = clamp_stat(h.health);
        }
        EntityData::Carrion(c) => {
            c.decay = (c.decay - ctx.config.carrion.decay_per_sec * dt).max(0.0);
            c.food = c.food.max(0.0);
        }
        EntityData::Predator(agent) => {
            let config = &ctx.config.predator;
            agent.hunger -= config.hunger_decay_per_sec * dt;
            if agent.hunger <= 0.0 {
                agent.health -= config.starvation_damage_per_sec * dt;
            }
            agent.clamp();
        }
        EntityData::Human(_) => {}
    }
}

fn human_update(entity: &mut Entity, ctx: &mut UpdateContext) {
    let id = entity.id;
    let position = entity.position;
    let dt = ctx.dt();
    let config = &ctx.config.tribe;
    let Some(agent) = entity.as_agent_mut() else {
        return;
    };

    agent.age += (ctx.delta_ms / config.year_ms) as f32;
    agent.hunger -= config.hunger_decay_per_sec * dt;
    if agent.hunger <= 0.0 {
        agent.health -= config.starvation_damage_per_sec * dt;
    }
    if agent.age >= config.max_age {
        agent.health = 0.0;
    }
    agent.clamp();

    let due = agent
        .pregnancy
        .is_some_and(|p| ctx.now - p.since >= config.gestation_ms);
    if due && agent.health > 0.0 {
        agent.pregnancy = None;
        let leader = agent.leader;
        give_birth(id, leader, position, ctx);
    }

    if entity.as_agent().is_some_and(|a| a.is_leader(id)) {
        designate_heir(entity, ctx);
    }
}

fn give_birth(mother: EntityId, leader: Option<EntityId>, position: Vec2, ctx: &mut UpdateContext) {
    let gender = Gender::random(&mut *ctx.rng);
    let mut child = AgentData::new(ctx.config.tribe.max_health, 0.0, gender);
    child.leader = leader;
    child.parent = Some(mother);

    let offset = Vec2::new(
        ctx.rng.gen_range(-5.0..=5.0),
        ctx.rng.gen_range(-5.0..=5.0),
    );
    let at = ctx.bounds.contain_point(position + offset);
    if let Some(child_id) = ctx.spawn(
        EntityType::Human,
        EntityPatch::at(at).with_data(EntityData::Human(child)),
    ) {
        ctx.notify(NotificationKind::Info, "A child is born", at);
        tracing::debug!("human {:?} born to {:?}", child_id, mother);
    }
}

/// Keep a living, loyal heir on every leader; the oldest adult wins
fn designate_heir(entity: &mut Entity, ctx: &UpdateContext) {
    let id = entity.id;
    let adult_age = ctx.config.tribe.adult_age;
    let current = entity.as_agent().and_then(|a| a.heir);

    let still_valid = current
        .and_then(|heir| ctx.entities.get(heir))
        .and_then(|e| e.as_agent())
        .is_some_and(|a| a.leader == Some(id) && a.age >= adult_age);
    if still_valid {
        return;
    }

    let heir = ctx
        .entities
        .of_type(EntityType::Human)
        .filter_map(|e| e.as_agent().map(|a| (e.id, a)))
        .filter(|(_, a)| a.leader == Some(id) && a.age >= adult_age)
        .max_by(|a, b| a.1.age.total_cmp(&b.1.age).then(b.0.cmp(&a.0)))
        .map(|(heir_id, _)| heir_id);

    if let Some(agent) = entity.as_agent_mut() {
        agent.heir = heir;
    }
}
