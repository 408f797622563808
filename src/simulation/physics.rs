//! Force-based physics integration
//!
//! Velocity carries inertia; facing does not. Damping is a force
//! proportional to `-velocity`, so a constant thrust `a` settles at a terminal
//! speed of `a / damping`.

use crate::core::config::PhysicsConfig;
use crate::core::types::{SimTime, Vec2};
use crate::entity::{DebuffKind, Entity};
use crate::spatial::bounds::WorldBounds;

/// Result of integrating one entity for one step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntegrationResult {
    pub expired_debuffs: usize,
    /// Position or velocity came out non-finite and was reset
    pub recovered: bool,
}

/// Integrate one entity over `dt` seconds
///
/// Order: drag, thrust, slow debuffs, debuff pruning, force sum, facing
/// snap, epsilon snap, position, containment, force clear.
pub fn integrate(
    entity: &mut Entity,
    config: &PhysicsConfig,
    bounds: &WorldBounds,
    now: SimTime,
    dt: f32,
) -> IntegrationResult {
    let mut result = IntegrationResult::default();

    entity.forces.push(entity.velocity * -config.damping);
    entity
        .forces
        .push(Vec2::from_angle(entity.direction) * entity.acceleration);

    let slows = entity
        .debuffs
        .iter()
        .filter(|d| d.kind == DebuffKind::Slow && !d.is_expired(now))
        .count();
    if slows > 0 {
        entity.velocity = entity.velocity * config.slow_factor.powi(slows as i32);
    }

    let before = entity.debuffs.len();
    entity.debuffs.retain(|d| !d.is_expired(now));
    result.expired_debuffs = before - entity.debuffs.len();

    let total: Vec2 = entity.forces.iter().copied().sum();
    entity.velocity += total;

    entity.direction = entity.target_direction;

    if entity.velocity.length() < config.velocity_epsilon {
        entity.velocity = Vec2::ZERO;
    }

    entity.position += entity.velocity * dt;

    if !entity.velocity.is_finite() {
        entity.velocity = Vec2::ZERO;
        result.recovered = true;
    }
    if !entity.position.is_finite() {
        result.recovered = true;
    }
    let (position, velocity) =
        bounds.contain(entity.position, entity.velocity, config.boundary_restitution);
    entity.position = position;
    entity.velocity = velocity;

    entity.forces.clear();

    if result.recovered {
        tracing::warn!("{:?} {:?} produced non-finite motion", entity.entity_type(), entity.id);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::EntityId;
    use crate::entity::{Debuff, EntityData, EntityType};
    use crate::spatial::bounds::BoundaryMode;

    fn entity() -> Entity {
        let config = SimulationConfig::default();
        let mut e = Entity::new(EntityId(1), EntityData::defaults(EntityType::Prey, &config));
        e.position = Vec2::new(50.0, 50.0);
        e
    }

    fn bounds(mode: BoundaryMode) -> WorldBounds {
        WorldBounds::new(100.0, 100.0, mode)
    }

    #[test]
    fn test_terminal_speed_is_thrust_over_damping() {
        let config = PhysicsConfig::default();
        let mut e = entity();
        e.acceleration = 10.0;
        for _ in 0..500 {
            integrate(&mut e, &config, &bounds(BoundaryMode::Wrap), 0.0, 0.016);
        }
        let expected = 10.0 / config.damping;
        assert!((e.velocity.length() - expected).abs() < 0.01);
    }

    #[test]
    fn test_direction_snaps_without_inertia() {
        let config = PhysicsConfig::default();
        let mut e = entity();
        e.target_direction = 1.25;
        integrate(&mut e, &config, &bounds(BoundaryMode::Wrap), 0.0, 0.016);
        assert_eq!(e.direction, 1.25);
    }

    #[test]
    fn test_small_velocity_snaps_to_zero() {
        let config = PhysicsConfig::default();
        let mut e = entity();
        e.velocity = Vec2::new(0.3, 0.0);
        integrate(&mut e, &config, &bounds(BoundaryMode::Wrap), 0.0, 1.0);
        assert_eq!(e.velocity, Vec2::ZERO);
        assert_eq!(e.position, Vec2::new(50.0, 50.0));
    }

    #[test]
    fn test_slows_compound() {
        let config = PhysicsConfig::default();
        let mut one = entity();
        let mut two = entity();
        for e in [&mut one, &mut two] {
            e.velocity = Vec2::new(100.0, 0.0);
            e.add_debuff(Debuff::new(DebuffKind::Slow, 0.0, 1000.0));
        }
        two.add_debuff(Debuff::new(DebuffKind::Slow, 0.0, 1000.0));

        integrate(&mut one, &config, &bounds(BoundaryMode::Wrap), 10.0, 0.0);
        integrate(&mut two, &config, &bounds(BoundaryMode::Wrap), 10.0, 0.0);

        // Drag is queued from the unslowed velocity, then slows apply
        let f = config.slow_factor;
        let drag = 100.0 * config.damping;
        assert!((one.velocity.x - (100.0 * f - drag)).abs() < 1e-3);
        assert!((two.velocity.x - (100.0 * f * f - drag)).abs() < 1e-3);
    }

    #[test]
    fn test_expired_debuffs_pruned() {
        let config = PhysicsConfig::default();
        let mut e = entity();
        e.add_debuff(Debuff::new(DebuffKind::Slow, 0.0, 100.0));
        let r = integrate(&mut e, &config, &bounds(BoundaryMode::Wrap), 100.0, 0.016);
        assert_eq!(r.expired_debuffs, 1);
        assert!(e.debuffs.is_empty());
    }

    #[test]
    fn test_forces_drained_and_contained() {
        let config = PhysicsConfig::default();
        let mut e = entity();
        e.position = Vec2::new(99.0, 50.0);
        e.apply_force(Vec2::new(200.0, 0.0));
        integrate(&mut e, &config, &bounds(BoundaryMode::Wrap), 0.0, 0.1);
        assert!(e.forces.is_empty());
        assert!(e.position.x >= 0.0 && e.position.x < 100.0);

        let mut c = entity();
        c.position = Vec2::new(99.0, 50.0);
        c.apply_force(Vec2::new(200.0, 0.0));
        integrate(&mut c, &config, &bounds(BoundaryMode::Clamp), 0.0, 0.1);
        assert_eq!(c.position.x, 100.0);
        assert!(c.velocity.x < 0.0);
    }
}
