//! Simulation configuration with documented constants
//!
//! All tuning numbers live here, grouped by the system that reads them.
//! Units: distances in world units, rates "per second" of simulation time,
//! durations in milliseconds, behavior-tree windows in ticks.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{Result, SimError};
use crate::spatial::bounds::BoundaryMode;

/// Top-level configuration for one world
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub physics: PhysicsConfig,
    pub lion: LionConfig,
    pub prey: PreyConfig,
    pub hunter: HunterConfig,
    pub carrion: CarrionConfig,
    pub interaction: InteractionConfig,
    pub spawner: SpawnerConfig,
    pub environment: EnvironmentConfig,
    pub tribe: TribeConfig,
    pub predator: PredatorConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    /// Wrap-around (chase game) or clamp-and-reflect (tribal game)
    pub boundary: BoundaryMode,
    /// Fixed simulation step used by the headless runner
    pub step_ms: f64,
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            boundary: BoundaryMode::Wrap,
            step_ms: 16.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Fraction of velocity removed each tick by drag
    ///
    /// Terminal speed for a given thrust is `acceleration / damping`, so at
    /// 0.1 an acceleration of 10 settles at 100 units/s.
    pub damping: f32,
    /// Speeds below this snap to zero (prevents endless drift)
    pub velocity_epsilon: f32,
    /// Velocity multiplier applied per tick for each active slow debuff
    pub slow_factor: f32,
    /// Fraction of speed kept when reflecting off a clamped boundary
    pub boundary_restitution: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            damping: 0.1,
            velocity_epsilon: 0.5,
            slow_factor: 0.9,
            boundary_restitution: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LionConfig {
    pub walk_acceleration: f32,
    pub chase_acceleration: f32,
    /// Sneaking thrust while in ambush; much lower top speed than chasing
    pub ambush_acceleration: f32,
    /// Thrust right after springing out of an ambush
    pub boost_acceleration: f32,
    pub boost_duration_ms: f64,
    pub arrive_radius: f32,
    /// Carrion closer than this lets the lion enter `Eating`
    pub eating_range: f32,
    pub hunger_decay_per_sec: f32,
    pub max_health: f32,
}

impl Default for LionConfig {
    fn default() -> Self {
        Self {
            walk_acceleration: 6.0,
            chase_acceleration: 12.0,
            ambush_acceleration: 1.5,
            boost_acceleration: 20.0,
            boost_duration_ms: 1500.0,
            arrive_radius: 10.0,
            eating_range: 25.0,
            hunger_decay_per_sec: 0.8,
            max_health: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreyConfig {
    pub walk_acceleration: f32,
    pub flee_acceleration: f32,
    /// Lions closer than this trigger fleeing when the prey faces them
    pub threat_radius: f32,
    /// Multiplier on `threat_radius` when the lion is behind the prey
    pub peripheral_factor: f32,
    /// Fleeing only ends once no lion is within this radius
    pub calm_radius: f32,
    /// Minimum dwell in `Fleeing` (hysteresis against flicker)
    pub flee_min_ms: f64,
    /// Below this thirst level prey seek water
    pub thirst_threshold: f32,
    /// Below this hunger level prey seek grass
    pub hunger_threshold: f32,
    /// Eating/drinking stops at this level
    pub full_threshold: f32,
    pub hunger_decay_per_sec: f32,
    pub thirst_decay_per_sec: f32,
    pub drink_rate_per_sec: f32,
    pub eat_rate_per_sec: f32,
    /// Grass density removed per second of grazing (density is 0..1)
    pub graze_depletion_per_sec: f32,
    pub stamina_drain_per_sec: f32,
    pub stamina_regen_per_sec: f32,
    /// Health lost per second while hunger or thirst is empty
    pub starvation_damage_per_sec: f32,
    /// Chance per second that an idle prey starts wandering
    pub wander_chance_per_sec: f32,
    pub wander_distance: f32,
    /// Flee thrust never drops below this fraction, even when exhausted
    pub min_stamina_factor: f32,
    pub arrive_radius: f32,
}

impl Default for PreyConfig {
    fn default() -> Self {
        Self {
            walk_acceleration: 4.0,
            flee_acceleration: 11.0,
            threat_radius: 160.0,
            peripheral_factor: 0.6,
            calm_radius: 220.0,
            flee_min_ms: 2000.0,
            thirst_threshold: 40.0,
            hunger_threshold: 40.0,
            full_threshold: 95.0,
            hunger_decay_per_sec: 0.4,
            thirst_decay_per_sec: 0.6,
            drink_rate_per_sec: 12.0,
            eat_rate_per_sec: 10.0,
            graze_depletion_per_sec: 0.05,
            stamina_drain_per_sec: 8.0,
            stamina_regen_per_sec: 4.0,
            starvation_damage_per_sec: 2.0,
            wander_chance_per_sec: 0.3,
            wander_distance: 120.0,
            min_stamina_factor: 0.4,
            arrive_radius: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HunterConfig {
    pub patrol_acceleration: f32,
    pub chase_acceleration: f32,
    pub detection_range: f32,
    /// Full field-of-view cone in radians
    pub field_of_view: f32,
    /// Detection range multiplier against a lion in ambush
    pub ambush_detection_factor: f32,
    pub firing_range: f32,
    /// Chasing gives up beyond this distance
    pub lose_range: f32,
    pub fire_interval_ms: f64,
    pub reload_time_ms: f64,
    pub max_ammunition: u32,
    pub accuracy: f32,
    /// Hit chance lost at maximum firing range (linear in distance)
    pub distance_penalty: f32,
    pub moving_target_penalty: f32,
    /// Targets faster than this count as moving
    pub moving_speed_threshold: f32,
    /// Hit chance multiplier against a lion in ambush
    pub ambush_hit_factor: f32,
    pub shot_damage: f32,
    pub shot_slow_ms: f64,
    /// Chance to pause at a patrol point or after a failed chase
    pub wait_chance: f64,
    pub wait_min_ms: f64,
    pub wait_max_ms: f64,
    pub chase_timeout_ms: f64,
    pub waypoint_radius: f32,
    pub max_health: f32,
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            patrol_acceleration: 4.0,
            chase_acceleration: 8.0,
            detection_range: 260.0,
            field_of_view: 2.1,
            ambush_detection_factor: 0.5,
            firing_range: 180.0,
            lose_range: 400.0,
            fire_interval_ms: 900.0,
            reload_time_ms: 2500.0,
            max_ammunition: 4,
            accuracy: 0.7,
            distance_penalty: 0.4,
            moving_target_penalty: 0.25,
            moving_speed_threshold: 30.0,
            ambush_hit_factor: 0.5,
            shot_damage: 12.0,
            shot_slow_ms: 1200.0,
            wait_chance: 0.35,
            wait_min_ms: 1000.0,
            wait_max_ms: 3000.0,
            chase_timeout_ms: 12000.0,
            waypoint_radius: 15.0,
            max_health: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrionConfig {
    pub max_food: f32,
    pub max_decay: f32,
    pub decay_per_sec: f32,
}

impl Default for CarrionConfig {
    fn default() -> Self {
        Self {
            max_food: 100.0,
            max_decay: 100.0,
            decay_per_sec: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub collision_radius: f32,
    /// Push magnitude is `collision_strength / distance`
    pub collision_strength: f32,
    /// Distance floor for the push so overlapping entities don't explode apart
    pub min_separation: f32,
    pub lion_attack_range: f32,
    pub lion_damage_per_sec: f32,
    pub prey_slow_ms: f64,
    pub pull_strength: f32,
    pub carrion_eat_rate_per_sec: f32,
    /// Lion hunger restored per unit of carrion food eaten
    pub carrion_nutrition: f32,
    pub hunter_contact_range: f32,
    pub hunter_damage_per_sec: f32,
    pub lion_hunger_from_hunter_per_sec: f32,
    pub hunter_slow_ms: f64,
    /// Chance per contact tick to knock a shooting hunter back into chasing
    pub shooting_interrupt_chance: f64,
    pub predator_contact_range: f32,
    pub predator_damage_per_sec: f32,
    pub predator_hunger_gain_per_sec: f32,
    pub human_slow_ms: f64,
    /// Narrow pair candidates with a spatial hash instead of the full scan
    pub use_broad_phase: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            collision_radius: 14.0,
            collision_strength: 30.0,
            min_separation: 1.0,
            lion_attack_range: 20.0,
            lion_damage_per_sec: 35.0,
            prey_slow_ms: 800.0,
            pull_strength: 1.5,
            carrion_eat_rate_per_sec: 20.0,
            carrion_nutrition: 0.8,
            hunter_contact_range: 20.0,
            hunter_damage_per_sec: 25.0,
            lion_hunger_from_hunter_per_sec: 2.0,
            hunter_slow_ms: 1000.0,
            shooting_interrupt_chance: 0.3,
            predator_contact_range: 18.0,
            predator_damage_per_sec: 20.0,
            predator_hunger_gain_per_sec: 6.0,
            human_slow_ms: 800.0,
            use_broad_phase: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub initial_prey: u32,
    pub initial_hunters: u32,
    pub prey_interval_ms: f64,
    pub prey_cap: usize,
    pub hunter_interval_ms: f64,
    pub hunter_cap: usize,
    pub patrol_points_min: usize,
    pub patrol_points_max: usize,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            initial_prey: 12,
            initial_hunters: 2,
            prey_interval_ms: 6000.0,
            prey_cap: 25,
            hunter_interval_ms: 20000.0,
            hunter_cap: 4,
            patrol_points_min: 3,
            patrol_points_max: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub grass_clusters: u32,
    pub water_clusters: u32,
    pub sectors_per_cluster: u32,
    pub sector_min_size: f32,
    pub sector_max_size: f32,
    /// How far sectors scatter from their cluster centre
    pub cluster_spread: f32,
    pub grass_regen_per_sec: f32,
    pub grass_max_density: f32,
    pub water_min_depth: f32,
    pub water_max_depth: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            grass_clusters: 5,
            water_clusters: 3,
            sectors_per_cluster: 4,
            sector_min_size: 40.0,
            sector_max_size: 90.0,
            cluster_spread: 120.0,
            grass_regen_per_sec: 0.01,
            grass_max_density: 1.0,
            water_min_depth: 0.5,
            water_max_depth: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TribeConfig {
    pub initial_tribes: u32,
    pub initial_size: u32,
    /// Simulated milliseconds per year of agent age
    pub year_ms: f64,
    pub adult_age: f32,
    pub max_age: f32,
    pub walk_acceleration: f32,
    pub flee_acceleration: f32,
    pub flee_radius: f32,
    pub follow_distance: f32,
    pub arrival_radius: f32,
    pub hunger_decay_per_sec: f32,
    pub forage_threshold: f32,
    pub forage_rate_per_sec: f32,
    pub graze_depletion_per_sec: f32,
    pub starvation_damage_per_sec: f32,
    pub max_health: f32,
    // === SPLIT ===
    pub split_min_tribe_size: usize,
    /// Candidate's family must be at least this share of the tribe
    pub split_family_fraction: f32,
    pub split_distance: f32,
    pub split_eligibility_cache_ticks: u64,
    // === MIGRATION ===
    /// Outer rate limit: the whole migration subtree is skipped in between
    pub migration_cooldown_ticks: u64,
    /// How long a migration decision (either way) is replayed; longer than
    /// the cooldown so gated evaluations mostly hit the cache
    pub migration_decision_cache_ticks: u64,
    /// Minimum simulated time between two migrations of the same tribe
    pub migration_interval_ms: f64,
    pub migration_min_distance: f32,
    // === PROCREATION ===
    pub procreation_cooldown_ticks: u64,
    pub procreation_hunger_min: f32,
    pub fertile_until_age: f32,
    /// A partner must be within this distance
    pub partner_range: f32,
    pub gestation_ms: f64,
}

impl Default for TribeConfig {
    fn default() -> Self {
        Self {
            initial_tribes: 2,
            initial_size: 10,
            year_ms: 5000.0,
            adult_age: 16.0,
            max_age: 70.0,
            walk_acceleration: 3.5,
            flee_acceleration: 7.0,
            flee_radius: 120.0,
            follow_distance: 80.0,
            arrival_radius: 20.0,
            hunger_decay_per_sec: 0.5,
            forage_threshold: 50.0,
            forage_rate_per_sec: 8.0,
            graze_depletion_per_sec: 0.03,
            starvation_damage_per_sec: 2.0,
            max_health: 100.0,
            split_min_tribe_size: 10,
            split_family_fraction: 0.25,
            split_distance: 300.0,
            split_eligibility_cache_ticks: 60,
            migration_cooldown_ticks: 30,
            migration_decision_cache_ticks: 240,
            migration_interval_ms: 60000.0,
            migration_min_distance: 250.0,
            procreation_cooldown_ticks: 900,
            procreation_hunger_min: 60.0,
            fertile_until_age: 45.0,
            partner_range: 60.0,
            gestation_ms: 20000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredatorConfig {
    pub initial_count: u32,
    /// Predators hunt while hunger is below this
    pub hunt_threshold: f32,
    pub sense_range: f32,
    pub hunt_acceleration: f32,
    pub roam_acceleration: f32,
    pub hunger_decay_per_sec: f32,
    pub starvation_damage_per_sec: f32,
    pub search_cache_ticks: u64,
    pub roam_cooldown_ticks: u64,
    pub max_health: f32,
}

impl Default for PredatorConfig {
    fn default() -> Self {
        Self {
            initial_count: 3,
            hunt_threshold: 70.0,
            sense_range: 250.0,
            hunt_acceleration: 9.0,
            roam_acceleration: 3.0,
            hunger_decay_per_sec: 0.6,
            starvation_damage_per_sec: 2.0,
            search_cache_ticks: 15,
            roam_cooldown_ticks: 90,
            max_health: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub duration_ms: f64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { duration_ms: 1500.0 }
    }
}

impl SimulationConfig {
    /// Predator-prey chase world: wrap-around, lion/prey/hunters
    pub fn chase() -> Self {
        Self::default()
    }

    /// Tribal survival world: clamped boundaries, humans/predators
    pub fn tribal() -> Self {
        let mut config = Self::default();
        config.world.width = 1600.0;
        config.world.height = 1200.0;
        config.world.boundary = BoundaryMode::Clamp;
        config.environment.water_clusters = 2;
        config
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: String) -> Result<()> {
            Err(SimError::InvalidConfig(msg))
        }

        if !(self.world.width > 0.0
            && self.world.height > 0.0
            && self.world.width.is_finite()
            && self.world.height.is_finite())
        {
            return invalid(format!(
                "world size must be positive, got {}x{}",
                self.world.width, self.world.height
            ));
        }
        if !(self.world.step_ms > 0.0) {
            return invalid(format!("step_ms must be positive, got {}", self.world.step_ms));
        }
        if !(self.physics.damping > 0.0 && self.physics.damping <= 1.0) {
            return invalid(format!("damping must be in (0, 1], got {}", self.physics.damping));
        }
        if !(0.0..=1.0).contains(&self.physics.slow_factor) {
            return invalid(format!(
                "slow_factor must be in [0, 1], got {}",
                self.physics.slow_factor
            ));
        }
        let probabilities = [
            ("hunter.wait_chance", self.hunter.wait_chance),
            (
                "interaction.shooting_interrupt_chance",
                self.interaction.shooting_interrupt_chance,
            ),
            ("hunter.accuracy", self.hunter.accuracy as f64),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{} must be a probability, got {}", name, p));
            }
        }
        if self.hunter.max_ammunition == 0 {
            return invalid("hunter.max_ammunition must be at least 1".into());
        }
        if self.hunter.wait_min_ms > self.hunter.wait_max_ms {
            return invalid("hunter.wait_min_ms exceeds wait_max_ms".into());
        }
        if self.spawner.patrol_points_min == 0
            || self.spawner.patrol_points_min > self.spawner.patrol_points_max
        {
            return invalid("spawner patrol point range is empty".into());
        }
        let env = &self.environment;
        if !(env.sector_min_size >= 0.0
            && env.sector_min_size <= env.sector_max_size
            && env.sector_max_size.is_finite())
        {
            return invalid(format!(
                "environment sector size range {}..={} is empty",
                env.sector_min_size, env.sector_max_size
            ));
        }
        if !(env.water_min_depth >= 0.0
            && env.water_min_depth <= env.water_max_depth
            && env.water_max_depth.is_finite())
        {
            return invalid(format!(
                "environment water depth range {}..={} is empty",
                env.water_min_depth, env.water_max_depth
            ));
        }
        if !(env.cluster_spread >= 0.0 && env.cluster_spread.is_finite()) {
            return invalid(format!(
                "environment.cluster_spread must be non-negative, got {}",
                env.cluster_spread
            ));
        }
        if !(self.tribe.year_ms > 0.0) {
            return invalid("tribe.year_ms must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(SimulationConfig::chase().validate().is_ok());
        assert!(SimulationConfig::tribal().validate().is_ok());
        assert_eq!(SimulationConfig::tribal().world.boundary, BoundaryMode::Clamp);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [world]
            width = 500.0
            boundary = "clamp"

            [hunter]
            max_ammunition = 2
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.world.width, 500.0);
        assert_eq!(config.world.boundary, BoundaryMode::Clamp);
        assert_eq!(config.hunter.max_ammunition, 2);
        // Untouched fields keep defaults
        assert_eq!(config.world.height, 800.0);
        assert_eq!(config.hunter.reload_time_ms, 2500.0);
    }

    #[test]
    fn test_invalid_damping_rejected() {
        let mut config = SimulationConfig::default();
        config.physics.damping = 0.0;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_bad_probability_rejected() {
        let err = SimulationConfig::from_toml_str("[hunter]\nwait_chance = 1.5\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_inverted_water_depth_rejected() {
        let err = SimulationConfig::from_toml_str(
            "[environment]\nwater_min_depth = 5.0\nwater_max_depth = 1.0\n",
        );
        assert!(matches!(err, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_negative_cluster_spread_rejected() {
        let err = SimulationConfig::from_toml_str("[environment]\ncluster_spread = -10.0\n");
        assert!(matches!(err, Err(SimError::InvalidConfig(_))));

        let mut config = SimulationConfig::tribal();
        config.environment.cluster_spread = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_terminal_speed_ordering() {
        // Same damping, different thrust: ambush must be visibly slower
        let c = SimulationConfig::default();
        let ambush_top = c.lion.ambush_acceleration / c.physics.damping;
        let chase_top = c.lion.chase_acceleration / c.physics.damping;
        assert!(ambush_top * 4.0 < chase_top);
    }
}
