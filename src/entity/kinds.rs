//! Type-specific entity payloads

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ai::blackboard::Blackboard;
use crate::core::config::SimulationConfig;
use crate::core::types::{EntityId, SimTime, Vec2};

/// Upper bound of every vitality stat
pub const STAT_MAX: f32 = 100.0;

/// Clamp a vitality stat into [0, 100]; NaN collapses to 0
#[inline]
pub fn clamp_stat(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, STAT_MAX)
    }
}

/// Where a lion (or any steering agent) wants to go
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub entity_id: Option<EntityId>,
    pub position: Option<Vec2>,
}

impl Target {
    pub fn entity(id: EntityId) -> Self {
        Self { entity_id: Some(id), position: None }
    }

    pub fn position(pos: Vec2) -> Self {
        Self { entity_id: None, position: Some(pos) }
    }
}

/// High-level intent set by the player for a lion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LionAction {
    Walk,
    Attack,
    Ambush,
    Eat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LionData {
    pub target: Option<Target>,
    pub action: Option<LionAction>,
    pub hunger: f32,
    pub health: f32,
    pub is_player: bool,
    /// Elevated thrust after springing out of an ambush lasts until this time
    pub boost_until: Option<SimTime>,
}

impl LionData {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            target: None,
            action: None,
            hunger: STAT_MAX,
            health: config.lion.max_health,
            is_player: false,
            boost_until: None,
        }
    }

    pub fn clear_target(&mut self) {
        self.target = None;
        self.action = None;
    }

    pub fn is_boosted(&self, now: SimTime) -> bool {
        self.boost_until.is_some_and(|until| now < until)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: f32,
    pub hunger: f32,
    pub thirst: f32,
    pub stamina: f32,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            health: STAT_MAX,
            hunger: STAT_MAX,
            thirst: STAT_MAX,
            stamina: STAT_MAX,
        }
    }
}

impl Vitals {
    pub fn clamp(&mut self) {
        self.health = clamp_stat(self.health);
        self.hunger = clamp_stat(self.hunger);
        self.thirst = clamp_stat(self.thirst);
        self.stamina = clamp_stat(self.stamina);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreyData {
    pub vitals: Vitals,
    /// Current movement goal while in `Moving`
    pub target_position: Option<Vec2>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarrionData {
    pub food: f32,
    pub decay: f32,
}

impl CarrionData {
    pub fn fresh(config: &SimulationConfig) -> Self {
        Self {
            food: config.carrion.max_food,
            decay: config.carrion.max_decay,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.food <= 0.0 || self.decay <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HunterData {
    pub health: f32,
    pub ammunition: u32,
    /// Milliseconds left until the current reload completes
    pub reload_timer_ms: f64,
    pub detection_range: f32,
    pub accuracy: f32,
    pub patrol: Vec<Vec2>,
    pub patrol_index: usize,
    pub target: Option<EntityId>,
    /// Distance to the target when last measured; read when a reload ends
    pub target_distance: Option<f32>,
    pub last_shot_at: Option<SimTime>,
    /// Raised by lion contact, consumed by the `Shooting` state
    pub interrupted: bool,
}

impl HunterData {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            health: config.hunter.max_health,
            ammunition: config.hunter.max_ammunition,
            reload_timer_ms: 0.0,
            detection_range: config.hunter.detection_range,
            accuracy: config.hunter.accuracy,
            patrol: Vec::new(),
            patrol_index: 0,
            target: None,
            target_distance: None,
            last_shot_at: None,
            interrupted: false,
        }
    }

    pub fn current_waypoint(&self) -> Option<Vec2> {
        if self.patrol.is_empty() {
            None
        } else {
            self.patrol.get(self.patrol_index % self.patrol.len()).copied()
        }
    }

    pub fn advance_waypoint(&mut self) {
        if !self.patrol.is_empty() {
            self.patrol_index = (self.patrol_index + 1) % self.patrol.len();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Gender::Female
        } else {
            Gender::Male
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pregnancy {
    pub since: SimTime,
}

/// Behavior-tree driven agent (human or predator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    pub blackboard: Blackboard,
    pub health: f32,
    pub hunger: f32,
    /// Age in years
    pub age: f32,
    pub gender: Gender,
    /// Leader of the tribe this agent belongs to; a leader points at itself
    pub leader: Option<EntityId>,
    /// Designated successor, only meaningful on a leader
    pub heir: Option<EntityId>,
    pub parent: Option<EntityId>,
    pub pregnancy: Option<Pregnancy>,
}

impl AgentData {
    pub fn new(health: f32, age: f32, gender: Gender) -> Self {
        Self {
            blackboard: Blackboard::new(),
            health,
            hunger: STAT_MAX,
            age,
            gender,
            leader: None,
            heir: None,
            parent: None,
            pregnancy: None,
        }
    }

    pub fn is_leader(&self, own_id: EntityId) -> bool {
        self.leader == Some(own_id)
    }

    pub fn clamp(&mut self) {
        self.health = clamp_stat(self.health);
        self.hunger = clamp_stat(self.hunger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_stat() {
        assert_eq!(clamp_stat(-3.0), 0.0);
        assert_eq!(clamp_stat(140.0), 100.0);
        assert_eq!(clamp_stat(f32::NAN), 0.0);
        assert_eq!(clamp_stat(42.0), 42.0);
    }

    #[test]
    fn test_patrol_loops() {
        let mut hunter = HunterData::new(&SimulationConfig::default());
        assert_eq!(hunter.current_waypoint(), None);
        hunter.patrol = vec![Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)];
        hunter.advance_waypoint();
        hunter.advance_waypoint();
        assert_eq!(hunter.patrol_index, 0);
        assert_eq!(hunter.current_waypoint(), Some(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_boost_window() {
        let mut lion = LionData::new(&SimulationConfig::default());
        lion.boost_until = Some(1000.0);
        assert!(lion.is_boosted(999.0));
        assert!(!lion.is_boosted(1000.0));
    }
}
