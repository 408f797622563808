//! Simulation entities
//!
//! One record type for every kind of object in the world. Shared kinematic
//! fields live on `Entity`; everything kind-specific lives in the closed
//! `EntityData` enum so a match over it is exhaustive at compile time.

pub mod kinds;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{EntityId, SimTime, Vec2};
use crate::fsm::StateCursor;

pub use kinds::{
    AgentData, CarrionData, Gender, HunterData, LionAction, LionData, PreyData, Target, Vitals,
};
pub use store::EntityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Lion,
    Prey,
    Hunter,
    Carrion,
    Human,
    Predator,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::Lion,
        EntityType::Prey,
        EntityType::Hunter,
        EntityType::Carrion,
        EntityType::Human,
        EntityType::Predator,
    ];

    /// Radius used when testing overlap against environment sectors
    pub fn footprint_radius(&self) -> f32 {
        match self {
            EntityType::Lion => 12.0,
            EntityType::Prey => 8.0,
            EntityType::Hunter => 8.0,
            EntityType::Carrion => 10.0,
            EntityType::Human => 6.0,
            EntityType::Predator => 10.0,
        }
    }

    /// Whether entities of this kind die and leave carrion
    pub fn is_mortal(&self) -> bool {
        !matches!(self, EntityType::Carrion)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebuffKind {
    /// Multiplies velocity by the configured slow factor every tick
    Slow,
}

/// Time-bound status effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Debuff {
    pub kind: DebuffKind,
    pub started_at: SimTime,
    pub duration_ms: f64,
}

impl Debuff {
    pub fn new(kind: DebuffKind, started_at: SimTime, duration_ms: f64) -> Self {
        Self { kind, started_at, duration_ms }
    }

    pub fn is_expired(&self, now: SimTime) -> bool {
        now >= self.started_at + self.duration_ms
    }
}

/// Kind-specific payload, tagged by entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityData {
    Lion(LionData),
    Prey(PreyData),
    Hunter(HunterData),
    Carrion(CarrionData),
    Human(AgentData),
    Predator(AgentData),
}

impl EntityData {
    /// Type defaults for a freshly created entity
    pub fn defaults(kind: EntityType, config: &SimulationConfig) -> Self {
        match kind {
            EntityType::Lion => EntityData::Lion(LionData::new(config)),
            EntityType::Prey => EntityData::Prey(PreyData::default()),
            EntityType::Hunter => EntityData::Hunter(HunterData::new(config)),
            EntityType::Carrion => EntityData::Carrion(CarrionData::fresh(config)),
            EntityType::Human => EntityData::Human(AgentData::new(
                config.tribe.max_health,
                config.tribe.adult_age,
                Gender::Female,
            )),
            EntityType::Predator => EntityData::Predator(AgentData::new(
                config.predator.max_health,
                5.0,
                Gender::Male,
            )),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityData::Lion(_) => EntityType::Lion,
            EntityData::Prey(_) => EntityType::Prey,
            EntityData::Hunter(_) => EntityType::Hunter,
            EntityData::Carrion(_) => EntityType::Carrion,
            EntityData::Human(_) => EntityType::Human,
            EntityData::Predator(_) => EntityType::Predator,
        }
    }
}

/// The central mutable simulation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Current facing in radians
    pub direction: f32,
    /// Desired facing; physics snaps `direction` to it every tick
    pub target_direction: f32,
    /// Signed thrust along `direction`
    pub acceleration: f32,
    /// Forces queued for the current tick only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forces: Vec<Vec2>,
    #[serde(default)]
    pub debuffs: Vec<Debuff>,
    /// FSM cursor, absent for entities without a state machine
    #[serde(default)]
    pub state: Option<StateCursor>,
    pub data: EntityData,
}

impl Entity {
    pub fn new(id: EntityId, data: EntityData) -> Self {
        Self {
            id,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            direction: 0.0,
            target_direction: 0.0,
            acceleration: 0.0,
            forces: Vec::new(),
            debuffs: Vec::new(),
            state: None,
            data,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.data.entity_type()
    }

    pub fn is(&self, kind: EntityType) -> bool {
        self.entity_type() == kind
    }

    /// Id of the current FSM state, if any
    pub fn state_id(&self) -> Option<&str> {
        self.state.as_ref().map(|c| c.state.as_str())
    }

    pub fn in_state(&self, id: &str) -> bool {
        self.state_id() == Some(id)
    }

    /// Health for kinds that have it
    pub fn health(&self) -> Option<f32> {
        match &self.data {
            EntityData::Lion(l) => Some(l.health),
            EntityData::Prey(p) => Some(p.vitals.health),
            EntityData::Hunter(h) => Some(h.health),
            EntityData::Human(a) | EntityData::Predator(a) => Some(a.health),
            EntityData::Carrion(_) => None,
        }
    }

    pub fn health_mut(&mut self) -> Option<&mut f32> {
        match &mut self.data {
            EntityData::Lion(l) => Some(&mut l.health),
            EntityData::Prey(p) => Some(&mut p.vitals.health),
            EntityData::Hunter(h) => Some(&mut h.health),
            EntityData::Human(a) | EntityData::Predator(a) => Some(&mut a.health),
            EntityData::Carrion(_) => None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health().is_some_and(|h| h <= 0.0)
    }

    pub fn apply_force(&mut self, force: Vec2) {
        if force.is_finite() {
            self.forces.push(force);
        }
    }

    pub fn add_debuff(&mut self, debuff: Debuff) {
        self.debuffs.push(debuff);
    }

    /// Restart a running debuff of the same kind instead of stacking another
    ///
    /// Every contact rule slows through here, so repeated bites or shots
    /// keep one slow alive rather than compounding it.
    pub fn refresh_debuff(&mut self, kind: DebuffKind, now: SimTime, duration_ms: f64) {
        match self
            .debuffs
            .iter_mut()
            .find(|d| d.kind == kind && !d.is_expired(now))
        {
            Some(existing) => {
                existing.started_at = now;
                existing.duration_ms = existing.duration_ms.max(duration_ms);
            }
            None => self.debuffs.push(Debuff::new(kind, now, duration_ms)),
        }
    }

    pub fn as_lion(&self) -> Option<&LionData> {
        match &self.data {
            EntityData::Lion(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_lion_mut(&mut self) -> Option<&mut LionData> {
        match &mut self.data {
            EntityData::Lion(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_prey(&self) -> Option<&PreyData> {
        match &self.data {
            EntityData::Prey(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_prey_mut(&mut self) -> Option<&mut PreyData> {
        match &mut self.data {
            EntityData::Prey(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_hunter(&self) -> Option<&HunterData> {
        match &self.data {
            EntityData::Hunter(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_hunter_mut(&mut self) -> Option<&mut HunterData> {
        match &mut self.data {
            EntityData::Hunter(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_carrion(&self) -> Option<&CarrionData> {
        match &self.data {
            EntityData::Carrion(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_carrion_mut(&mut self) -> Option<&mut CarrionData> {
        match &mut self.data {
            EntityData::Carrion(c) => Some(c),
            _ => None,
        }
    }

    /// Agent payload for humans and predators
    pub fn as_agent(&self) -> Option<&AgentData> {
        match &self.data {
            EntityData::Human(a) | EntityData::Predator(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_agent_mut(&mut self) -> Option<&mut AgentData> {
        match &mut self.data {
            EntityData::Human(a) | EntityData::Predator(a) => Some(a),
            _ => None,
        }
    }
}

/// Caller-supplied fields overlaid on a new or existing entity
#[derive(Debug, Clone, Default)]
pub struct EntityPatch {
    pub position: Option<Vec2>,
    pub velocity: Option<Vec2>,
    pub direction: Option<f32>,
    pub target_direction: Option<f32>,
    pub acceleration: Option<f32>,
    pub state: Option<StateCursor>,
    pub data: Option<EntityData>,
}

impl EntityPatch {
    pub fn at(position: Vec2) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, data: EntityData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_state(mut self, state: StateCursor) -> Self {
        self.state = Some(state);
        self
    }

    pub fn facing(mut self, direction: f32) -> Self {
        self.direction = Some(direction);
        self.target_direction = Some(direction);
        self
    }

    /// Overlay onto `entity`; a payload of a different kind is rejected
    /// before anything is written
    pub fn apply(self, entity: &mut Entity) -> Result<()> {
        if let Some(data) = &self.data {
            if data.entity_type() != entity.entity_type() {
                return Err(SimError::WrongEntityKind {
                    id: entity.id,
                    expected: entity.entity_type(),
                    actual: data.entity_type(),
                });
            }
        }
        if let Some(position) = self.position {
            entity.position = position;
        }
        if let Some(velocity) = self.velocity {
            entity.velocity = velocity;
        }
        if let Some(direction) = self.direction {
            entity.direction = direction;
        }
        if let Some(target_direction) = self.target_direction {
            entity.target_direction = target_direction;
        }
        if let Some(acceleration) = self.acceleration {
            entity.acceleration = acceleration;
        }
        if let Some(state) = self.state {
            entity.state = Some(state);
        }
        if let Some(data) = self.data {
            entity.data = data;
        }
        Ok(())
    }
}
