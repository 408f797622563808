//! Finite state machine engine
//!
//! An entity's FSM state is pure data: a `StateCursor` holding the state id
//! and its `StateData`. Behavior is looked up by id every tick in the
//! per-kind registry, so nothing callable is ever persisted.
//!
//! Transitions always run exit-then-enter through `advance`; state update
//! functions only return a `Transition` and never call hooks themselves.

pub mod hunter;
pub mod lion;
pub mod prey;
pub mod steering;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::scratch::Scratch;
use crate::core::types::SimTime;
use crate::entity::{Entity, EntityType};
use crate::simulation::context::UpdateContext;

/// Per-state payload; `fields` carries state-specific timers and targets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateData {
    pub entered_at: SimTime,
    #[serde(default)]
    pub previous_state: Option<String>,
    #[serde(default, skip_serializing_if = "Scratch::is_empty")]
    pub fields: Scratch,
}

impl StateData {
    pub fn entered(now: SimTime) -> Self {
        Self {
            entered_at: now,
            ..Default::default()
        }
    }

    pub fn elapsed(&self, now: SimTime) -> f64 {
        now - self.entered_at
    }

    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fields.get(key)
    }

    pub fn with_field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.fields.set(key, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateCursor {
    pub state: String,
    pub data: StateData,
}

impl StateCursor {
    pub fn new(state: impl Into<String>, now: SimTime) -> Self {
        Self {
            state: state.into(),
            data: StateData::entered(now),
        }
    }
}

/// Result of a state update: where to go next and with what data
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: &'static str,
    pub data: StateData,
}

impl Transition {
    /// Remain in `state`, keeping (possibly updated) data
    pub fn stay(state: &'static str, data: StateData) -> Self {
        Self { next: state, data }
    }

    /// Move to `state` with fresh data
    pub fn to(state: &'static str) -> Self {
        Self {
            next: state,
            data: StateData::default(),
        }
    }

    pub fn to_with(state: &'static str, data: StateData) -> Self {
        Self { next: state, data }
    }
}

pub type UpdateFn = fn(&mut Entity, &StateData, &mut UpdateContext) -> Transition;
/// Called on the state being left, before the next state's enter hook
pub type ExitFn = fn(&mut Entity, &StateData, &str, &mut UpdateContext);
/// Receives the proposed data and returns the data actually stored
pub type EnterFn = fn(&mut Entity, StateData, &mut UpdateContext) -> StateData;

pub struct StateDefinition {
    pub id: &'static str,
    pub update: UpdateFn,
    pub on_enter: Option<EnterFn>,
    pub on_exit: Option<ExitFn>,
}

/// State catalog for an entity kind; empty for kinds without an FSM
pub fn registry(kind: EntityType) -> &'static [StateDefinition] {
    match kind {
        EntityType::Lion => &lion::STATES,
        EntityType::Prey => &prey::STATES,
        EntityType::Hunter => &hunter::STATES,
        EntityType::Carrion | EntityType::Human | EntityType::Predator => &[],
    }
}

fn find<'r>(registry: &'r [StateDefinition], id: &str) -> Option<&'r StateDefinition> {
    registry.iter().find(|d| d.id == id)
}

/// Compute the next cursor for `entity`
///
/// Unknown state ids are not an error: the cursor comes back unchanged and
/// the entity idles for the tick.
pub fn advance(
    registry: &[StateDefinition],
    entity: &mut Entity,
    cursor: StateCursor,
    ctx: &mut UpdateContext,
) -> StateCursor {
    let Some(current) = find(registry, &cursor.state) else {
        tracing::warn!(
            "{:?} {:?} has unknown state '{}'",
            entity.entity_type(),
            entity.id,
            cursor.state
        );
        return cursor;
    };

    let transition = (current.update)(entity, &cursor.data, ctx);
    if transition.next == cursor.state {
        return StateCursor {
            state: cursor.state,
            data: transition.data,
        };
    }

    if let Some(on_exit) = current.on_exit {
        on_exit(entity, &cursor.data, transition.next, ctx);
    }

    let mut data = transition.data;
    data.entered_at = ctx.now;
    data.previous_state = Some(cursor.state.clone());

    let data = match find(registry, transition.next) {
        Some(next) => match next.on_enter {
            Some(on_enter) => on_enter(entity, data, ctx),
            None => data,
        },
        None => {
            tracing::warn!(
                "{:?} {:?} transitioned to unregistered state '{}'",
                entity.entity_type(),
                entity.id,
                transition.next
            );
            data
        }
    };

    tracing::debug!(
        "{:?} {:?}: {} -> {}",
        entity.entity_type(),
        entity.id,
        cursor.state,
        transition.next
    );

    StateCursor {
        state: transition.next.to_string(),
        data,
    }
}

/// Run one FSM step for an entity that carries a cursor
pub fn update_entity(entity: &mut Entity, ctx: &mut UpdateContext) {
    let Some(cursor) = entity.state.take() else {
        return;
    };
    let next = advance(registry(entity.entity_type()), entity, cursor, ctx);
    entity.state = Some(next);
}

/// Initial state for kinds that carry a state machine
pub fn initial_state(kind: EntityType) -> Option<&'static str> {
    match kind {
        EntityType::Lion => Some(lion::IDLE),
        EntityType::Prey => Some(prey::IDLE),
        EntityType::Hunter => Some(hunter::PATROLLING),
        EntityType::Carrion | EntityType::Human | EntityType::Predator => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::EntityId;
    use crate::entity::EntityData;
    use crate::simulation::state::{GameVariant, GameWorldState};

    const RED: &str = "red";
    const GREEN: &str = "green";

    fn red_update(entity: &mut Entity, data: &StateData, _ctx: &mut UpdateContext) -> Transition {
        if entity.acceleration > 0.0 {
            Transition::to(GREEN)
        } else {
            Transition::stay(RED, data.clone())
        }
    }

    fn green_update(_: &mut Entity, data: &StateData, _: &mut UpdateContext) -> Transition {
        Transition::stay(GREEN, data.clone())
    }

    // Exit records the speed it saw; enter overwrites it. The final data
    // proves exit ran first.
    fn red_exit(entity: &mut Entity, _: &StateData, next: &str, _: &mut UpdateContext) {
        assert_eq!(next, GREEN);
        entity.target_direction = entity.acceleration;
    }

    fn green_enter(entity: &mut Entity, data: StateData, _: &mut UpdateContext) -> StateData {
        let seen = entity.target_direction;
        entity.acceleration = 0.0;
        data.with_field("seen_on_exit", seen)
    }

    static LIGHTS: [StateDefinition; 2] = [
        StateDefinition {
            id: RED,
            update: red_update,
            on_enter: None,
            on_exit: Some(red_exit),
        },
        StateDefinition {
            id: GREEN,
            update: green_update,
            on_enter: Some(green_enter),
            on_exit: None,
        },
    ];

    fn fixture() -> (GameWorldState, Entity) {
        let config = SimulationConfig::chase();
        let state = GameWorldState::empty(GameVariant::Chase, config.clone());
        let entity = Entity::new(EntityId(100), EntityData::defaults(EntityType::Prey, &config));
        (state, entity)
    }

    #[test]
    fn test_unknown_state_returns_cursor_unchanged() {
        let (mut state, mut entity) = fixture();
        let mut ctx = state.update_context(16.0);
        let cursor = StateCursor {
            state: "no-such-state".into(),
            data: StateData::entered(3.0).with_field("anything", vec![1, 2, 3]),
        };
        let out = advance(&LIGHTS, &mut entity, cursor.clone(), &mut ctx);
        assert_eq!(out, cursor);
    }

    #[test]
    fn test_exit_runs_before_enter() {
        let (mut state, mut entity) = fixture();
        let mut ctx = state.update_context(16.0);
        entity.acceleration = 5.0;

        let out = advance(&LIGHTS, &mut entity, StateCursor::new(RED, 0.0), &mut ctx);
        assert_eq!(out.state, GREEN);
        assert_eq!(out.data.field::<f32>("seen_on_exit"), Some(5.0));
        assert_eq!(out.data.previous_state.as_deref(), Some(RED));
        assert_eq!(out.data.entered_at, ctx.now);
        assert_eq!(entity.acceleration, 0.0);
    }

    #[test]
    fn test_stay_keeps_entered_at() {
        let (mut state, mut entity) = fixture();
        let mut ctx = state.update_context(16.0);
        let out = advance(&LIGHTS, &mut entity, StateCursor::new(RED, -50.0), &mut ctx);
        assert_eq!(out.state, RED);
        assert_eq!(out.data.entered_at, -50.0);
    }

    #[test]
    fn test_kinds_without_fsm_have_empty_registry() {
        assert!(registry(EntityType::Human).is_empty());
        assert!(initial_state(EntityType::Carrion).is_none());
        for id in [lion::IDLE, lion::CHASING, lion::AMBUSH, lion::EATING, lion::MOVING] {
            assert!(find(registry(EntityType::Lion), id).is_some());
        }
    }
}
