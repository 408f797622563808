//! Behavior tree composition, cooldown and caching through the public API

use std::cell::Cell;
use std::rc::Rc;

use savanna::ai::{BehaviorNode, Blackboard, Brains, Status};
use savanna::core::types::{EntityId, Vec2};
use savanna::entity::kinds::{AgentData, Gender};
use savanna::entity::{Entity, EntityData, EntityPatch, EntityType};
use savanna::simulation::{GameVariant, GameWorldState};
use savanna::{SimError, SimulationConfig};

fn world() -> GameWorldState {
    GameWorldState::empty(GameVariant::Tribal, SimulationConfig::tribal())
}

fn human() -> Entity {
    Entity::new(
        EntityId(1),
        EntityData::Human(AgentData::new(100.0, 25.0, Gender::Female)),
    )
}

/// A leaf that returns `status` and counts how often it ran
fn counted(status: Status, calls: &Rc<Cell<u32>>) -> BehaviorNode {
    let calls = Rc::clone(calls);
    BehaviorNode::action("counted", move |_, _, _| {
        calls.set(calls.get() + 1);
        Ok(status)
    })
}

#[test]
fn test_sequence_of_successes_succeeds() {
    let mut state = world();
    let mut ctx = state.update_context(16.0);
    let calls = Rc::new(Cell::new(0));
    let tree = BehaviorNode::sequence(vec![
        counted(Status::Success, &calls),
        counted(Status::Success, &calls),
        counted(Status::Success, &calls),
    ]);

    let status = tree.tick(&mut human(), &mut Blackboard::new(), &mut ctx).unwrap();
    assert_eq!(status, Status::Success);
    assert_eq!(calls.get(), 3);
}

#[test]
fn test_sequence_stops_at_first_failure() {
    let mut state = world();
    let mut ctx = state.update_context(16.0);
    let before = Rc::new(Cell::new(0));
    let after = Rc::new(Cell::new(0));
    let tree = BehaviorNode::sequence(vec![
        counted(Status::Success, &before),
        counted(Status::Failure, &before),
        counted(Status::Success, &after),
    ]);

    let status = tree.tick(&mut human(), &mut Blackboard::new(), &mut ctx).unwrap();
    assert_eq!(status, Status::Failure);
    assert_eq!(before.get(), 2);
    assert_eq!(after.get(), 0);
}

#[test]
fn test_sequence_pauses_on_running() {
    let mut state = world();
    let mut ctx = state.update_context(16.0);
    let after = Rc::new(Cell::new(0));
    let tree = BehaviorNode::sequence(vec![
        BehaviorNode::condition("always", |_, _, _| true),
        BehaviorNode::action("busy", |_, _, _| Ok(Status::Running)),
        counted(Status::Success, &after),
    ]);

    let status = tree.tick(&mut human(), &mut Blackboard::new(), &mut ctx).unwrap();
    assert_eq!(status, Status::Running);
    assert_eq!(after.get(), 0);
}

#[test]
fn test_cooldown_suppresses_child_within_window() {
    let mut state = world();
    let calls = Rc::new(Cell::new(0));
    let tree = BehaviorNode::cooldown("rest", 10, counted(Status::Success, &calls));
    let mut entity = human();
    let mut blackboard = Blackboard::new();

    state.tick = 100;
    let first = tree
        .tick(&mut entity, &mut blackboard, &mut state.update_context(16.0))
        .unwrap();
    assert_eq!(first, Status::Success);

    state.tick = 105;
    let second = tree
        .tick(&mut entity, &mut blackboard, &mut state.update_context(16.0))
        .unwrap();
    assert_eq!(second, Status::Failure);
    assert_eq!(calls.get(), 1);

    state.tick = 110;
    tree.tick(&mut entity, &mut blackboard, &mut state.update_context(16.0))
        .unwrap();
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_caching_replays_last_answer() {
    let mut state = world();
    let calls = Rc::new(Cell::new(0));
    let tree = BehaviorNode::caching("scan", 5, counted(Status::Success, &calls));
    let mut entity = human();
    let mut blackboard = Blackboard::new();

    for tick in 0..5 {
        state.tick = tick;
        let status = tree
            .tick(&mut entity, &mut blackboard, &mut state.update_context(16.0))
            .unwrap();
        // Unlike a cooldown, a cached node keeps answering every tick
        assert_eq!(status, Status::Success);
    }
    assert_eq!(calls.get(), 1);

    state.tick = 5;
    tree.tick(&mut entity, &mut blackboard, &mut state.update_context(16.0))
        .unwrap();
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_blackboard_survives_snapshot() {
    let mut blackboard = Blackboard::new();
    blackboard.set("migration/target", Vec2::new(12.0, 34.0));
    blackboard.record_entry("migration", 42);

    let json = serde_json::to_string(&blackboard).unwrap();
    let back: Blackboard = serde_json::from_str(&json).unwrap();
    assert_eq!(back.get::<Vec2>("migration/target"), Some(Vec2::new(12.0, 34.0)));
    assert_eq!(back.last_entry("migration"), Some(42));
}

#[test]
fn test_leaf_fault_surfaces_as_error() {
    let mut state = world();
    let mut ctx = state.update_context(16.0);
    let tree = BehaviorNode::selector(vec![BehaviorNode::action("explode", |_, _, _| {
        Err(SimError::fault("explode", "no footing"))
    })]);

    let result = tree.tick(&mut human(), &mut Blackboard::new(), &mut ctx);
    assert!(matches!(result, Err(SimError::BehaviorFault { .. })));
}

#[test]
fn test_brains_run_for_agents_only() {
    let mut state = world();
    let id = state
        .spawn(
            EntityType::Human,
            EntityPatch::at(Vec2::new(400.0, 300.0))
                .with_data(EntityData::Human(AgentData::new(100.0, 25.0, Gender::Male))),
        )
        .unwrap();
    let brains = Brains::new(&state.config);
    assert!(brains.tree_for(EntityType::Human).is_some());
    assert!(brains.tree_for(EntityType::Lion).is_none());

    let mut entity = state.entities.take(id).unwrap();
    let status = brains.think(&mut entity, &mut state.update_context(16.0));
    // A lone, fed human without a leader falls through to idling
    assert_ne!(status, Status::Failure);
}
