//! End-to-end state machine scenarios driven through the world orchestrator

use savanna::core::types::{EntityId, Vec2};
use savanna::entity::kinds::{HunterData, LionAction, LionData, Target};
use savanna::entity::{EntityData, EntityPatch, EntityType};
use savanna::fsm::{hunter, lion, prey, StateCursor};
use savanna::simulation::environment::{Environment, Sector};
use savanna::simulation::{GameVariant, GameWorldState, Simulation};
use savanna::SimulationConfig;

const STEP_MS: f64 = 16.0;

fn quiet_chase_config() -> SimulationConfig {
    let mut config = SimulationConfig::chase();
    config.prey.wander_chance_per_sec = 0.0;
    config.hunter.wait_chance = 0.0;
    config.interaction.shooting_interrupt_chance = 0.0;
    config
}

/// An empty chase world: no player, no spawning, no sectors
fn empty_world(config: SimulationConfig) -> Simulation {
    Simulation::from_state(GameWorldState::empty(GameVariant::Chase, config))
}

fn state_of(sim: &Simulation, id: EntityId) -> String {
    sim.state
        .entities
        .get(id)
        .and_then(|e| e.state_id())
        .unwrap_or_default()
        .to_string()
}

#[test]
fn test_thirsty_prey_walks_to_water_and_drinks() {
    let mut sim = empty_world(quiet_chase_config());
    // Water starts 50 units east of the prey
    sim.state.environment = Environment::new(vec![Sector::water(
        Vec2::new(250.0, 280.0),
        40.0,
        40.0,
        1.0,
    )]);
    let id = sim
        .state
        .spawn(EntityType::Prey, EntityPatch::at(Vec2::new(200.0, 300.0)))
        .unwrap();
    if let Some(p) = sim.state.entities.get_mut(id).and_then(|e| e.as_prey_mut()) {
        p.vitals.thirst = 20.0;
    }
    assert_eq!(state_of(&sim, id), prey::IDLE);

    sim.advance_world(STEP_MS);
    assert_eq!(state_of(&sim, id), prey::MOVING);

    let mut ticks = 0;
    while state_of(&sim, id) == prey::MOVING && ticks < 2000 {
        sim.advance_world(STEP_MS);
        ticks += 1;
    }
    assert_eq!(state_of(&sim, id), prey::DRINKING);

    let thirst = |sim: &Simulation| {
        sim.state.entities.get(id).unwrap().as_prey().unwrap().vitals.thirst
    };
    let mut last = thirst(&sim);
    for _ in 0..20 {
        sim.advance_world(STEP_MS);
        if state_of(&sim, id) != prey::DRINKING {
            break;
        }
        let now = thirst(&sim);
        assert!(now > last, "thirst went from {} to {}", last, now);
        last = now;
    }
}

#[test]
fn test_chasing_lion_idles_when_prey_vanishes() {
    let mut sim = empty_world(quiet_chase_config());
    let prey = sim
        .state
        .spawn(EntityType::Prey, EntityPatch::at(Vec2::new(700.0, 300.0)))
        .unwrap();

    let mut data = LionData::new(&sim.state.config);
    data.target = Some(Target::entity(prey));
    data.action = Some(LionAction::Attack);
    let lion_id = sim
        .state
        .spawn(
            EntityType::Lion,
            EntityPatch::at(Vec2::new(300.0, 300.0))
                .with_data(EntityData::Lion(data))
                .with_state(StateCursor::new(lion::CHASING, 0.0)),
        )
        .unwrap();

    sim.advance_world(STEP_MS);
    assert_eq!(state_of(&sim, lion_id), lion::CHASING);

    sim.state.entities.remove(prey);
    sim.advance_world(STEP_MS);

    let lion = sim.state.entities.get(lion_id).unwrap();
    assert_eq!(lion.state_id(), Some(lion::IDLE));
    assert_eq!(lion.as_lion().unwrap().target, None);
}

#[test]
fn test_empty_hunter_reloads_then_shoots() {
    let config = quiet_chase_config();
    let reload_ms = config.hunter.reload_time_ms;
    let max_ammo = config.hunter.max_ammunition;
    let mut sim = empty_world(config);

    let lion_id = sim
        .state
        .spawn(EntityType::Lion, EntityPatch::at(Vec2::new(400.0, 300.0)))
        .unwrap();
    let mut data = HunterData::new(&sim.state.config);
    data.ammunition = 0;
    data.target = Some(lion_id);
    let hunter_id = sim
        .state
        .spawn(
            EntityType::Hunter,
            EntityPatch::at(Vec2::new(300.0, 300.0))
                .with_data(EntityData::Hunter(data))
                .with_state(StateCursor::new(hunter::SHOOTING, 0.0)),
        )
        .unwrap();

    // Out of ammunition: no shot, straight to reloading
    sim.advance_world(STEP_MS);
    assert_eq!(state_of(&sim, hunter_id), hunter::RELOADING);
    assert_eq!(sim.state.notifications.len(), 0);
    let reload_started = sim.state.time_ms;

    let mut ticks = 0;
    while state_of(&sim, hunter_id) == hunter::RELOADING && ticks < 1000 {
        sim.advance_world(STEP_MS);
        ticks += 1;
    }
    assert!(sim.state.time_ms - reload_started >= reload_ms);
    assert_eq!(state_of(&sim, hunter_id), hunter::SHOOTING);
    let hunter = sim.state.entities.get(hunter_id).unwrap().as_hunter().unwrap();
    assert_eq!(hunter.ammunition, max_ammo);
}

#[test]
fn test_reload_resumes_chase_when_target_was_far() {
    let mut sim = empty_world(quiet_chase_config());
    let lion_id = sim
        .state
        .spawn(EntityType::Lion, EntityPatch::at(Vec2::new(550.0, 300.0)))
        .unwrap();
    let mut data = HunterData::new(&sim.state.config);
    data.ammunition = 0;
    data.target = Some(lion_id);
    data.target_distance = Some(250.0);
    data.reload_timer_ms = 40.0;
    let hunter_id = sim
        .state
        .spawn(
            EntityType::Hunter,
            EntityPatch::at(Vec2::new(300.0, 300.0))
                .with_data(EntityData::Hunter(data))
                .with_state(StateCursor::new(hunter::RELOADING, 0.0)),
        )
        .unwrap();

    for _ in 0..3 {
        sim.advance_world(STEP_MS);
    }
    assert_eq!(state_of(&sim, hunter_id), hunter::CHASING);
    let hunter = sim.state.entities.get(hunter_id).unwrap().as_hunter().unwrap();
    assert_eq!(hunter.ammunition, sim.state.config.hunter.max_ammunition);
}
