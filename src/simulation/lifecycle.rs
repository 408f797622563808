//! End-of-tick lifecycle: deaths become carrion, tribes get new leaders,
//! spent carrion disappears

use crate::core::types::EntityId;
use crate::entity::kinds::CarrionData;
use crate::entity::{Entity, EntityData, EntityPatch, EntityType};
use crate::simulation::notifications::NotificationKind;
use crate::simulation::state::GameWorldState;
use crate::simulation::tick::SimulationEvent;

/// Run every lifecycle rule once, in order
pub fn sweep(state: &mut GameWorldState, events: &mut Vec<SimulationEvent>) {
    let fallen = convert_dead(state, events);
    for (leader, heir) in fallen {
        succession(state, leader, heir, events);
    }
    remove_spent_carrion(state);
}

/// Replace every dead mortal with fresh carrion at the same spot
///
/// Returns dead tribe leaders together with the heir they had named.
fn convert_dead(
    state: &mut GameWorldState,
    events: &mut Vec<SimulationEvent>,
) -> Vec<(EntityId, Option<EntityId>)> {
    let dead: Vec<EntityId> = state
        .entities
        .iter()
        .filter(|e| e.entity_type().is_mortal() && e.is_dead())
        .map(|e| e.id)
        .collect();

    let mut fallen_leaders = Vec::new();
    for id in dead {
        let Some(body) = state.entities.remove(id) else {
            continue;
        };
        let kind = body.entity_type();
        if let Some(agent) = body.as_agent().filter(|a| a.is_leader(id)) {
            fallen_leaders.push((id, agent.heir));
        }

        let carrion = EntityData::Carrion(CarrionData::fresh(&state.config));
        let patch = EntityPatch::at(body.position)
            .facing(body.direction)
            .with_data(carrion);
        match state.spawn(EntityType::Carrion, patch) {
            Ok(carrion_id) => tracing::debug!("{:?} {:?} became carrion {:?}", kind, id, carrion_id),
            Err(e) => tracing::warn!("no carrion for {:?} {:?}: {}", kind, id, e),
        }

        state.notifications.push(
            NotificationKind::Death,
            format!("{} died", kind_label(kind)),
            body.position,
            state.time_ms,
            state.config.notifications.duration_ms,
        );
        events.push(SimulationEvent::Died {
            id,
            kind,
            position: body.position,
        });
    }
    fallen_leaders
}

fn kind_label(kind: EntityType) -> &'static str {
    match kind {
        EntityType::Lion => "Lion",
        EntityType::Prey => "Prey",
        EntityType::Hunter => "Hunter",
        EntityType::Carrion => "Carrion",
        EntityType::Human => "Human",
        EntityType::Predator => "Predator",
    }
}

/// Pick the next leader: the named heir if still in the tribe, else the
/// oldest adult, else the oldest member at all
fn successor(state: &GameWorldState, old: EntityId, heir: Option<EntityId>) -> Option<EntityId> {
    let members: Vec<&Entity> = state
        .entities
        .of_type(EntityType::Human)
        .filter(|e| e.as_agent().is_some_and(|a| a.leader == Some(old)))
        .collect();

    if let Some(heir) = heir.filter(|h| members.iter().any(|m| m.id == *h)) {
        return Some(heir);
    }
    let oldest = |adults_only: bool| {
        members
            .iter()
            .filter_map(|e| e.as_agent().map(|a| (e.id, a.age)))
            .filter(|(_, age)| !adults_only || *age >= state.config.tribe.adult_age)
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(id, _)| id)
    };
    oldest(true).or_else(|| oldest(false))
}

fn succession(
    state: &mut GameWorldState,
    old: EntityId,
    heir: Option<EntityId>,
    events: &mut Vec<SimulationEvent>,
) {
    let Some(new_leader) = successor(state, old, heir) else {
        state.diplomacy.forget(old);
        tracing::info!("tribe of {:?} has died out", old);
        return;
    };

    let mut followers = 0;
    for member in state.entities.iter_mut() {
        if let Some(agent) = member.as_agent_mut().filter(|a| a.leader == Some(old)) {
            agent.leader = Some(new_leader);
            followers += 1;
        }
    }
    if let Some(agent) = state.entities.get_mut(new_leader).and_then(|e| e.as_agent_mut()) {
        agent.heir = None;
    }
    state.diplomacy.transfer(old, new_leader);

    let position = state
        .entities
        .get(new_leader)
        .map(|e| e.position)
        .unwrap_or_default();
    state.notifications.push(
        NotificationKind::Info,
        "A new leader rises",
        position,
        state.time_ms,
        state.config.notifications.duration_ms,
    );
    tracing::info!(
        "{:?} succeeds {:?} leading {} members",
        new_leader,
        old,
        followers
    );
    events.push(SimulationEvent::Succession {
        previous: old,
        leader: new_leader,
    });
}

fn remove_spent_carrion(state: &mut GameWorldState) {
    let spent: Vec<EntityId> = state
        .entities
        .of_type(EntityType::Carrion)
        .filter(|e| e.as_carrion().is_some_and(|c| c.is_spent()))
        .map(|e| e.id)
        .collect();
    for id in spent {
        state.entities.remove(id);
        tracing::debug!("carrion {:?} is gone", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::Vec2;
    use crate::entity::kinds::{AgentData, Gender};
    use crate::simulation::diplomacy::Relation;
    use crate::simulation::state::GameVariant;

    fn tribal() -> GameWorldState {
        GameWorldState::empty(GameVariant::Tribal, SimulationConfig::tribal())
    }

    fn add_human(state: &mut GameWorldState, leader: Option<EntityId>, age: f32) -> EntityId {
        let mut agent = AgentData::new(100.0, age, Gender::Male);
        agent.leader = leader;
        state
            .spawn(
                EntityType::Human,
                EntityPatch::at(Vec2::new(10.0, 10.0)).with_data(EntityData::Human(agent)),
            )
            .unwrap()
    }

    fn make_leader(state: &mut GameWorldState, id: EntityId) {
        if let Some(a) = state.entities.get_mut(id).and_then(|e| e.as_agent_mut()) {
            a.leader = Some(id);
        }
    }

    fn kill(state: &mut GameWorldState, id: EntityId) {
        if let Some(h) = state.entities.get_mut(id).and_then(|e| e.health_mut()) {
            *h = 0.0;
        }
    }

    #[test]
    fn test_heir_takes_over() {
        let mut state = tribal();
        let leader = add_human(&mut state, None, 50.0);
        make_leader(&mut state, leader);
        let elder = add_human(&mut state, Some(leader), 40.0);
        let heir = add_human(&mut state, Some(leader), 20.0);
        let rival = EntityId(999);
        state.diplomacy.set(leader, rival, Relation::Hostile);
        if let Some(a) = state.entities.get_mut(leader).and_then(|e| e.as_agent_mut()) {
            a.heir = Some(heir);
        }
        kill(&mut state, leader);

        let mut events = Vec::new();
        sweep(&mut state, &mut events);

        assert!(!state.entities.contains(leader));
        for id in [elder, heir] {
            let agent = state.entities.get(id).unwrap().as_agent().unwrap();
            assert_eq!(agent.leader, Some(heir));
        }
        assert_eq!(state.diplomacy.relation(heir, rival), Relation::Hostile);
        assert!(events.contains(&SimulationEvent::Succession {
            previous: leader,
            leader: heir
        }));
    }

    #[test]
    fn test_oldest_adult_without_heir() {
        let mut state = tribal();
        let leader = add_human(&mut state, None, 50.0);
        make_leader(&mut state, leader);
        let child = add_human(&mut state, Some(leader), 8.0);
        let adult = add_human(&mut state, Some(leader), 22.0);
        kill(&mut state, leader);

        sweep(&mut state, &mut Vec::new());
        let agent = state.entities.get(child).unwrap().as_agent().unwrap();
        assert_eq!(agent.leader, Some(adult));
    }

    #[test]
    fn test_dead_prey_becomes_carrion_in_place() {
        let mut state = tribal();
        let prey = state
            .spawn(EntityType::Prey, EntityPatch::at(Vec2::new(33.0, 44.0)))
            .unwrap();
        kill(&mut state, prey);

        let mut events = Vec::new();
        sweep(&mut state, &mut events);
        assert!(!state.entities.contains(prey));
        let carrion: Vec<_> = state.entities.of_type(EntityType::Carrion).collect();
        assert_eq!(carrion.len(), 1);
        assert_eq!(carrion[0].position, Vec2::new(33.0, 44.0));
        assert_eq!(
            carrion[0].as_carrion().copied(),
            Some(CarrionData::fresh(&state.config))
        );
        assert_eq!(state.notifications.count(NotificationKind::Death), 1);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_spent_carrion_removed() {
        let mut state = tribal();
        let mut eaten = CarrionData::fresh(&state.config);
        eaten.food = 0.0;
        let id = state
            .spawn(
                EntityType::Carrion,
                EntityPatch::default().with_data(EntityData::Carrion(eaten)),
            )
            .unwrap();
        sweep(&mut state, &mut Vec::new());
        assert!(!state.entities.contains(id));
    }
}
