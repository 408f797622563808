//! Behavior-tree AI for tribal agents
//!
//! Humans and predators carry no FSM cursor; their `Brains` tree runs in the
//! slot where other kinds run their state machine.

pub mod behavior_tree;
pub mod blackboard;
pub mod predator;
pub mod tribe;

pub use behavior_tree::{BehaviorNode, Status};
pub use blackboard::Blackboard;

use crate::core::config::SimulationConfig;
use crate::entity::{Entity, EntityType};
use crate::simulation::context::UpdateContext;

/// One shared tree per agent kind
#[derive(Debug)]
pub struct Brains {
    human: BehaviorNode,
    predator: BehaviorNode,
}

impl Brains {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            human: tribe::human_tree(&config.tribe),
            predator: predator::predator_tree(&config.predator),
        }
    }

    pub fn tree_for(&self, kind: EntityType) -> Option<&BehaviorNode> {
        match kind {
            EntityType::Human => Some(&self.human),
            EntityType::Predator => Some(&self.predator),
            _ => None,
        }
    }

    /// Evaluate the agent's tree for this tick
    ///
    /// A faulting leaf is logged and the agent's evaluation yields `Failure`;
    /// the blackboard goes back on the agent either way.
    pub fn think(&self, entity: &mut Entity, ctx: &mut UpdateContext) -> Status {
        let Some(tree) = self.tree_for(entity.entity_type()) else {
            return Status::Failure;
        };
        let Some(agent) = entity.as_agent_mut() else {
            return Status::Failure;
        };
        let mut blackboard = std::mem::take(&mut agent.blackboard);

        let status = match tree.tick(entity, &mut blackboard, ctx) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    "{:?} {:?} behavior faulted at tick {}: {}",
                    entity.entity_type(),
                    entity.id,
                    ctx.tick,
                    e
                );
                Status::Failure
            }
        };

        if let Some(agent) = entity.as_agent_mut() {
            agent.blackboard = blackboard;
        }
        status
    }
}
