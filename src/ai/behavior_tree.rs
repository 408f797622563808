//! Behavior tree evaluation
//!
//! Trees are built once and shared by every agent of a kind; all per-agent
//! memory (cooldown entries, cached results, multi-tick action progress)
//! lives in that agent's `Blackboard`. A `Failure` only means the branch did
//! not fire this tick. Leaf errors are faults and travel up as `Err`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ai::blackboard::Blackboard;
use crate::core::error::Result;
use crate::core::types::Tick;
use crate::entity::Entity;
use crate::simulation::context::UpdateContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
    Running,
}

impl Status {
    pub fn from_bool(ok: bool) -> Self {
        if ok {
            Status::Success
        } else {
            Status::Failure
        }
    }
}

pub type Predicate = Box<dyn Fn(&Entity, &Blackboard, &UpdateContext) -> bool>;
pub type ActionFn = Box<dyn Fn(&mut Entity, &mut Blackboard, &mut UpdateContext) -> Result<Status>>;

pub enum BehaviorNode {
    /// Children in order until one fails or runs
    ///
    /// A scoped sequence owns the blackboard keys under `<scope>/` and drops
    /// them whenever it stops running, so an abandoned multi-tick action
    /// never leaves stale progress behind.
    Sequence {
        scope: Option<&'static str>,
        children: Vec<BehaviorNode>,
    },
    /// Children in order until one does not fail
    Selector { children: Vec<BehaviorNode> },
    Condition {
        label: &'static str,
        predicate: Predicate,
    },
    Action {
        label: &'static str,
        run: ActionFn,
    },
    /// Skips `child` entirely for `ticks` after each attempted entry
    Cooldown {
        label: &'static str,
        ticks: Tick,
        child: Box<BehaviorNode>,
    },
    /// Replays the last finished result of `child` for `ticks`
    Caching {
        label: &'static str,
        ticks: Tick,
        child: Box<BehaviorNode>,
    },
}

impl BehaviorNode {
    pub fn sequence(children: Vec<BehaviorNode>) -> Self {
        BehaviorNode::Sequence { scope: None, children }
    }

    pub fn scoped(scope: &'static str, children: Vec<BehaviorNode>) -> Self {
        BehaviorNode::Sequence {
            scope: Some(scope),
            children,
        }
    }

    pub fn selector(children: Vec<BehaviorNode>) -> Self {
        BehaviorNode::Selector { children }
    }

    pub fn condition<F>(label: &'static str, predicate: F) -> Self
    where
        F: Fn(&Entity, &Blackboard, &UpdateContext) -> bool + 'static,
    {
        BehaviorNode::Condition {
            label,
            predicate: Box::new(predicate),
        }
    }

    pub fn action<F>(label: &'static str, run: F) -> Self
    where
        F: Fn(&mut Entity, &mut Blackboard, &mut UpdateContext) -> Result<Status> + 'static,
    {
        BehaviorNode::Action {
            label,
            run: Box::new(run),
        }
    }

    pub fn cooldown(label: &'static str, ticks: Tick, child: BehaviorNode) -> Self {
        BehaviorNode::Cooldown {
            label,
            ticks,
            child: Box::new(child),
        }
    }

    pub fn caching(label: &'static str, ticks: Tick, child: BehaviorNode) -> Self {
        BehaviorNode::Caching {
            label,
            ticks,
            child: Box::new(child),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BehaviorNode::Sequence { scope, .. } => scope.unwrap_or("sequence"),
            BehaviorNode::Selector { .. } => "selector",
            BehaviorNode::Condition { label, .. }
            | BehaviorNode::Action { label, .. }
            | BehaviorNode::Cooldown { label, .. }
            | BehaviorNode::Caching { label, .. } => label,
        }
    }

    /// Evaluate once for `entity` at `ctx.tick`
    pub fn tick(
        &self,
        entity: &mut Entity,
        blackboard: &mut Blackboard,
        ctx: &mut UpdateContext,
    ) -> Result<Status> {
        match self {
            BehaviorNode::Sequence { scope, children } => {
                let outcome = run_sequence(children, entity, blackboard, ctx);
                if let Some(scope) = scope {
                    if !matches!(outcome, Ok(Status::Running)) {
                        blackboard.clear_scope(scope);
                    }
                }
                outcome
            }
            BehaviorNode::Selector { children } => {
                for child in children {
                    let status = child.tick(entity, blackboard, ctx)?;
                    if status != Status::Failure {
                        return Ok(status);
                    }
                }
                Ok(Status::Failure)
            }
            BehaviorNode::Condition { predicate, .. } => {
                Ok(Status::from_bool(predicate(&*entity, &*blackboard, &*ctx)))
            }
            BehaviorNode::Action { run, .. } => run(entity, blackboard, ctx),
            BehaviorNode::Cooldown { label, ticks, child } => {
                if let Some(last) = blackboard.last_entry(label) {
                    if ctx.tick < last.saturating_add(*ticks) {
                        return Ok(Status::Failure);
                    }
                }
                blackboard.record_entry(label, ctx.tick);
                child.tick(entity, blackboard, ctx)
            }
            BehaviorNode::Caching { label, ticks, child } => {
                if let Some(status) = blackboard.cached(label, ctx.tick) {
                    return Ok(status);
                }
                let status = child.tick(entity, blackboard, ctx)?;
                if status != Status::Running {
                    blackboard.store_cached(label, status, ctx.tick.saturating_add(*ticks));
                }
                Ok(status)
            }
        }
    }
}

fn run_sequence(
    children: &[BehaviorNode],
    entity: &mut Entity,
    blackboard: &mut Blackboard,
    ctx: &mut UpdateContext,
) -> Result<Status> {
    for child in children {
        match child.tick(entity, blackboard, ctx)? {
            Status::Success => continue,
            other => return Ok(other),
        }
    }
    Ok(Status::Success)
}

impl fmt::Debug for BehaviorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BehaviorNode::Sequence { scope, children } => f
                .debug_struct("Sequence")
                .field("scope", scope)
                .field("children", children)
                .finish(),
            BehaviorNode::Selector { children } => {
                f.debug_struct("Selector").field("children", children).finish()
            }
            BehaviorNode::Condition { label, .. } => write!(f, "Condition({})", label),
            BehaviorNode::Action { label, .. } => write!(f, "Action({})", label),
            BehaviorNode::Cooldown { label, ticks, child } => f
                .debug_struct("Cooldown")
                .field("label", label)
                .field("ticks", ticks)
                .field("child", child)
                .finish(),
            BehaviorNode::Caching { label, ticks, child } => f
                .debug_struct("Caching")
                .field("label", label)
                .field("ticks", ticks)
                .field("child", child)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::error::SimError;
    use crate::core::types::EntityId;
    use crate::entity::{EntityData, EntityType};
    use crate::simulation::state::{GameVariant, GameWorldState};

    fn agent() -> Entity {
        let config = SimulationConfig::tribal();
        Entity::new(EntityId(1), EntityData::defaults(EntityType::Human, &config))
    }

    fn state() -> GameWorldState {
        GameWorldState::empty(GameVariant::Tribal, SimulationConfig::tribal())
    }

    fn fixed(status: Status) -> BehaviorNode {
        BehaviorNode::action("fixed", move |_, _, _| Ok(status))
    }

    #[test]
    fn test_selector_returns_first_non_failure() {
        let mut state = state();
        let mut ctx = state.update_context(16.0);
        let mut e = agent();
        let mut bb = Blackboard::new();

        let tree = BehaviorNode::selector(vec![
            fixed(Status::Failure),
            fixed(Status::Running),
            fixed(Status::Success),
        ]);
        assert_eq!(tree.tick(&mut e, &mut bb, &mut ctx).unwrap(), Status::Running);

        let empty = BehaviorNode::selector(vec![]);
        assert_eq!(empty.tick(&mut e, &mut bb, &mut ctx).unwrap(), Status::Failure);
    }

    #[test]
    fn test_scoped_sequence_clears_progress_on_failure() {
        let mut state = state();
        let mut ctx = state.update_context(16.0);
        let mut e = agent();
        let mut bb = Blackboard::new();
        bb.set("trip/target", 5u32);
        bb.set("other/key", 1u32);

        let tree = BehaviorNode::scoped(
            "trip",
            vec![BehaviorNode::condition("never", |_, _, _| false)],
        );
        assert_eq!(tree.tick(&mut e, &mut bb, &mut ctx).unwrap(), Status::Failure);
        assert!(!bb.contains("trip/target"));
        assert!(bb.contains("other/key"));
    }

    #[test]
    fn test_scoped_sequence_keeps_progress_while_running() {
        let mut state = state();
        let mut ctx = state.update_context(16.0);
        let mut e = agent();
        let mut bb = Blackboard::new();

        let tree = BehaviorNode::scoped(
            "trip",
            vec![BehaviorNode::action("walk", |_, bb, _| {
                bb.set("trip/target", 9u32);
                Ok(Status::Running)
            })],
        );
        assert_eq!(tree.tick(&mut e, &mut bb, &mut ctx).unwrap(), Status::Running);
        assert_eq!(bb.get::<u32>("trip/target"), Some(9));
    }

    #[test]
    fn test_caching_never_stores_running() {
        let mut state = state();
        let mut ctx = state.update_context(16.0);
        let mut e = agent();
        let mut bb = Blackboard::new();

        let tree = BehaviorNode::caching("slow", 10, fixed(Status::Running));
        assert_eq!(tree.tick(&mut e, &mut bb, &mut ctx).unwrap(), Status::Running);
        assert_eq!(bb.cached("slow", ctx.tick), None);
    }

    #[test]
    fn test_fault_propagates_as_error() {
        let mut state = state();
        let mut ctx = state.update_context(16.0);
        let mut e = agent();
        let mut bb = Blackboard::new();

        let tree = BehaviorNode::sequence(vec![BehaviorNode::action("broken", |_, _, _| {
            Err(SimError::fault("broken", "no such thing"))
        })]);
        let err = tree.tick(&mut e, &mut bb, &mut ctx).unwrap_err();
        assert!(matches!(err, SimError::BehaviorFault { .. }));
    }

    #[test]
    fn test_debug_shows_labels() {
        let tree = BehaviorNode::cooldown("roam", 5, fixed(Status::Success));
        let text = format!("{:?}", tree);
        assert!(text.contains("roam"));
        assert!(text.contains("Action(fixed)"));
    }
}
