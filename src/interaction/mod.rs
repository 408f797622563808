//! Pairwise interaction resolution
//!
//! Every ordered pair of distinct entities is offered to every rule, in
//! store order and then registration order. Effects land immediately, so a
//! later rule (or pair) in the same tick sees what an earlier one did.

pub mod rules;

use crate::core::config::SimulationConfig;
use crate::core::types::EntityId;
use crate::entity::{Entity, EntityStore, EntityType};
use crate::simulation::context::InteractionContext;
use crate::spatial::sparse_hash::SparseHashGrid;

pub type CheckFn = fn(&Entity, &Entity, &InteractionContext) -> bool;
pub type PerformFn = fn(&mut Entity, &mut Entity, &mut InteractionContext);

pub struct InteractionRule {
    pub name: &'static str,
    pub source: Option<EntityType>,
    pub target: Option<EntityType>,
    /// Upper bound on the distance at which `check` can pass
    pub range: f32,
    pub check: CheckFn,
    pub perform: PerformFn,
}

impl InteractionRule {
    fn matches(&self, source: &Entity, target: &Entity) -> bool {
        self.source.map_or(true, |k| source.is(k)) && self.target.map_or(true, |k| target.is(k))
    }
}

/// Ordered rule set plus the pair enumeration strategy
pub struct InteractionRegistry {
    rules: Vec<InteractionRule>,
    broad_phase: bool,
}

impl InteractionRegistry {
    pub fn new(broad_phase: bool) -> Self {
        Self {
            rules: Vec::new(),
            broad_phase,
        }
    }

    /// Collision, lion/prey, lion/carrion, hunter/lion, predator/human
    pub fn standard(config: &SimulationConfig) -> Self {
        let mut registry = Self::new(config.interaction.use_broad_phase);
        for rule in rules::standard_rules(config) {
            registry.register(rule);
        }
        registry
    }

    pub fn register(&mut self, rule: InteractionRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> impl Iterator<Item = &InteractionRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every matching rule to every ordered pair; returns how many
    /// rule effects fired
    ///
    /// With the broad phase on, candidates come from a spatial hash whose
    /// cells are at least as wide as the longest rule range. Rules only
    /// queue forces, so positions (and the hash) stay valid for the whole
    /// pass and the checked set of in-range pairs is unchanged.
    pub fn resolve(&self, entities: &mut EntityStore, ctx: &mut InteractionContext) -> usize {
        if self.rules.is_empty() {
            return 0;
        }
        let ids = entities.ids();
        let grid = self.broad_phase.then(|| {
            let cell = self.rules.iter().map(|r| r.range).fold(1.0f32, f32::max);
            let mut grid = SparseHashGrid::new(cell, &ctx.bounds);
            grid.rebuild(entities.iter().map(|e| (e.id, e.position)));
            grid
        });

        let mut fired = 0;
        for &source in &ids {
            let neighbors;
            let candidates: &[EntityId] = match &grid {
                Some(grid) => match entities.get(source) {
                    Some(e) => {
                        neighbors = grid.query_neighbors(e.position);
                        &neighbors
                    }
                    None => continue,
                },
                None => &ids,
            };

            for &target in candidates {
                if target == source {
                    continue;
                }
                for rule in &self.rules {
                    let hit = entities.with_pair(source, target, |a, b| {
                        if a.is_dead() || b.is_dead() || !rule.matches(a, b) || !(rule.check)(a, b, ctx) {
                            return false;
                        }
                        (rule.perform)(a, b, ctx);
                        true
                    });
                    if hit == Some(true) {
                        fired += 1;
                    }
                }
            }
        }

        if fired > 0 {
            tracing::debug!("tick {}: {} interaction effects", ctx.tick, fired);
        }
        fired
    }
}
