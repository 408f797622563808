//! Sparse hash grid used as the interaction broad phase
//!
//! With cells at least `r` wide on each axis, any two entities closer than
//! `r` sit in the same or adjacent cells, so the 3x3 neighborhood is a
//! superset of every pair a distance-gated rule can fire on. Wrap worlds wrap
//! the cell indices too, and stretch cells so each axis holds a whole number
//! of them; a narrow last column would break adjacency across the seam.

use ahash::AHashMap;

use crate::core::types::{EntityId, Vec2};
use crate::spatial::bounds::{BoundaryMode, WorldBounds};

pub struct SparseHashGrid {
    cell_width: f32,
    cell_height: f32,
    /// Cell counts per axis, used to wrap indices in wrap worlds
    columns: i32,
    rows: i32,
    wrap: bool,
    cells: AHashMap<(i32, i32), Vec<EntityId>>,
}

impl SparseHashGrid {
    pub fn new(cell_size: f32, bounds: &WorldBounds) -> Self {
        let cell_size = cell_size.max(1.0);
        let wrap = bounds.mode == BoundaryMode::Wrap;
        let (columns, rows, cell_width, cell_height) = if wrap {
            let columns = ((bounds.width / cell_size).floor() as i32).max(1);
            let rows = ((bounds.height / cell_size).floor() as i32).max(1);
            (
                columns,
                rows,
                bounds.width / columns as f32,
                bounds.height / rows as f32,
            )
        } else {
            (
                ((bounds.width / cell_size).ceil() as i32).max(1),
                ((bounds.height / cell_size).ceil() as i32).max(1),
                cell_size,
                cell_size,
            )
        };
        Self {
            cell_width,
            cell_height,
            columns,
            rows,
            wrap,
            cells: AHashMap::new(),
        }
    }

    #[inline]
    fn cell_coord(&self, pos: Vec2) -> (i32, i32) {
        self.normalize_cell((
            (pos.x / self.cell_width).floor() as i32,
            (pos.y / self.cell_height).floor() as i32,
        ))
    }

    #[inline]
    fn normalize_cell(&self, (cx, cy): (i32, i32)) -> (i32, i32) {
        if self.wrap {
            (cx.rem_euclid(self.columns), cy.rem_euclid(self.rows))
        } else {
            (cx, cy)
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn insert(&mut self, entity: EntityId, pos: Vec2) {
        let coord = self.cell_coord(pos);
        self.cells.entry(coord).or_default().push(entity);
    }

    /// All entities in the 3x3 neighborhood, sorted by id and deduplicated
    ///
    /// Sorting keeps the candidate order identical to the store's
    /// enumeration order, so swapping the broad phase in or out never
    /// reorders rule effects.
    pub fn query_neighbors(&self, pos: Vec2) -> Vec<EntityId> {
        let (cx, cy) = self.cell_coord(pos);
        let mut found: Vec<EntityId> = (-1..=1)
            .flat_map(|dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .map(|cell| self.normalize_cell(cell))
            .filter_map(|cell| self.cells.get(&cell))
            .flatten()
            .copied()
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Rebuild grid from positions
    pub fn rebuild(&mut self, entities: impl Iterator<Item = (EntityId, Vec2)>) {
        self.clear();
        for (entity, pos) in entities {
            self.insert(entity, pos);
        }
    }
}
