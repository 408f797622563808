//! World geometry: bounds/containment and the broad-phase grid

pub mod bounds;
pub mod sparse_hash;

pub use bounds::{BoundaryMode, WorldBounds};
pub use sparse_hash::SparseHashGrid;
