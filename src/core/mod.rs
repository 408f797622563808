pub mod config;
pub mod error;
pub mod scratch;
pub mod types;

pub use config::SimulationConfig;
pub use error::{Result, SimError};
pub use scratch::Scratch;
pub use types::{EntityId, SimTime, Tick, Vec2};
