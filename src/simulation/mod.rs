//! Simulation systems and the world update orchestrator

pub mod context;
pub mod diplomacy;
pub mod environment;
pub mod lifecycle;
pub mod notifications;
pub mod physics;
pub mod setup;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod vitals;

pub use context::{InteractionContext, UpdateContext};
pub use environment::{Environment, Sector, SectorKind};
pub use notifications::{Notification, NotificationKind, NotificationLog};
pub use state::{GameOver, GameOverCause, GameVariant, GameWorldState, SimulationFlags};
pub use tick::{Simulation, SimulationEvent};
