//! Savanna - tick-based ecosystem simulation core
//!
//! Two games share one engine: a lion chase on a wrap-around savanna and a
//! tribal survival game in a walled valley. The embedding application owns a
//! `Simulation`, feeds it player intent and reads the `GameWorldState` back
//! after every step.

pub mod ai;
pub mod core;
pub mod entity;
pub mod fsm;
pub mod interaction;
pub mod simulation;
pub mod spatial;

pub use crate::core::config::SimulationConfig;
pub use crate::core::error::{Result, SimError};
pub use crate::simulation::{GameVariant, GameWorldState, Simulation, SimulationEvent};
