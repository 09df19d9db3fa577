//! Grid world model and the untimed script simulation.
//!
//! This crate holds the immutable puzzle description and the deterministic
//! state machine that plays a script against it.

pub mod enemy;
pub mod simulation;
pub mod world;

pub use enemy::{EnemyDefinition, MotionRule};
pub use simulation::{RejectReason, Simulation, SimulationState, StepReport};
pub use world::{WorldModel, MAX_GRID_SIZE};
