//! Timed playback engine for Choreo scripts.
//!
//! This crate wraps the untimed simulation with:
//! - A fixed per-step delay so callers can animate each move
//! - Generation-token cancellation on `reset()`
//! - An editing session that locks the script while it plays

pub mod engine;
pub mod observer;
pub mod session;

pub use engine::{Engine, RunStatus};
pub use observer::{ChannelObserver, NullObserver, SnapshotObserver};
pub use session::Session;

pub use choreo_world::{RejectReason, SimulationState};
