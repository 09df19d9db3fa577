//! Core types and utilities for the Choreo script puzzle engine.

pub mod types;
pub mod config;
pub mod error;
pub mod score;
pub mod script;

pub use error::{Error, Result};
pub use types::*;
pub use config::*;
pub use score::*;
pub use script::Script;
