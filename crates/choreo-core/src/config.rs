//! Configuration types for the engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Score parameters applied when a run ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Score awarded for a win before command costs
    pub base_win_score: u32,
    /// Deducted per command in the script
    pub command_cost: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_win_score: 1000,
            command_cost: 10,
        }
    }
}

/// Playback timing and scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay between consecutive steps (milliseconds)
    pub step_duration_ms: u64,
    /// Extra step durations a `pause` holds before it executes
    pub pause_extra_ticks: u32,
    /// Scoring parameters
    pub scoring: ScoringConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_duration_ms: 300,
            pause_extra_ticks: 1,
            scoring: ScoringConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Config with no delays, for tests and batch evaluation
    pub fn instant() -> Self {
        Self {
            step_duration_ms: 0,
            pause_extra_ticks: 0,
            ..Default::default()
        }
    }

    pub fn step_duration(&self) -> Duration {
        Duration::from_millis(self.step_duration_ms)
    }

    pub fn pause_duration(&self) -> Duration {
        self.step_duration() * self.pause_extra_ticks
    }
}
