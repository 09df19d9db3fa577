//! Scoring and run summaries.

use crate::config::ScoringConfig;
use crate::types::Outcome;
use serde::{Deserialize, Serialize};

impl ScoringConfig {
    /// Score for a finished run of `command_count` commands.
    ///
    /// A win earns the base score minus the per-command cost, floored at zero.
    /// Any other outcome scores zero.
    pub fn score(&self, outcome: Outcome, command_count: usize) -> u32 {
        match outcome {
            Outcome::Win => {
                let count = u32::try_from(command_count).unwrap_or(u32::MAX);
                self.base_win_score
                    .saturating_sub(count.saturating_mul(self.command_cost))
            }
            _ => 0,
        }
    }
}

/// What a completed run ended with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// `Win`, `Lose`, or `Idle` when the script ran out
    pub outcome: Outcome,
    pub score: u32,
    /// Commands actually executed before the run stopped
    pub steps_executed: usize,
    /// Length of the script that was run
    pub script_len: usize,
}

impl RunSummary {
    pub fn is_win(&self) -> bool {
        self.outcome == Outcome::Win
    }
}
