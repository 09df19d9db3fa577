//! Step-by-step simulation of a script against a world.
//!
//! [`Simulation`] is the untimed state machine. It knows nothing about delays
//! or cancellation; the async engine drives it one command at a time.

use crate::world::WorldModel;
use choreo_core::{CommandKind, Direction, Outcome, Position, RunSummary, ScoringConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Everything a renderer needs to draw one frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationState {
    pub actor: Position,
    pub facing: Direction,
    /// Index-aligned with the world's enemy definitions
    pub enemies: Vec<Position>,
    pub outcome: Outcome,
    /// Index of the command just executed; only set while running
    pub current_step: Option<usize>,
    /// Only meaningful once the outcome is `Win` or `Lose`
    pub score: u32,
}

impl SimulationState {
    pub fn initial(world: &WorldModel) -> Self {
        Self {
            actor: world.actor_start,
            facing: world.actor_facing,
            enemies: world.enemy_starts(),
            outcome: Outcome::Idle,
            current_step: None,
            score: 0,
        }
    }

    pub fn enemy_at(&self, pos: Position) -> bool {
        self.enemies.contains(&pos)
    }
}

/// Why a run could not start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    EmptyScript,
    AlreadyRunning,
    /// A finished win or loss must be reset first
    NotIdle,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            RejectReason::EmptyScript => "script is empty",
            RejectReason::AlreadyRunning => "a run is already in progress",
            RejectReason::NotIdle => "the previous run has not been reset",
        };
        f.write_str(msg)
    }
}

/// Result of executing a single command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub index: usize,
    pub kind: CommandKind,
    /// The move left the grid and was dropped
    pub blocked: bool,
    pub outcome: Outcome,
}

pub struct Simulation {
    world: Arc<WorldModel>,
    scoring: ScoringConfig,
    state: SimulationState,
    script_len: usize,
    steps_executed: usize,
}

impl Simulation {
    pub fn new(world: Arc<WorldModel>, scoring: ScoringConfig) -> Self {
        let state = SimulationState::initial(&world);
        Self {
            world,
            scoring,
            state,
            script_len: 0,
            steps_executed: 0,
        }
    }

    pub fn world(&self) -> &WorldModel {
        &self.world
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn snapshot(&self) -> SimulationState {
        self.state.clone()
    }

    pub fn outcome(&self) -> Outcome {
        self.state.outcome
    }

    pub fn steps_executed(&self) -> usize {
        self.steps_executed
    }

    /// Back to the construction-time state
    pub fn reset(&mut self) {
        self.state = SimulationState::initial(&self.world);
        self.script_len = 0;
        self.steps_executed = 0;
    }

    /// Start a run of `script_len` commands from the world's initial pose.
    ///
    /// Returns the outcome the run starts in: normally `Running`, or `Win`
    /// when the actor already stands on the target.
    pub fn begin(&mut self, script_len: usize) -> Result<Outcome, RejectReason> {
        match self.state.outcome {
            Outcome::Running => return Err(RejectReason::AlreadyRunning),
            Outcome::Win | Outcome::Lose => return Err(RejectReason::NotIdle),
            Outcome::Idle => {}
        }
        if script_len == 0 {
            return Err(RejectReason::EmptyScript);
        }

        self.reset();
        self.script_len = script_len;
        self.state.outcome = Outcome::Running;

        if self.state.actor == self.world.target {
            debug!(
                event = "run_won_at_start",
                actor = %self.state.actor,
                "Actor starts on the target"
            );
            self.finish(Outcome::Win);
        }

        Ok(self.state.outcome)
    }

    /// Execute one command. Returns `None` when no run is in progress.
    pub fn step(&mut self, kind: CommandKind) -> Option<StepReport> {
        if self.state.outcome != Outcome::Running {
            return None;
        }

        let index = self.steps_executed;
        self.state.current_step = Some(index);

        let mut blocked = false;
        let candidate = match kind {
            CommandKind::Forward => Some(self.state.actor.step(self.state.facing)),
            CommandKind::Backward => Some(self.state.actor.step(self.state.facing.opposite())),
            CommandKind::TurnLeft => {
                self.state.facing = self.state.facing.turn_left();
                None
            }
            CommandKind::TurnRight => {
                self.state.facing = self.state.facing.turn_right();
                None
            }
            CommandKind::Pause => None,
        };
        if let Some(next) = candidate {
            if self.world.contains(next) {
                self.state.actor = next;
            } else {
                blocked = true;
            }
        }

        for (pos, enemy) in self.state.enemies.iter_mut().zip(&self.world.enemies) {
            *pos = enemy.advance(*pos);
        }
        self.steps_executed += 1;

        trace!(
            step = index,
            command = %kind,
            actor = %self.state.actor,
            facing = ?self.state.facing,
            blocked = blocked,
            "Executed command"
        );

        if self.state.actor == self.world.target {
            self.finish(Outcome::Win);
        } else if self.state.enemy_at(self.state.actor) {
            self.finish(Outcome::Lose);
        } else if self.steps_executed >= self.script_len {
            self.finish(Outcome::Idle);
        }

        Some(StepReport {
            index,
            kind,
            blocked,
            outcome: self.state.outcome,
        })
    }

    fn finish(&mut self, outcome: Outcome) {
        self.state.outcome = outcome;
        self.state.current_step = None;
        self.state.score = self.scoring.score(outcome, self.script_len);
        debug!(
            event = "run_finished",
            outcome = %outcome,
            score = self.state.score,
            steps_executed = self.steps_executed,
            script_len = self.script_len,
            "Run finished"
        );
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            outcome: self.state.outcome,
            score: self.state.score,
            steps_executed: self.steps_executed,
            script_len: self.script_len,
        }
    }

    /// Run a whole script without delays, reporting each step's state
    pub fn run_to_completion<F>(
        &mut self,
        script: &[CommandKind],
        mut observer: F,
    ) -> Result<RunSummary, RejectReason>
    where
        F: FnMut(&SimulationState),
    {
        if self.begin(script.len())? == Outcome::Running {
            for kind in script {
                if self.step(*kind).is_none() {
                    break;
                }
                observer(&self.state);
                if self.state.outcome != Outcome::Running {
                    break;
                }
            }
        } else {
            observer(&self.state);
        }
        Ok(self.summary())
    }
}
