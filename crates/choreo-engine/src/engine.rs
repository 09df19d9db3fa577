//! Timed, cancellable script playback.

use crate::observer::SnapshotObserver;
use choreo_core::{CommandKind, EngineConfig, Outcome, Result, RunSummary, Script};
use choreo_world::{RejectReason, Simulation, SimulationState, WorldModel};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// How a call to [`Engine::run`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The run reached a win, a loss, or the end of the script
    Completed(RunSummary),
    /// The run never started
    Rejected(RejectReason),
    /// A `reset()` or a newer run superseded this one
    Cancelled,
}

impl RunStatus {
    pub fn summary(&self) -> Option<RunSummary> {
        match self {
            RunStatus::Completed(summary) => Some(*summary),
            _ => None,
        }
    }
}

struct EngineInner {
    sim: Simulation,
    /// Bumped by every `run()` and `reset()`; continuations holding an older
    /// value are stale
    generation: u64,
}

enum Started {
    Running(u64),
    Finished(RunSummary),
}

enum Advance {
    Stale,
    Continue,
    Finished(RunSummary),
}

/// Owns the simulation state and plays scripts against it.
///
/// Cloning yields another handle to the same engine, so one task can await
/// [`Engine::run`] while another calls [`Engine::reset`].
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Mutex<EngineInner>>,
    world: Arc<WorldModel>,
    config: Arc<EngineConfig>,
}

impl Engine {
    pub fn new(world: WorldModel, config: EngineConfig) -> Result<Self> {
        world.validate()?;
        let world = Arc::new(world);
        let sim = Simulation::new(world.clone(), config.scoring);

        info!(
            grid_size = world.grid_size,
            enemies = world.enemies.len(),
            step_duration_ms = config.step_duration_ms,
            "Engine created"
        );

        Ok(Self {
            inner: Arc::new(Mutex::new(EngineInner { sim, generation: 0 })),
            world,
            config: Arc::new(config),
        })
    }

    pub fn world(&self) -> &WorldModel {
        &self.world
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SimulationState {
        self.inner.lock().sim.snapshot()
    }

    pub fn outcome(&self) -> Outcome {
        self.inner.lock().sim.outcome()
    }

    pub fn is_running(&self) -> bool {
        self.outcome() == Outcome::Running
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Restore the initial state and abandon any run in flight
    #[instrument(skip(self))]
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let was = inner.sim.outcome();
        inner.sim.reset();
        debug!(
            event = "engine_reset",
            generation = inner.generation,
            previous_outcome = %was,
            "Engine reset"
        );
    }

    pub async fn run_script<O>(&self, script: &Script, observer: O) -> RunStatus
    where
        O: SnapshotObserver,
    {
        let kinds = script.kinds();
        self.run(&kinds, observer).await
    }

    /// Play `script` from the world's initial pose, one step per tick.
    ///
    /// The observer sees one snapshot per executed command. The future
    /// resolves once the run leaves `Running` or is superseded.
    #[instrument(skip_all, fields(script_len = script.len()))]
    pub async fn run<O>(&self, script: &[CommandKind], mut observer: O) -> RunStatus
    where
        O: SnapshotObserver,
    {
        let token = match self.start(script.len(), &mut observer) {
            Ok(Started::Running(token)) => token,
            Ok(Started::Finished(summary)) => return RunStatus::Completed(summary),
            Err(reason) => {
                debug!(event = "run_rejected", reason = %reason, "Run rejected");
                return RunStatus::Rejected(reason);
            }
        };

        info!(
            event = "run_started",
            generation = token,
            script_len = script.len(),
            "Run started"
        );

        self.hold(self.config.step_duration()).await;

        for (index, kind) in script.iter().enumerate() {
            if *kind == CommandKind::Pause {
                self.hold(self.config.pause_duration()).await;
            }

            let advance = self.advance(token, *kind, &mut observer);
            if let Advance::Stale = advance {
                debug!(
                    event = "run_cancelled",
                    generation = token,
                    next_step = index,
                    "Discarding stale run"
                );
                return RunStatus::Cancelled;
            }

            // Every executed command is followed by one step delay, the last included
            self.hold(self.config.step_duration()).await;

            if let Advance::Finished(summary) = advance {
                if !self.is_current(token) {
                    debug!(
                        event = "run_cancelled",
                        generation = token,
                        "Run superseded during its final step delay"
                    );
                    return RunStatus::Cancelled;
                }
                info!(
                    event = "run_complete",
                    generation = token,
                    outcome = %summary.outcome,
                    score = summary.score,
                    steps_executed = summary.steps_executed,
                    "🏁 Run complete"
                );
                return RunStatus::Completed(summary);
            }
        }

        // The last command always ends the run, so only a superseded run gets here
        RunStatus::Cancelled
    }

    fn start<O: SnapshotObserver>(
        &self,
        script_len: usize,
        observer: &mut O,
    ) -> std::result::Result<Started, RejectReason> {
        let mut inner = self.inner.lock();
        let outcome = inner.sim.begin(script_len)?;
        inner.generation += 1;

        if outcome == Outcome::Running {
            Ok(Started::Running(inner.generation))
        } else {
            observer.on_snapshot(inner.sim.snapshot());
            Ok(Started::Finished(inner.sim.summary()))
        }
    }

    fn advance<O: SnapshotObserver>(
        &self,
        token: u64,
        kind: CommandKind,
        observer: &mut O,
    ) -> Advance {
        let mut inner = self.inner.lock();
        if inner.generation != token {
            return Advance::Stale;
        }

        let report = match inner.sim.step(kind) {
            Some(report) => report,
            None => return Advance::Stale,
        };
        observer.on_snapshot(inner.sim.snapshot());

        if report.outcome == Outcome::Running {
            Advance::Continue
        } else {
            Advance::Finished(inner.sim.summary())
        }
    }

    fn is_current(&self, token: u64) -> bool {
        self.inner.lock().generation == token
    }

    async fn hold(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{ChannelObserver, NullObserver};
    use choreo_core::{CommandKind::*, Direction, Position};
    use choreo_world::{EnemyDefinition, MotionRule};
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    fn winning_script() -> Vec<CommandKind> {
        let mut script = vec![Forward; 9];
        script.push(TurnRight);
        script.extend(vec![Forward; 9]);
        script
    }

    fn engine() -> Engine {
        Engine::new(WorldModel::reference(), EngineConfig::default()).unwrap()
    }

    async fn wait_until_running(engine: &Engine) {
        while !engine.is_running() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_emits_one_snapshot_per_step() {
        let engine = engine();
        let mut frames = Vec::new();

        let status = engine
            .run(&[Forward, TurnRight, Forward], |state: SimulationState| frames.push(state))
            .await;

        let summary = status.summary().unwrap();
        assert_eq!(summary.outcome, Outcome::Idle);
        assert_eq!(summary.steps_executed, 3);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].current_step, Some(0));
        assert_eq!(frames[1].current_step, Some(1));
        assert_eq!(frames[2].outcome, Outcome::Idle);
        assert_eq!(frames[2].actor, Position::new(1, 1));
        assert_eq!(engine.snapshot().facing, Direction::Down);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_timing_includes_pause_beat() {
        let engine = engine();
        let started = Instant::now();

        engine.run(&[Forward, Pause, Forward], NullObserver).await;

        // leading delay + one delay per command + one extra beat for the pause
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1600), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_step_is_held_before_completion() {
        let engine = engine();
        let started = Instant::now();
        let mut seen_at = Vec::new();

        let status = engine
            .run(&[Forward, Forward, Forward], |_state: SimulationState| {
                seen_at.push(started.elapsed())
            })
            .await;

        assert_eq!(status.summary().unwrap().steps_executed, 3);
        assert_eq!(
            seen_at,
            vec![
                Duration::from_millis(300),
                Duration::from_millis(600),
                Duration::from_millis(900),
            ]
        );
        assert_eq!(started.elapsed(), Duration::from_millis(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_final_delay_cancels_run() {
        let engine = engine();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let background = engine.clone();
        let handle = tokio::spawn(async move {
            background.run(&[Forward], ChannelObserver::new(tx)).await
        });

        let last = rx.recv().await.unwrap();
        assert_eq!(last.outcome, Outcome::Idle);
        assert!(!handle.is_finished());

        engine.reset();
        assert_eq!(handle.await.unwrap(), RunStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_owns_its_snapshots() {
        let engine = engine();
        let mut frames = Vec::new();

        engine
            .run(&[Forward, Forward], |state: SimulationState| frames.push(state))
            .await;
        engine.reset();

        assert_eq!(frames[0].actor, Position::new(1, 0));
        assert_eq!(frames[1].actor, Position::new(2, 0));
        assert_eq!(engine.snapshot().actor, Position::new(0, 0));

        frames[1].actor = Position::new(7, 7);
        assert_eq!(engine.snapshot().actor, Position::new(0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_winning_run_scores() {
        let engine = engine();
        let status = engine.run(&winning_script(), NullObserver).await;

        let summary = status.summary().unwrap();
        assert!(summary.is_win());
        assert_eq!(summary.score, 810);
        assert_eq!(engine.snapshot().actor, Position::new(9, 9));
        assert_eq!(engine.snapshot().score, 810);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preconditions_reject_without_side_effects() {
        let engine = engine();
        assert_eq!(
            engine.run(&[], NullObserver).await,
            RunStatus::Rejected(RejectReason::EmptyScript)
        );

        let background = engine.clone();
        let handle = tokio::spawn(async move {
            background.run(&[Forward, Forward, Forward], NullObserver).await
        });
        wait_until_running(&engine).await;

        let generation = engine.generation();
        assert_eq!(
            engine.run(&[Backward], NullObserver).await,
            RunStatus::Rejected(RejectReason::AlreadyRunning)
        );
        assert_eq!(engine.generation(), generation);

        let status = handle.await.unwrap();
        assert_eq!(status.summary().unwrap().steps_executed, 3);
        assert_eq!(engine.snapshot().actor, Position::new(3, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_game_needs_reset() {
        let engine = engine();
        engine.run(&winning_script(), NullObserver).await;
        assert_eq!(engine.outcome(), Outcome::Win);

        assert_eq!(
            engine.run(&[Forward], NullObserver).await,
            RunStatus::Rejected(RejectReason::NotIdle)
        );

        engine.reset();
        let status = engine.run(&[Forward], NullObserver).await;
        assert_eq!(status.summary().unwrap().outcome, Outcome::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_before_first_step_cancels_run() {
        let engine = engine();
        let initial = engine.snapshot();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let background = engine.clone();
        let handle = tokio::spawn(async move {
            background
                .run(&winning_script(), ChannelObserver::new(tx))
                .await
        });
        wait_until_running(&engine).await;
        engine.reset();

        assert_eq!(handle.await.unwrap(), RunStatus::Cancelled);
        assert_eq!(engine.snapshot(), initial);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_mid_run_stops_snapshots() {
        let engine = engine();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let background = engine.clone();
        let handle = tokio::spawn(async move {
            background
                .run(&winning_script(), ChannelObserver::new(tx))
                .await
        });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.actor, Position::new(1, 0));
        assert_eq!(second.actor, Position::new(2, 0));

        engine.reset();
        assert_eq!(handle.await.unwrap(), RunStatus::Cancelled);
        assert!(rx.recv().await.is_none());
        assert_eq!(engine.snapshot(), SimulationState::initial(engine.world()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_run_supersedes_reset_run() {
        let engine = engine();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();

        let background = engine.clone();
        let old = tokio::spawn(async move {
            background
                .run(&winning_script(), ChannelObserver::new(old_tx))
                .await
        });
        wait_until_running(&engine).await;
        engine.reset();

        let mut frames = Vec::new();
        let status = engine
            .run(&[Forward, Forward], |state: SimulationState| frames.push(state))
            .await;

        assert_eq!(old.await.unwrap(), RunStatus::Cancelled);
        assert!(old_rx.recv().await.is_none());
        assert_eq!(status.summary().unwrap().steps_executed, 2);
        assert_eq!(frames.len(), 2);
        assert_eq!(engine.snapshot().actor, Position::new(2, 0));
    }

    #[tokio::test]
    async fn test_instant_config_and_initial_win() {
        let world = WorldModel {
            grid_size: 3,
            target: Position::new(1, 1),
            actor_start: Position::new(1, 1),
            actor_facing: Direction::Up,
            enemies: vec![EnemyDefinition::new(
                Position::new(0, 0),
                MotionRule::Stationary,
            )],
        };
        let engine = Engine::new(world, EngineConfig::instant()).unwrap();

        let mut frames = Vec::new();
        let status = engine
            .run(&[Pause, Pause], |state: SimulationState| frames.push(state))
            .await;

        let summary = status.summary().unwrap();
        assert!(summary.is_win());
        assert_eq!(summary.steps_executed, 0);
        assert_eq!(summary.score, 980);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_invalid_world_is_refused() {
        let world = WorldModel {
            grid_size: 5,
            target: Position::new(7, 7),
            ..WorldModel::reference()
        };
        assert!(Engine::new(world, EngineConfig::default()).is_err());
    }
}
