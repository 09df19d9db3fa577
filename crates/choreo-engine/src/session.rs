//! A script under edit, paired with the engine that plays it.

use crate::engine::{Engine, RunStatus};
use crate::observer::SnapshotObserver;
use choreo_core::{Command, CommandId, CommandKind, Error, Result, Script};
use parking_lot::{RwLock, RwLockWriteGuard};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Editing front-end for one player.
///
/// Edits are refused while a run is in progress.
#[derive(Clone)]
pub struct Session {
    engine: Engine,
    script: Arc<RwLock<Script>>,
}

impl Session {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            script: Arc::new(RwLock::new(Script::new())),
        }
    }

    pub fn with_script(engine: Engine, script: Script) -> Self {
        Self {
            engine,
            script: Arc::new(RwLock::new(script)),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Copy of the current script
    pub fn script(&self) -> Script {
        self.script.read().clone()
    }

    pub fn add(&self, kind: CommandKind) -> Result<CommandId> {
        let mut script = self.editable_script("add")?;
        Ok(script.push(kind))
    }

    pub fn remove(&self, id: CommandId) -> Result<Command> {
        self.editable_script("remove")?.remove(id)
    }

    pub fn clear(&self) -> Result<()> {
        self.editable_script("clear")?.clear();
        Ok(())
    }

    /// Move `from` into the slot currently held by `to`
    pub fn reorder(&self, from: CommandId, to: CommandId) -> Result<()> {
        self.editable_script("reorder")?.move_command(from, to)
    }

    /// Reset the board and keep the script for another attempt
    #[instrument(skip(self))]
    pub fn try_again(&self) {
        self.engine.reset();
    }

    /// Reset the board and start from an empty script
    #[instrument(skip(self))]
    pub fn rewrite(&self) {
        self.engine.reset();
        self.script.write().clear();
    }

    /// Play the current script
    pub async fn run<O>(&self, observer: O) -> RunStatus
    where
        O: SnapshotObserver,
    {
        let script = self.script();
        self.engine.run_script(&script, observer).await
    }

    /// Write access to the script, granted only while no run is in progress.
    ///
    /// The guard is taken before the engine is asked, so the running check and
    /// the edit it permits cannot be split by a run copying the script.
    fn editable_script(&self, action: &str) -> Result<RwLockWriteGuard<'_, Script>> {
        let script = self.script.write();
        if self.engine.is_running() {
            debug!(action, "Script edit refused while running");
            return Err(Error::InvalidState(format!(
                "cannot {} commands while the script is running",
                action
            )));
        }
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use choreo_core::{CommandKind::*, EngineConfig, Outcome, Position};
    use choreo_world::WorldModel;

    fn session() -> Session {
        let engine = Engine::new(WorldModel::reference(), EngineConfig::default()).unwrap();
        Session::new(engine)
    }

    #[test]
    fn test_editing_while_idle() {
        let session = session();
        let a = session.add(Forward).unwrap();
        let b = session.add(TurnRight).unwrap();
        session.add(Pause).unwrap();

        session.reorder(a, b).unwrap();
        assert_eq!(session.script().kinds(), vec![TurnRight, Forward, Pause]);

        session.remove(b).unwrap();
        assert_eq!(session.script().kinds(), vec![Forward, Pause]);
        assert!(matches!(session.remove(b), Err(Error::NotFound(_))));

        session.clear().unwrap();
        assert!(session.script().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_refused_while_running() {
        let session = session();
        let first = session.add(Forward).unwrap();
        let second = session.add(Forward).unwrap();

        let background = session.clone();
        let handle = tokio::spawn(async move { background.run(NullObserver).await });
        while !session.engine().is_running() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(session.add(Pause), Err(Error::InvalidState(_))));
        assert!(matches!(session.remove(first), Err(Error::InvalidState(_))));
        assert!(matches!(session.clear(), Err(Error::InvalidState(_))));
        assert!(matches!(
            session.reorder(first, second),
            Err(Error::InvalidState(_))
        ));
        assert_eq!(session.script().len(), 2);

        let status = handle.await.unwrap();
        assert_eq!(status.summary().unwrap().outcome, Outcome::Idle);
        assert!(session.add(Pause).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_edits_never_reach_a_running_script() {
        let engine = Engine::new(WorldModel::reference(), EngineConfig::instant()).unwrap();
        let session = Session::with_script(engine, Script::from_kinds([Forward, Pause]));

        for _ in 0..50 {
            session.try_again();
            let before = session.script().len();

            let editor = session.clone();
            let edit = tokio::spawn(async move { editor.add(Pause).is_ok() });
            let status = session.run(NullObserver).await;
            let added = edit.await.unwrap();

            let played = status.summary().unwrap().script_len;
            let after = session.script().len();
            assert_eq!(after, if added { before + 1 } else { before });
            assert!(played == before || played == after);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_again_and_rewrite() {
        let session = session();
        for _ in 0..9 {
            session.add(Forward).unwrap();
        }
        session.add(TurnRight).unwrap();
        for _ in 0..9 {
            session.add(Forward).unwrap();
        }

        let status = session.run(NullObserver).await;
        assert!(status.summary().unwrap().is_win());
        assert_eq!(session.engine().outcome(), Outcome::Win);

        session.try_again();
        assert_eq!(session.engine().outcome(), Outcome::Idle);
        assert_eq!(session.engine().snapshot().actor, Position::new(0, 0));
        assert_eq!(session.script().len(), 19);

        session.rewrite();
        assert!(session.script().is_empty());
        assert_eq!(
            session.run(NullObserver).await,
            RunStatus::Rejected(choreo_world::RejectReason::EmptyScript)
        );
    }
}
