//! Snapshot delivery to the presentation layer.

use choreo_world::SimulationState;
use tokio::sync::mpsc::UnboundedSender;

/// Receives one snapshot per executed step, in script order.
///
/// Each snapshot is an owned copy taken while the engine state is locked, and
/// it is handed over before the lock is released. An observer must not call
/// back into the engine; everything it needs is in the snapshot.
pub trait SnapshotObserver {
    fn on_snapshot(&mut self, snapshot: SimulationState);
}

impl<F> SnapshotObserver for F
where
    F: FnMut(SimulationState),
{
    fn on_snapshot(&mut self, snapshot: SimulationState) {
        (*self)(snapshot)
    }
}

/// Forwards snapshots into an unbounded channel
pub struct ChannelObserver {
    tx: UnboundedSender<SimulationState>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<SimulationState>) -> Self {
        Self { tx }
    }
}

impl SnapshotObserver for ChannelObserver {
    fn on_snapshot(&mut self, snapshot: SimulationState) {
        // A dropped receiver only means nobody is watching any more
        let _ = self.tx.send(snapshot);
    }
}

/// Discards every snapshot
pub struct NullObserver;

impl SnapshotObserver for NullObserver {
    fn on_snapshot(&mut self, _snapshot: SimulationState) {}
}
