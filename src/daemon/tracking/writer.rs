use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error};

use crate::storage::{snapshot::Snapshot, PersistenceGateway};

/// Saves snapshots in the background so that the tracking loop never waits on the disk. Snapshots
/// submitted while a save is running are coalesced into the newest one.
pub struct SnapshotWriter {
    sender: mpsc::UnboundedSender<Snapshot>,
    handle: JoinHandle<()>,
}

impl SnapshotWriter {
    pub fn spawn<G>(gateway: G) -> Self
    where
        G: PersistenceGateway + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(write_snapshots(gateway, receiver));
        Self { sender, handle }
    }

    pub fn submit(&self, snapshot: Snapshot) {
        if self.sender.send(snapshot).is_err() {
            error!("Snapshot writer is gone, dropping snapshot");
        }
    }

    /// Saves `last` and waits until everything submitted before it is written.
    pub async fn finish(self, last: Snapshot) {
        self.submit(last);
        drop(self.sender);
        if let Err(e) = self.handle.await {
            error!("Snapshot writer failed {e:?}");
        }
    }
}

async fn write_snapshots<G: PersistenceGateway>(
    gateway: G,
    mut receiver: mpsc::UnboundedReceiver<Snapshot>,
) {
    while let Some(mut snapshot) = receiver.recv().await {
        while let Ok(newer) = receiver.try_recv() {
            snapshot = newer;
        }
        match gateway.save(&snapshot).await {
            Ok(()) => debug!(
                total = snapshot.total_time_seconds,
                productive = snapshot.productive_time_seconds,
                "Saved snapshot"
            ),
            // Counters stay in memory and the next flush tries again.
            Err(e) => error!("Failed to save snapshot {e:?}"),
        }
    }
}
