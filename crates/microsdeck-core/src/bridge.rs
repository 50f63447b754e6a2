// ── Context bridge ──
//
// Mirrors a `Manager`'s public snapshot into a `watch` channel a render
// tree can read from. Mount subscribes to the update bus *before* reading
// the first snapshot, so an update landing between the two is never lost.
// Every `Update` (or resync after lag) republishes the latest snapshot
// once. Events that happened before mount are not replayed.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bus::{ManagerEvent, Received, Subscription};
use crate::manager::Manager;
use crate::snapshot::Snapshot;

pub struct ContextBridge {
    manager: Manager,
    state: watch::Receiver<Arc<Snapshot>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ContextBridge {
    /// Attach to `manager` and start republishing. Must be called inside a
    /// Tokio runtime.
    pub fn mount(manager: &Manager) -> Self {
        let updates = manager.updates();
        let (tx, state) = watch::channel(manager.snapshot());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(forward_updates(
            manager.clone(),
            updates,
            tx,
            cancel.clone(),
        ));
        debug!("context bridge mounted");

        Self {
            manager: manager.clone(),
            state,
            cancel,
            task: Some(task),
        }
    }

    /// A receiver that is notified whenever the snapshot is republished.
    pub fn state(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.state.clone()
    }

    /// The latest published snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state.borrow())
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Stop republishing and wait until the update listener is released.
    pub async fn unmount(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ContextBridge {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn forward_updates(
    manager: Manager,
    mut updates: Subscription<ManagerEvent>,
    tx: watch::Sender<Arc<Snapshot>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = updates.recv() => match received {
                Some(Received::Event(ManagerEvent::Update) | Received::Resync { .. }) => {
                    tx.send_replace(manager.snapshot());
                }
                Some(Received::Event(ManagerEvent::Backend(_))) => {}
                None => break,
            },
        }
    }
    debug!("context bridge unmounted");
}
