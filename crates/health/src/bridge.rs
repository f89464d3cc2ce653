//! Channel plumbing between the health manager and the consensus layer.

use tokio::sync::{mpsc, oneshot};
use vigil_types::SwitchProposal;

/// Capacity of each bridge channel. One slot: a second switch request
/// waits for the consensus layer to drain the first (accepted
/// backpressure), and restores are dropped while the slot is occupied.
pub(crate) const BRIDGE_CAPACITY: usize = 1;

/// Consensus-side endpoints of the bridge.
///
/// `proposals` carries switch proposals out of the manager (direction 0
/// requests and direction 1 restores); `results` carries the sealed
/// outcomes back in.
pub struct ConsensusBridge {
    pub proposals: mpsc::Receiver<SwitchProposal>,
    pub results: mpsc::Sender<SwitchProposal>,
}

/// Handle for shutting down a running health manager.
///
/// When dropped, signals the manager loop to exit gracefully.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: Option<oneshot::Sender<()>>,
}

impl ShutdownHandle {
    pub(crate) fn new(tx: oneshot::Sender<()>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Trigger shutdown (consumes the handle).
    pub fn shutdown(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ShutdownHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}
