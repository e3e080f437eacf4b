//! Control handle for a running daemon

use super::state::{DaemonState, DaemonStatus};
use crate::error::{DaemonError, DaemonResult};
use tokio::sync::{mpsc, oneshot, watch};

pub const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Requests handled by the daemon loop between events
#[derive(Debug)]
pub enum DaemonCommand {
    /// Re-read the bindings; the result goes back on the channel
    Reload(oneshot::Sender<DaemonResult<()>>),
    Shutdown,
}

/// Cloneable handle for signal handlers and other tasks
#[derive(Debug, Clone)]
pub struct DaemonHandle {
    commands: mpsc::Sender<DaemonCommand>,
    status: watch::Receiver<DaemonStatus>,
}

impl DaemonHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<DaemonCommand>,
        status: watch::Receiver<DaemonStatus>,
    ) -> Self {
        Self { commands, status }
    }

    /// Ask the daemon to reload and wait for the outcome
    pub async fn reload(&self) -> DaemonResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(DaemonCommand::Reload(reply_tx))
            .await
            .map_err(|_| DaemonError::NotRunning)?;
        reply_rx.await.map_err(|_| DaemonError::NotRunning)?
    }

    /// Ask the daemon to shut down
    pub async fn shutdown(&self) -> DaemonResult<()> {
        self.commands
            .send(DaemonCommand::Shutdown)
            .await
            .map_err(|_| DaemonError::NotRunning)
    }

    /// Latest published status
    pub fn status(&self) -> DaemonStatus {
        self.status.borrow().clone()
    }

    /// Wait until the daemon reaches `state`
    pub async fn wait_for_state(&mut self, state: DaemonState) -> DaemonResult<DaemonStatus> {
        self.status
            .wait_for(|status| status.state == state)
            .await
            .map(|status| status.clone())
            .map_err(|_| DaemonError::NotRunning)
    }
}
