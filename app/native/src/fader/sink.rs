//! Outbound opacity commands.
//!
//! The engine and the focus tracker only see the [`OpacitySink`] trait. The
//! production sink queues commands onto a channel drained by a writer task
//! that owns its own IPC connection, so issuing a command never blocks and
//! commands reach the window manager in the order they were issued.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::ipc::{Connection, IpcError, WindowId};

/// Applies an opacity value to a window. Fire-and-forget.
pub trait OpacitySink: Send + Sync {
    fn set_opacity(&self, window: WindowId, opacity: f64);
}

/// Builds the window manager command for an opacity change.
#[must_use]
pub fn opacity_command(window: WindowId, opacity: f64) -> String {
    format!("[con_id={window}] opacity {opacity}")
}

enum SinkMessage {
    Command(String),
    Flush(oneshot::Sender<()>),
}

/// Opacity sink backed by a dedicated command connection.
#[derive(Debug, Clone)]
pub struct IpcSink {
    sender: mpsc::UnboundedSender<SinkMessage>,
}

impl IpcSink {
    /// Spawns the writer task on `connection` and returns the sink feeding it.
    #[must_use]
    pub fn spawn(connection: Connection) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_writer(connection, receiver));
        (Self { sender }, writer)
    }

    /// Waits until every command queued before this call has been answered.
    ///
    /// Returns immediately if the writer has already stopped.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(SinkMessage::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

impl OpacitySink for IpcSink {
    fn set_opacity(&self, window: WindowId, opacity: f64) {
        let command = opacity_command(window, opacity);
        if self.sender.send(SinkMessage::Command(command)).is_err() {
            tracing::debug!(%window, opacity, "opacity writer is gone, dropping command");
        }
    }
}

async fn run_writer(
    mut connection: Connection,
    mut receiver: mpsc::UnboundedReceiver<SinkMessage>,
) {
    tracing::trace!("opacity writer starting");

    while let Some(message) = receiver.recv().await {
        match message {
            SinkMessage::Command(command) => match connection.run_command(&command).await {
                Ok(outcomes) => {
                    for outcome in outcomes.iter().filter(|outcome| !outcome.success) {
                        tracing::debug!(
                            command = %command,
                            error = outcome.error.as_deref().unwrap_or("unknown"),
                            "opacity command rejected"
                        );
                    }
                }
                Err(IpcError::ConnectionClosed) => {
                    tracing::warn!("command connection closed, opacity writer stopping");
                    break;
                }
                Err(err) => {
                    tracing::warn!(error = %err, command = %command, "opacity command failed");
                }
            },
            SinkMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    tracing::trace!("opacity writer stopped");
}
