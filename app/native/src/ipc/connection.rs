//! Socket connections to the window manager.
//!
//! Two kinds of connection are used: request/reply connections for
//! `GET_TREE` and `RUN_COMMAND`, and an event connection that has been
//! subscribed to window events and only ever reads afterwards.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tokio::net::UnixStream;

use super::codec::{self, Message, MessageType, WINDOW_EVENT};
use super::types::{CommandOutcome, Node, SubscribeReply, WindowEvent};
use super::IpcError;

/// Environment variables holding the socket path, in lookup order.
const SOCKET_ENV_VARS: [&str; 2] = ["SWAYSOCK", "I3SOCK"];

/// Window managers asked for their socket path when no variable is set.
const SOCKET_PATH_BINARIES: [&str; 2] = ["sway", "i3"];

// ============================================================================
// Socket Path
// ============================================================================

/// Resolves the IPC socket path from the environment.
///
/// Checks `$SWAYSOCK`, then `$I3SOCK`, then asks `sway --get-socketpath`
/// and `i3 --get-socketpath`.
///
/// # Errors
///
/// Returns [`IpcError::SocketNotFound`] if no source yields a path.
pub fn socket_path() -> Result<PathBuf, IpcError> {
    socket_path_from_env(|key| std::env::var_os(key))
        .or_else(socket_path_from_binaries)
        .ok_or(IpcError::SocketNotFound)
}

/// Resolves the socket path from environment variables only.
fn socket_path_from_env<F>(lookup: F) -> Option<PathBuf>
where F: Fn(&str) -> Option<OsString> {
    SOCKET_ENV_VARS
        .iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn socket_path_from_binaries() -> Option<PathBuf> {
    SOCKET_PATH_BINARIES.iter().find_map(|binary| {
        let output = Command::new(binary).arg("--get-socketpath").output().ok()?;
        if !output.status.success() {
            return None;
        }
        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!path.is_empty()).then(|| PathBuf::from(path))
    })
}

// ============================================================================
// Request/Reply Connection
// ============================================================================

/// A request/reply connection.
#[derive(Debug)]
pub struct Connection {
    stream: UnixStream,
}

impl Connection {
    /// Connects to the socket at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Io`] if the socket cannot be opened.
    pub async fn connect(path: &Path) -> Result<Self, IpcError> {
        let stream = UnixStream::connect(path).await?;
        tracing::trace!(path = %path.display(), "ipc: connected");
        Ok(Self { stream })
    }

    async fn request(
        &mut self,
        message_type: MessageType,
        payload: &[u8],
    ) -> Result<Message, IpcError> {
        codec::write_message(&mut self.stream, message_type, payload).await?;
        let reply = codec::read_message(&mut self.stream).await?;

        if reply.kind != message_type.code() {
            return Err(IpcError::UnexpectedMessage {
                expected: message_type.code(),
                actual: reply.kind,
            });
        }

        Ok(reply)
    }

    /// Fetches the layout tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply is not a tree.
    pub async fn get_tree(&mut self) -> Result<Node, IpcError> {
        self.request(MessageType::GetTree, b"").await?.parse()
    }

    /// Runs a command and returns one outcome per command in the string.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. Commands the window manager
    /// rejected are reported through [`CommandOutcome::success`], not here.
    pub async fn run_command(&mut self, command: &str) -> Result<Vec<CommandOutcome>, IpcError> {
        self.request(MessageType::RunCommand, command.as_bytes()).await?.parse()
    }

    /// Subscribes this connection to window events.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::SubscribeRejected`] if the window manager refuses
    /// the subscription, or any transport error.
    pub async fn subscribe_windows(mut self) -> Result<EventStream, IpcError> {
        let reply: SubscribeReply =
            self.request(MessageType::Subscribe, br#"["window"]"#).await?.parse()?;
        if !reply.success {
            return Err(IpcError::SubscribeRejected);
        }
        tracing::debug!("ipc: subscribed to window events");
        Ok(EventStream { stream: self.stream })
    }
}

// ============================================================================
// Event Connection
// ============================================================================

/// A connection subscribed to window events.
#[derive(Debug)]
pub struct EventStream {
    stream: UnixStream,
}

impl EventStream {
    /// Waits for the next window event, skipping any other message.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::ConnectionClosed`] once the window manager goes
    /// away, or a decoding error for a malformed window event.
    pub async fn next_window_event(&mut self) -> Result<WindowEvent, IpcError> {
        loop {
            let message = codec::read_message(&mut self.stream).await?;
            if message.kind == WINDOW_EVENT {
                return message.parse();
            }
            tracing::trace!(kind = message.kind, "ipc: skipping non-window message");
        }
    }
}
