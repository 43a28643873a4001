//! Client for the sway/i3 IPC protocol.
//!
//! This module speaks just enough of the protocol for the fader: fetching
//! the layout tree, running opacity commands, and subscribing to window
//! events.

mod codec;
mod connection;
mod types;

pub use codec::{
    EVENT_MASK, HEADER_LEN, MAGIC, Message, MessageType, WINDOW_EVENT, encode, encode_frame,
    read_message, write_message,
};
pub use connection::{Connection, EventStream, socket_path};
pub use types::{
    CommandOutcome, Node, NodeType, SubscribeReply, Window, WindowChange, WindowEvent, WindowId,
    WindowKind,
};

/// Errors raised while talking to the window manager.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// No socket path could be resolved.
    #[error("IPC socket not found: set SWAYSOCK or I3SOCK")]
    SocketNotFound,

    /// Socket I/O failed.
    #[error("IPC I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A message did not start with the protocol magic.
    #[error("IPC message has an invalid header")]
    InvalidMagic,

    /// A payload could not be decoded.
    #[error("IPC payload could not be decoded: {0}")]
    Json(#[from] serde_json::Error),

    /// A reply had a different type than the request.
    #[error("IPC reply type mismatch: expected {expected}, got {actual}")]
    UnexpectedMessage { expected: u32, actual: u32 },

    /// The window manager refused the event subscription.
    #[error("IPC subscription was rejected")]
    SubscribeRejected,

    /// The window manager closed the connection.
    #[error("IPC connection closed")]
    ConnectionClosed,
}
