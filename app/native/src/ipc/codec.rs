//! Wire framing for the sway/i3 IPC protocol.
//!
//! Every message is a 14-byte header followed by a JSON payload:
//!
//! ```text
//! "i3-ipc" | payload length (u32, native endian) | type (u32, native endian) | payload
//! ```
//!
//! Event messages share the framing and are marked by the high bit of the type.

use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::IpcError;

/// Magic string opening every message.
pub const MAGIC: &[u8; 6] = b"i3-ipc";

/// Header size: magic, payload length and message type.
pub const HEADER_LEN: usize = MAGIC.len() + 8;

/// Bit set on the type of every event message.
pub const EVENT_MASK: u32 = 0x8000_0000;

/// Type code of window events.
pub const WINDOW_EVENT: u32 = EVENT_MASK | 3;

/// Request types this client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    RunCommand,
    Subscribe,
    GetTree,
}

impl MessageType {
    /// Protocol type code.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::RunCommand => 0,
            Self::Subscribe => 2,
            Self::GetTree => 4,
        }
    }
}

/// A decoded message: type code and raw JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: u32,
    pub payload: Vec<u8>,
}

impl Message {
    /// Deserializes the JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Json`] if the payload does not match `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, IpcError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

/// Encodes a request into a single buffer.
#[must_use]
pub fn encode(message_type: MessageType, payload: &[u8]) -> Vec<u8> {
    encode_frame(message_type.code(), payload)
}

/// Encodes a message with an arbitrary type code, including replies and events.
#[must_use]
pub fn encode_frame(kind: u32, payload: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(HEADER_LEN + payload.len());
    buffer.extend_from_slice(MAGIC);
    // Payload sizes are bounded by what the window manager accepts, far below u32::MAX.
    #[allow(clippy::cast_possible_truncation)]
    buffer.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
    buffer.extend_from_slice(&kind.to_ne_bytes());
    buffer.extend_from_slice(payload);
    buffer
}

/// Writes a request to the socket.
///
/// # Errors
///
/// Returns [`IpcError::Io`] if the write fails.
pub async fn write_message<W>(
    writer: &mut W,
    message_type: MessageType,
    payload: &[u8],
) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode(message_type, payload)).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one message from the socket.
///
/// # Errors
///
/// Returns [`IpcError::ConnectionClosed`] if the peer closed the socket,
/// [`IpcError::InvalidMagic`] if the header is corrupt, or [`IpcError::Io`]
/// for other read failures.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, IpcError>
where R: AsyncRead + Unpin {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await.map_err(closed_on_eof)?;

    if &header[..MAGIC.len()] != MAGIC {
        return Err(IpcError::InvalidMagic);
    }

    let length = u32::from_ne_bytes([header[6], header[7], header[8], header[9]]);
    let kind = u32::from_ne_bytes([header[10], header[11], header[12], header[13]]);

    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload).await.map_err(closed_on_eof)?;

    Ok(Message { kind, payload })
}

fn closed_on_eof(err: std::io::Error) -> IpcError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        IpcError::ConnectionClosed
    } else {
        IpcError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_run_command_header() {
        let bytes = encode(MessageType::RunCommand, b"[con_id=4] opacity 0.9");
        assert_eq!(&bytes[..6], b"i3-ipc");
        assert_eq!(u32::from_ne_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]), 22);
        assert_eq!(u32::from_ne_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]), 0);
        assert_eq!(&bytes[HEADER_LEN..], b"[con_id=4] opacity 0.9");
    }

    #[test]
    fn test_encode_empty_payload() {
        let bytes = encode(MessageType::GetTree, b"");
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(u32::from_ne_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]), 4);
    }

    #[tokio::test]
    async fn test_read_window_event() {
        let payload = br#"{"change":"focus","container":{"id":7,"type":"con"}}"#;
        let bytes = encode_frame(WINDOW_EVENT, payload);
        let mut reader = bytes.as_slice();

        let message = read_message(&mut reader).await.unwrap();
        assert_ne!(message.kind & EVENT_MASK, 0);
        assert_eq!(message.kind, WINDOW_EVENT);

        let event: crate::ipc::WindowEvent = message.parse().unwrap();
        assert_eq!(event.container.id.0, 7);
    }

    #[tokio::test]
    async fn test_read_consecutive_messages() {
        let mut bytes = encode_frame(2, br#"{"success":true}"#);
        bytes.extend(encode_frame(0, br#"[{"success":true}]"#));
        let mut reader = bytes.as_slice();

        let first = read_message(&mut reader).await.unwrap();
        let second = read_message(&mut reader).await.unwrap();
        assert_eq!(first.kind, 2);
        assert_eq!(first.kind & EVENT_MASK, 0);
        assert_eq!(second.kind, 0);
        assert!(matches!(read_message(&mut reader).await, Err(IpcError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_read_rejects_bad_magic() {
        let mut bytes = encode_frame(0, b"[]");
        bytes[0] = b'x';
        let mut reader = bytes.as_slice();
        assert!(matches!(read_message(&mut reader).await, Err(IpcError::InvalidMagic)));
    }

    #[tokio::test]
    async fn test_truncated_payload_is_closed_connection() {
        let mut bytes = encode_frame(4, br#"{"id":1}"#);
        bytes.truncate(bytes.len() - 2);
        let mut reader = bytes.as_slice();
        assert!(matches!(read_message(&mut reader).await, Err(IpcError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_write_message_round_trips_through_duplex() {
        let (mut client, mut server) = tokio::io::duplex(256);
        write_message(&mut client, MessageType::Subscribe, br#"["window"]"#).await.unwrap();

        let message = read_message(&mut server).await.unwrap();
        assert_eq!(message.kind, MessageType::Subscribe.code());
        assert_eq!(message.payload, br#"["window"]"#);
    }
}
