//! Session error types.

use ebi_protocol::{ProtocolError, Response};
use thiserror::Error;

/// Errors that can occur while talking to a module.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The transport failed to read or write.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial port could not be opened or configured.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// A frame or payload was malformed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The read timed out before a response to the command arrived.
    #[error("no response to opcode 0x{opcode:02X}")]
    NoResponse {
        /// Opcode of the unanswered command.
        opcode: u8,
    },

    /// An earlier fault left the byte stream misaligned.
    #[error("session is desynchronized, resync before issuing commands")]
    Desynchronized,

    /// The response decoded to a shape the operation does not return.
    #[error("unexpected response: {0:?}")]
    UnexpectedResponse(Box<Response>),
}

impl DeviceError {
    /// Short, stable name of the fault, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceError::Io(_) => "io",
            DeviceError::Serial(_) => "serial",
            DeviceError::Protocol(e) => e.kind(),
            DeviceError::NoResponse { .. } => "no_response",
            DeviceError::Desynchronized => "desynchronized",
            DeviceError::UnexpectedResponse(_) => "unexpected_response",
        }
    }

    /// Whether this fault leaves the byte stream misaligned.
    ///
    /// A bad length field or a short frame leaves the rest of that frame
    /// unread, so the next read would start mid-frame.
    pub fn is_desync(&self) -> bool {
        matches!(
            self,
            DeviceError::Protocol(
                ProtocolError::AckMismatch { .. }
                    | ProtocolError::InvalidLength(_)
                    | ProtocolError::Truncated { .. }
            )
        )
    }
}

/// Result type alias for session operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
