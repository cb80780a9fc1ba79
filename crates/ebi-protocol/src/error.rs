//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when framing, encoding or decoding EBI messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The length field declares a frame smaller than the minimum.
    #[error("invalid frame length: {0} (minimum 3)")]
    InvalidLength(usize),

    /// Fewer bytes arrived than the length field declared.
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Length declared by the frame header.
        expected: usize,
        /// Bytes actually received.
        actual: usize,
    },

    /// The trailing checksum does not match the frame contents.
    #[error("checksum mismatch: computed 0x{computed:02X}, frame carries 0x{received:02X}")]
    Checksum {
        /// Checksum computed over the received bytes.
        computed: u8,
        /// Checksum byte found at the end of the frame.
        received: u8,
    },

    /// The response does not acknowledge the opcode that was sent.
    #[error("acknowledgement mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    AckMismatch {
        /// `request_opcode | 0x80`.
        expected: u8,
        /// First byte of the response.
        actual: u8,
    },

    /// An unsolicited frame carried a different code than the one awaited.
    #[error("unexpected opcode: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedOpcode {
        /// Code that was awaited.
        expected: u8,
        /// Code that arrived.
        actual: u8,
    },

    /// Payload is too short for the shape of the response.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// A request argument was rejected before encoding.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ProtocolError {
    /// Short, stable name of the fault, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::InvalidLength(_) => "invalid_length",
            ProtocolError::Truncated { .. } => "truncated",
            ProtocolError::Checksum { .. } => "checksum",
            ProtocolError::AckMismatch { .. } => "ack_mismatch",
            ProtocolError::UnexpectedOpcode { .. } => "unexpected_opcode",
            ProtocolError::FrameTooShort { .. } => "frame_too_short",
            ProtocolError::InvalidParameter(_) => "invalid_parameter",
        }
    }
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Fail with [`ProtocolError::FrameTooShort`] unless `data` holds at least `expected` bytes.
pub(crate) fn ensure_len(data: &[u8], expected: usize) -> ProtocolResult<()> {
    if data.len() < expected {
        return Err(ProtocolError::FrameTooShort {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}
