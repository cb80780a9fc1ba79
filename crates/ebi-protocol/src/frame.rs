//! Frame encoding/decoding utilities.
//!
//! Every EBI message travels in a frame prefixed with a 2-byte length
//! (big-endian) and terminated by a block check character (BCC):
//!
//! ```text
//! +--------+--------+--------+------------------+-----+
//! | len_hi | len_lo | opcode | params / payload | bcc |
//! +--------+--------+--------+------------------+-----+
//! ```
//!
//! `len` counts every byte of the frame, including the length field and the
//! BCC. The BCC is the sum of all preceding bytes modulo 256.

use bytes::BufMut;

use crate::constants::*;
use crate::error::*;

/// Compute the block check character of `data` (sum of bytes modulo 256).
pub fn bcc(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Codec for EBI frames.
///
/// Reading from the byte stream is left to the caller: read the
/// [`LENGTH_FIELD_SIZE`] header bytes, ask [`FrameCodec::declared_len`] how
/// long the frame is, read the remainder, then hand the whole frame to
/// [`FrameCodec::decode`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a payload (opcode + parameters) into a complete frame.
    ///
    /// `payload` must be at most [`MAX_PAYLOAD_LEN`] bytes. Commands enforce
    /// this in [`Command::validate`](crate::Command::validate).
    pub fn encode(payload: &[u8]) -> Vec<u8> {
        let size = payload.len() + LENGTH_FIELD_SIZE + CHECKSUM_SIZE;
        debug_assert!(
            size <= MAX_FRAME_LEN,
            "payload of {} bytes does not fit in a frame",
            payload.len()
        );
        let mut buf = Vec::with_capacity(size);
        buf.put_u16(size as u16);
        buf.extend_from_slice(payload);
        let checksum = bcc(&buf);
        buf.put_u8(checksum);
        buf
    }

    /// Total frame length declared by a length field.
    pub fn declared_len(header: [u8; LENGTH_FIELD_SIZE]) -> ProtocolResult<usize> {
        let len = u16::from_be_bytes(header) as usize;
        if len < MIN_FRAME_LEN {
            return Err(ProtocolError::InvalidLength(len));
        }
        Ok(len)
    }

    /// Validate a complete frame and return its payload.
    ///
    /// The frame must be exactly as long as its length field declares and
    /// its trailing BCC must match.
    pub fn decode(frame: &[u8]) -> ProtocolResult<Vec<u8>> {
        if frame.len() < LENGTH_FIELD_SIZE {
            return Err(ProtocolError::Truncated {
                expected: MIN_FRAME_LEN,
                actual: frame.len(),
            });
        }
        let expected = Self::declared_len([frame[0], frame[1]])?;
        if frame.len() != expected {
            return Err(ProtocolError::Truncated {
                expected,
                actual: frame.len(),
            });
        }

        let (body, tail) = frame.split_at(frame.len() - CHECKSUM_SIZE);
        let computed = bcc(body);
        if computed != tail[0] {
            return Err(ProtocolError::Checksum {
                computed,
                received: tail[0],
            });
        }

        Ok(body[LENGTH_FIELD_SIZE..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_device_info_request() {
        let frame = FrameCodec::encode(&[CMD_DEVICE_INFO]);
        assert_eq!(frame, vec![0x00, 0x04, 0x01, 0x05]);
    }

    #[test]
    fn test_checksum_covers_length_and_payload() {
        let largest = vec![0x5A; MAX_PAYLOAD_LEN];
        let payloads: [&[u8]; 7] = [
            &[],
            &[0x10, 0x0D],
            &[0x50, 0x00, 0x00, 0xFF, 0xFF, 0x01, 0x02, 0x03, 0x04],
            &[0xFF; 252],
            &[0xFF; 253],
            &[0xFF; 300],
            &largest,
        ];
        for payload in payloads {
            let frame = FrameCodec::encode(payload);
            assert_eq!(FrameCodec::decode(&frame).unwrap(), payload);
            let (body, tail) = frame.split_at(frame.len() - 1);
            let sum: u32 = body.iter().map(|b| *b as u32).sum();
            assert_eq!(tail[0], (sum % 256) as u8);
            assert_eq!(
                u16::from_be_bytes([frame[0], frame[1]]) as usize,
                payload.len() + 3
            );
        }
    }

    #[test]
    fn test_decode_recovers_payload() {
        let payload = vec![0x81, 0x50, 0x55, 0xDE, 0xAD, 0xBE, 0xEF];
        let frame = FrameCodec::encode(&payload);
        assert_eq!(FrameCodec::decode(&frame).unwrap(), payload);

        let empty = FrameCodec::encode(&[]);
        assert_eq!(empty, vec![0x00, 0x03, 0x03]);
        assert!(FrameCodec::decode(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_corrupted_byte() {
        let mut frame = FrameCodec::encode(&[0x84, 0x10]);
        frame[3] ^= 0x01;
        assert!(matches!(
            FrameCodec::decode(&frame),
            Err(ProtocolError::Checksum { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_frame() {
        let frame = FrameCodec::encode(&[0x86, 0x01, 0x02, 0x03]);
        let err = FrameCodec::decode(&frame[..frame.len() - 2]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::Truncated {
                expected: 7,
                actual: 5
            }
        );
    }

    #[test]
    fn test_declared_len_minimum() {
        assert_eq!(FrameCodec::declared_len([0x00, 0x03]).unwrap(), 3);
        assert_eq!(FrameCodec::declared_len([0x01, 0x00]).unwrap(), 256);
        assert_eq!(
            FrameCodec::declared_len([0x00, 0x02]),
            Err(ProtocolError::InvalidLength(2))
        );
    }
}
