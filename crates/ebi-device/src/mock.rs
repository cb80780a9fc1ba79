//! Mock transport for deterministic testing of the session engine.
//!
//! [`MockTransport`] implements [`Transport`] with scripted request/response
//! pairs. Expectations are written in terms of payloads; the mock frames them
//! with [`FrameCodec`], so tests read like the protocol tables rather than
//! like hex dumps.
//!
//! # Example
//!
//! ```
//! use ebi_device::mock::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the device info request is written, answer with protocol LoRa,
//! // module EMB-LR1276S and a 4-byte UUID.
//! mock.expect(&[0x01], &[0x81, 0x50, 0x55, 0xDE, 0xAD, 0xBE, 0xEF]);
//! ```

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use ebi_protocol::FrameCodec;

use crate::transport::Transport;

/// A scripted request and the bytes released once it is written.
#[derive(Debug, Clone)]
struct Expectation {
    /// Exact frame the engine must write.
    request: Vec<u8>,
    /// Bytes made readable after the request is written.
    response: Vec<u8>,
}

/// A mock [`Transport`] for testing without hardware.
///
/// Expectations are consumed in order. Writing a frame that does not match
/// the next expectation, or writing with no expectation left, fails with an
/// I/O error. Reads drain whatever bytes have been released; asking for more
/// than is available returns short, which the engine sees as a timeout.
#[derive(Debug, Default)]
pub struct MockTransport {
    expectations: VecDeque<Expectation>,
    incoming: VecDeque<u8>,
    timeout: Option<Duration>,
    sent_log: Vec<Vec<u8>>,
    timeout_log: Vec<Option<Duration>>,
    discarded: usize,
}

impl MockTransport {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect `request` (a payload) and answer with the framed `response`.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expect_frames(request, &[response]);
    }

    /// Expect `request` and answer with several framed payloads in order.
    pub fn expect_frames(&mut self, request: &[u8], responses: &[&[u8]]) {
        let response = responses
            .iter()
            .flat_map(|payload| FrameCodec::encode(payload))
            .collect();
        self.expect_raw(request, response);
    }

    /// Expect `request` and release nothing, so the following read times out.
    pub fn expect_silence(&mut self, request: &[u8]) {
        self.expect_raw(request, Vec::new());
    }

    /// Expect `request` and release `response` verbatim (for corrupted frames).
    pub fn expect_raw(&mut self, request: &[u8], response: Vec<u8>) {
        self.expectations.push_back(Expectation {
            request: FrameCodec::encode(request),
            response,
        });
    }

    /// Make a framed unsolicited payload readable immediately.
    pub fn push_unsolicited(&mut self, payload: &[u8]) {
        self.push_raw(&FrameCodec::encode(payload));
    }

    /// Make raw bytes readable immediately.
    pub fn push_raw(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes);
    }

    /// Every frame written, in order.
    pub fn sent_frames(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Every timeout applied through [`Transport::set_timeout`], in order.
    pub fn timeouts_set(&self) -> &[Option<Duration>] {
        &self.timeout_log
    }

    /// Number of expectations not yet consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Bytes released but not yet read.
    pub fn pending_input(&self) -> usize {
        self.incoming.len()
    }

    /// Bytes dropped by [`Transport::discard_input`].
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.sent_log.push(data.to_vec());

        let expectation = self
            .expectations
            .pop_front()
            .ok_or_else(|| io::Error::other(format!("unexpected write {:02X?}", data)))?;

        if data != expectation.request.as_slice() {
            return Err(io::Error::other(format!(
                "unexpected write: expected {:02X?}, got {:02X?}",
                expectation.request, data
            )));
        }

        self.incoming.extend(expectation.response);
        Ok(())
    }

    fn read_full(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(self.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.timeout_log.push(timeout);
        self.timeout = timeout;
        Ok(())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.discarded += self.incoming.len();
        self.incoming.clear();
        Ok(())
    }
}
