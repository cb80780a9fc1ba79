//! Byte-stream transport abstraction.

use std::io;
use std::time::Duration;

/// A duplex byte channel with a mutable read timeout.
///
/// The session never assumes anything about the medium beyond this trait;
/// [`SerialTransport`](crate::SerialTransport) drives a real port and
/// [`MockTransport`](crate::mock::MockTransport) replays scripted frames.
pub trait Transport {
    /// Write every byte of `data`.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Fill `buf`, blocking until it is full or the read timeout expires.
    ///
    /// Returns the number of bytes read, which is less than `buf.len()` only
    /// on timeout or end of stream.
    fn read_full(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Current read timeout; `None` blocks forever.
    fn timeout(&self) -> Option<Duration>;

    /// Replace the read timeout.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Drop any bytes already received but not yet read.
    fn discard_input(&mut self) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }

    fn read_full(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_full(buf)
    }

    fn timeout(&self) -> Option<Duration> {
        (**self).timeout()
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_timeout(timeout)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }
}
