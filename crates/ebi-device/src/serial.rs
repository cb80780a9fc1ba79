//! Serial port transport built on the `serialport` crate.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use crate::transport::Transport;

/// Upper bound on a single blocking read so an unbounded timeout still polls.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// [`Transport`] over a serial port (8N1, no flow control).
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    timeout: Option<Duration>,
}

impl SerialTransport {
    /// Open `path` at `baud_rate` with an initial read timeout.
    pub fn open(path: &str, baud_rate: u32, timeout: Option<Duration>) -> serialport::Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(POLL_INTERVAL)
            .open()?;
        debug!(path, baud_rate, "opened serial port");
        Ok(Self::from_port(port, timeout))
    }

    /// Wrap an already opened port.
    pub fn from_port(port: Box<dyn SerialPort>, timeout: Option<Duration>) -> Self {
        SerialTransport { port, timeout }
    }

    /// Name of the underlying device, if the platform reports one.
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn read_full(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let mut filled = 0;

        while filled < buf.len() {
            let wait = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    remaining.min(POLL_INTERVAL)
                }
                None => POLL_INTERVAL,
            };
            self.port.set_timeout(wait)?;

            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(filled)
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }
}
