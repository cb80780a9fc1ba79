//! Scoped read timeout.

use std::io;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tracing::{trace, warn};

use crate::transport::Transport;

/// Applies a read timeout to a transport and restores the previous one on drop.
///
/// The guard derefs to the transport, so reads issued through it run under
/// the temporary timeout. Restoration happens on every exit path, including
/// early returns through `?`.
pub struct TimeoutGuard<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    previous: Option<Duration>,
}

impl<'a, T: Transport + ?Sized> TimeoutGuard<'a, T> {
    /// Save the current timeout and apply `timeout`.
    pub fn new(transport: &'a mut T, timeout: Option<Duration>) -> io::Result<Self> {
        let previous = transport.timeout();
        transport.set_timeout(timeout)?;
        trace!(?previous, ?timeout, "read timeout scoped");
        Ok(TimeoutGuard {
            transport,
            previous,
        })
    }

    /// Timeout that will be restored.
    pub fn previous(&self) -> Option<Duration> {
        self.previous
    }
}

impl<T: Transport + ?Sized> Deref for TimeoutGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.transport
    }
}

impl<T: Transport + ?Sized> DerefMut for TimeoutGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: Transport + ?Sized> Drop for TimeoutGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.set_timeout(self.previous) {
            warn!("failed to restore read timeout {:?}: {}", self.previous, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn test_restores_previous_timeout() {
        let mut mock = MockTransport::new();
        mock.set_timeout(Some(Duration::from_secs(5))).unwrap();

        {
            let guard = TimeoutGuard::new(&mut mock, Some(Duration::from_secs(3))).unwrap();
            assert_eq!(guard.timeout(), Some(Duration::from_secs(3)));
            assert_eq!(guard.previous(), Some(Duration::from_secs(5)));
        }

        assert_eq!(mock.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(
            mock.timeouts_set(),
            &[
                Some(Duration::from_secs(5)),
                Some(Duration::from_secs(3)),
                Some(Duration::from_secs(5)),
            ]
        );
    }

    #[test]
    fn test_restores_after_early_return() {
        fn failing_read(mock: &mut MockTransport) -> io::Result<usize> {
            let mut guard = TimeoutGuard::new(mock, None)?;
            let mut buf = [0u8; 2];
            let n = guard.read_full(&mut buf)?;
            if n < buf.len() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "nothing arrived"));
            }
            Ok(n)
        }

        let mut mock = MockTransport::new();
        mock.set_timeout(Some(Duration::from_millis(250))).unwrap();
        assert!(failing_read(&mut mock).is_err());
        assert_eq!(mock.timeout(), Some(Duration::from_millis(250)));
    }
}
