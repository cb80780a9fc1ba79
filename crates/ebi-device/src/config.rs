//! Session configuration.

use std::time::Duration;

use ebi_protocol::{
    DEFAULT_BAUD_RATE, DEFAULT_NETWORK_START_TIMEOUT, DEFAULT_RESET_TIMEOUT, DEFAULT_TIMEOUT,
};
use serde::{Deserialize, Serialize};

/// Configuration for a [`DeviceSession`](crate::DeviceSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Ambient read timeout in milliseconds.
    pub timeout_ms: u64,
    /// Timeout for the boot notification that follows a reset.
    pub reset_timeout_ms: u64,
    /// Timeout applied while joining the network.
    pub network_start_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            reset_timeout_ms: DEFAULT_RESET_TIMEOUT.as_millis() as u64,
            network_start_timeout_ms: DEFAULT_NETWORK_START_TIMEOUT.as_millis() as u64,
        }
    }
}

impl SessionConfig {
    /// Ambient read timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Read timeout for the post-reset boot notification.
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    /// Read timeout for network start.
    pub fn network_start_timeout(&self) -> Duration {
        Duration::from_millis(self.network_start_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.reset_timeout(), Duration::from_secs(3));
        assert_eq!(config.network_start_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{ "timeout_ms": 1500 }"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(1500));
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.reset_timeout_ms, 3000);
    }
}
