//! Runner configuration, read from YAML.
//!
//! ```yaml
//! port: /dev/ttyUSB1
//! link: lora-emb
//! session:
//!   timeout_ms: 2000
//! radio:
//!   channel: 2
//!   spreading_factor: 7
//!   bandwidth: 0
//!   coding_rate: 1
//! energy_save: 2
//! output_power: 13
//! network_address: 2
//! ```
//!
//! Every field is optional.

use std::path::Path;

use clap::ValueEnum;
use ebi_device::SessionConfig;
use ebi_protocol::{NetworkProtocol, ProtocolError, ProtocolResult, RadioParameters, SleepPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{RunnerError, RunnerResult};

/// Network protocol selection, as written in config files and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Link {
    /// Proprietary link.
    #[default]
    LoraEmb,
    /// LoRaWAN.
    LoraWan,
}

impl From<Link> for NetworkProtocol {
    fn from(link: Link) -> Self {
        match link {
            Link::LoraEmb => NetworkProtocol::LoraEmb,
            Link::LoraWan => NetworkProtocol::LoraWan,
        }
    }
}

/// Radio parameters as raw table codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Channel code.
    pub channel: u8,
    /// Spreading factor code.
    pub spreading_factor: u8,
    /// Bandwidth code.
    pub bandwidth: u8,
    /// Coding rate code.
    pub coding_rate: u8,
}

impl Default for RadioConfig {
    fn default() -> Self {
        let codes = RadioParameters::default().to_bytes();
        RadioConfig {
            channel: codes[0],
            spreading_factor: codes[1],
            bandwidth: codes[2],
            coding_rate: codes[3],
        }
    }
}

impl RadioConfig {
    /// Validated radio parameters.
    pub fn parameters(&self) -> ProtocolResult<RadioParameters> {
        RadioParameters::from_codes(
            self.channel,
            self.spreading_factor,
            self.bandwidth,
            self.coding_rate,
        )
    }
}

/// Configuration for the `ebi` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Serial port path.
    pub port: String,
    /// Session timeouts and baud rate.
    pub session: SessionConfig,
    /// Network protocol used for send/receive.
    pub link: Link,
    /// Radio parameters applied by the setup sequence.
    pub radio: RadioConfig,
    /// Energy save policy code applied by the setup sequence.
    pub energy_save: u8,
    /// Output power applied by the setup sequence, if set.
    pub output_power: Option<i8>,
    /// Network address applied by the setup sequence, if set.
    pub network_address: Option<u16>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            port: "/dev/ttyUSB0".to_string(),
            session: SessionConfig::default(),
            link: Link::default(),
            radio: RadioConfig::default(),
            energy_save: SleepPolicy::AlwaysOn.code(),
            output_power: None,
            network_address: None,
        }
    }
}

impl RunnerConfig {
    /// Load a config file.
    pub fn load(path: &Path) -> RunnerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| RunnerError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| RunnerError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Energy save policy, rejecting codes the policy table does not list.
    pub fn energy_save_policy(&self) -> ProtocolResult<SleepPolicy> {
        SleepPolicy::from_known(self.energy_save).ok_or_else(|| {
            ProtocolError::InvalidParameter(format!(
                "unsupported energy save policy 0x{:02X}",
                self.energy_save
            ))
        })
    }

    /// Network protocol for send/receive.
    pub fn protocol(&self) -> NetworkProtocol {
        self.link.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RunnerConfig::from_yaml("{}").unwrap();
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.protocol(), NetworkProtocol::LoraEmb);
        assert_eq!(config.radio.parameters().unwrap(), RadioParameters::default());
        assert_eq!(config.energy_save_policy().unwrap(), SleepPolicy::AlwaysOn);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
port: /dev/ttyACM0
link: lora-wan
session:
  timeout_ms: 2000
radio:
  channel: 2
energy_save: 2
output_power: -3
network_address: 258
"#;
        let config = RunnerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.link, Link::LoraWan);
        assert_eq!(config.session.timeout_ms, 2000);
        assert_eq!(config.session.reset_timeout_ms, 3000);
        assert_eq!(config.radio.channel, 2);
        assert_eq!(config.radio.spreading_factor, 7);
        assert_eq!(config.energy_save_policy().unwrap(), SleepPolicy::TxOnly);
        assert_eq!(config.output_power, Some(-3));
        assert_eq!(config.network_address, Some(258));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(RunnerConfig::from_yaml("link: zigbee").is_err());
        assert!(RunnerConfig::from_yaml("baud: 9600").is_err());

        let config = RunnerConfig::from_yaml("energy_save: 9\nradio:\n  spreading_factor: 13").unwrap();
        assert!(config.energy_save_policy().is_err());
        assert!(config.radio.parameters().is_err());
    }
}
