//! Multi-step sequences and argument parsing for the `ebi` tool.

use ebi_device::{DeviceResult, DeviceSession, Transport};
use ebi_protocol::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::error::{RunnerError, RunnerResult};

// ============================================================================
// Output Types
// ============================================================================

/// Raw bytes shown as colon hex and serialized as a plain hex string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl std::fmt::Display for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&to_colon_hex(&self.0))
    }
}

impl Serialize for Bytes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

/// One step of the setup sequence and the status the module returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetupStep {
    /// What was done.
    pub step: &'static str,
    /// Module status.
    pub status: Status,
}

impl std::fmt::Display for SetupStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.step, self.status)
    }
}

// ============================================================================
// Sequences
// ============================================================================

/// Run `operation` with the network stopped if the module reports itself
/// online, then start the network again.
///
/// The network is restarted even when `operation` fails; the operation's
/// error wins over a restart error.
pub fn with_network_paused<T, R>(
    session: &mut DeviceSession<T>,
    operation: impl FnOnce(&mut DeviceSession<T>) -> DeviceResult<R>,
) -> DeviceResult<R>
where
    T: Transport,
{
    let online = session.device_state()?.is_online();
    if !online {
        return operation(session);
    }

    debug!("pausing network");
    let stopped = session.network_stop()?;
    if !stopped.is_success() {
        warn!(status = %stopped, "network stop declined");
    }

    let result = operation(session);

    let started = session.network_start();
    match (&result, started) {
        (_, Ok(status)) if !status.is_success() => {
            warn!(%status, "network restart declined");
        }
        (Ok(_), Err(e)) => return Err(e),
        (Err(_), Err(e)) => warn!("network restart failed: {}", e),
        _ => {}
    }
    result
}

/// Bring the module into a known configuration.
///
/// Resets the module, stops the network if it came back online, applies the
/// energy save policy, output power, radio parameters and network address
/// from `config`, then starts the network. Declined steps are logged and
/// reported, not treated as errors.
pub fn setup<T: Transport>(
    session: &mut DeviceSession<T>,
    config: &RunnerConfig,
) -> RunnerResult<Vec<SetupStep>> {
    // reject bad config before touching the module
    let policy = config.energy_save_policy()?;
    let params = config.radio.parameters()?;

    let mut steps = Vec::new();
    let mut record = |step: &'static str, status: Status| {
        if status.is_success() {
            debug!(step, "setup step done");
        } else {
            warn!(step, %status, "setup step declined");
        }
        steps.push(SetupStep { step, status });
    };

    let report = session.reset()?;
    record("reset", report.status);

    if session.state().operational_state.is_online() {
        record("network stop", session.network_stop()?);
    }

    record("energy save", session.set_energy_save(policy)?);

    if let Some(power) = config.output_power {
        record("output power", session.set_output_power(power)?);
    }

    record("operating channel", session.set_operating_channel(params)?);

    if let Some(address) = config.network_address {
        record(
            "network address",
            session.set_network_address(&address.to_be_bytes())?,
        );
    }

    record("network start", session.network_start()?);

    info!(
        state = %session.state().operational_state,
        "setup complete"
    );
    Ok(steps)
}

// ============================================================================
// Argument Parsing
// ============================================================================

/// Parse a decimal 16-bit address into its big-endian bytes (`258` → `01:02`).
pub fn parse_address(text: &str) -> RunnerResult<[u8; 2]> {
    text.trim()
        .parse::<u16>()
        .map(u16::to_be_bytes)
        .map_err(|e| RunnerError::InvalidArgument(format!("address {:?}: {}", text, e)))
}

/// Parse a send payload, either as UTF-8 text or, with `as_hex`, as hex digits.
///
/// Hex input may contain `:` separators and an optional `0x` prefix.
pub fn parse_payload(text: &str, as_hex: bool) -> RunnerResult<Vec<u8>> {
    if !as_hex {
        return Ok(text.as_bytes().to_vec());
    }
    let digits: String = text
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| *c != ':')
        .collect();
    hex::decode(&digits).map_err(|e| RunnerError::InvalidArgument(format!("hex payload {:?}: {}", text, e)))
}

/// Parse an 8-byte IEEE address from hex.
pub fn parse_ieee(text: &str) -> RunnerResult<[u8; IEEE_ADDRESS_SIZE]> {
    let bytes = parse_payload(text, true)?;
    <[u8; IEEE_ADDRESS_SIZE]>::try_from(bytes.as_slice()).map_err(|_| {
        RunnerError::InvalidArgument(format!(
            "IEEE address must be {} bytes, got {}",
            IEEE_ADDRESS_SIZE,
            bytes.len()
        ))
    })
}

/// Build a send target from the link and the optional destination or port.
pub fn send_target(
    protocol: NetworkProtocol,
    destination: Option<u16>,
    port: Option<u8>,
) -> RunnerResult<SendTarget> {
    match protocol {
        NetworkProtocol::LoraEmb => {
            if port.is_some() {
                return Err(RunnerError::InvalidArgument(
                    "--port applies to LoRaWAN only".to_string(),
                ));
            }
            Ok(SendTarget::lora_emb(destination.map(u16::to_be_bytes)))
        }
        NetworkProtocol::LoraWan => {
            if destination.is_some() {
                return Err(RunnerError::InvalidArgument(
                    "--dest applies to the proprietary link only".to_string(),
                ));
            }
            let port = port.ok_or_else(|| {
                RunnerError::InvalidArgument("LoRaWAN sends need --port".to_string())
            })?;
            Ok(SendTarget::lora_wan(port)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("258").unwrap(), [0x01, 0x02]);
        assert_eq!(parse_address("2").unwrap(), [0x00, 0x02]);
        assert_eq!(parse_address("65535").unwrap(), [0xFF, 0xFF]);
        assert!(parse_address("65536").is_err());
        assert!(parse_address("-1").is_err());
        assert!(parse_address("abc").is_err());
    }

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload("hi", false).unwrap(), b"hi".to_vec());
        assert_eq!(parse_payload("0102ff", true).unwrap(), vec![0x01, 0x02, 0xFF]);
        assert_eq!(parse_payload("01:02:ff", true).unwrap(), vec![0x01, 0x02, 0xFF]);
        assert_eq!(parse_payload("0xABCD", true).unwrap(), vec![0xAB, 0xCD]);
        assert!(parse_payload("abc", true).is_err());
        assert!(parse_payload("zz", true).is_err());
    }

    #[test]
    fn test_parse_ieee() {
        assert_eq!(
            parse_ieee("00:11:22:33:44:55:66:77").unwrap(),
            [0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]
        );
        assert!(parse_ieee("0011").is_err());
    }

    #[test]
    fn test_send_target() {
        assert_eq!(
            send_target(NetworkProtocol::LoraEmb, None, None).unwrap(),
            SendTarget::broadcast()
        );
        assert_eq!(
            send_target(NetworkProtocol::LoraEmb, Some(2), None).unwrap(),
            SendTarget::LoraEmb {
                destination: [0x00, 0x02]
            }
        );
        assert_eq!(
            send_target(NetworkProtocol::LoraWan, None, Some(5)).unwrap(),
            SendTarget::LoraWan { port: 5 }
        );
        assert!(send_target(NetworkProtocol::LoraWan, None, None).is_err());
        assert!(send_target(NetworkProtocol::LoraWan, None, Some(0)).is_err());
        assert!(send_target(NetworkProtocol::LoraWan, Some(2), Some(5)).is_err());
        assert!(send_target(NetworkProtocol::LoraEmb, None, Some(5)).is_err());
    }

    #[test]
    fn test_bytes_output() {
        let bytes = Bytes(vec![0x00, 0x1A]);
        assert_eq!(bytes.to_string(), "00:1a");
        assert_eq!(serde_json::to_string(&bytes).unwrap(), "\"001a\"");
    }
}
