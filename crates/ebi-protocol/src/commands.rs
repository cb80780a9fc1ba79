//! Commands that can be sent to the radio module.
//!
//! Get/set pairs share an opcode: a command carrying parameters is a "set",
//! one without is a "get". Parameters that the module would not accept are
//! dropped by [`Command::encode`], which turns the request into a "get";
//! callers that want a hard failure instead run [`Command::validate`] first.

use crate::constants::*;
use crate::error::*;
use crate::tables::*;
use crate::types::*;

/// Commands that can be sent to the radio module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Query link protocol, module model and UUID.
    DeviceInfo,

    /// Query the operating state.
    DeviceState,

    /// Reset the module.
    Reset,

    /// Query the firmware version.
    FirmwareVersion,

    /// Get or set the output power.
    OutputPower {
        /// Power in dBm (None = get).
        power: Option<i8>,
    },

    /// Get or set channel and modulation.
    OperatingChannel {
        /// Parameters to apply (None = get).
        params: Option<RadioParameters>,
    },

    /// Get or set the energy save policy.
    EnergySave {
        /// Policy to apply (None = get).
        policy: Option<SleepPolicy>,
    },

    /// Get or set the network address.
    NetworkAddress {
        /// 2 or 4 byte address (None = get).
        address: Option<Vec<u8>>,
    },

    /// Get or set the network identifier.
    NetworkIdentifier {
        /// 2 or 4 byte identifier (None = get).
        identifier: Option<Vec<u8>>,
    },

    /// Get or set the network preference.
    NetworkPreference {
        /// Preference to apply (None = get).
        preference: Option<NetworkPreference>,
    },

    /// Leave the network.
    NetworkStop,

    /// Join the network.
    NetworkStart,

    /// Send a data packet.
    SendData {
        /// Destination address or LoRaWAN port.
        target: SendTarget,
        /// Application data.
        payload: Vec<u8>,
    },

    /// Get or set the IEEE address.
    IeeeAddress {
        /// EUI-64 address (None = get).
        address: Option<[u8; IEEE_ADDRESS_SIZE]>,
    },
}

impl Command {
    /// Get the opcode for this command.
    ///
    /// For extended commands this is [`CMD_EXTENDED`]; the response is
    /// acknowledged against it.
    pub fn code(&self) -> u8 {
        self.opcode_bytes()[0]
    }

    /// Opcode plus extended sub-opcode, when there is one.
    pub fn opcode_bytes(&self) -> &'static [u8] {
        match self {
            Command::DeviceInfo => &[CMD_DEVICE_INFO],
            Command::DeviceState => &[CMD_DEVICE_STATE],
            Command::Reset => &[CMD_RESET],
            Command::FirmwareVersion => &[CMD_FIRMWARE_VERSION],
            Command::OutputPower { .. } => &[CMD_OUTPUT_POWER],
            Command::OperatingChannel { .. } => &[CMD_OPERATING_CHANNEL],
            Command::EnergySave { .. } => &[CMD_ENERGY_SAVE],
            Command::NetworkAddress { .. } => &[CMD_NETWORK_ADDRESS],
            Command::NetworkIdentifier { .. } => &[CMD_NETWORK_IDENTIFIER],
            Command::NetworkPreference { .. } => &[CMD_NETWORK_PREFERENCE],
            Command::NetworkStop => &[CMD_NETWORK_STOP],
            Command::NetworkStart => &[CMD_NETWORK_START],
            Command::SendData { .. } => &[CMD_SEND_DATA],
            Command::IeeeAddress { .. } => &[CMD_EXTENDED, EXT_IEEE_ADDRESS],
        }
    }

    /// Acknowledgement byte the response must start with.
    pub fn ack_code(&self) -> u8 {
        self.code() | ACK_FLAG
    }

    /// Parameter bytes that follow the opcode.
    pub fn parameters(&self) -> Vec<u8> {
        match self {
            Command::DeviceInfo
            | Command::DeviceState
            | Command::Reset
            | Command::FirmwareVersion
            | Command::NetworkStop
            | Command::NetworkStart => Vec::new(),

            Command::OutputPower { power } => power.map(|p| vec![p as u8]).unwrap_or_default(),

            Command::OperatingChannel { params } => params
                .filter(|p| p.validate().is_ok())
                .map(|p| p.to_bytes().to_vec())
                .unwrap_or_default(),

            Command::EnergySave { policy } => policy
                .filter(|p| p.is_known())
                .map(|p| vec![p.code()])
                .unwrap_or_default(),

            Command::NetworkAddress { address: value }
            | Command::NetworkIdentifier { identifier: value } => value
                .as_ref()
                .filter(|v| NETWORK_ADDRESS_SIZES.contains(&v.len()))
                .cloned()
                .unwrap_or_default(),

            Command::NetworkPreference { preference } => {
                preference.map(|p| vec![p.pack()]).unwrap_or_default()
            }

            Command::SendData { target, payload } => {
                let mut params = target.header();
                params.extend_from_slice(payload);
                params
            }

            Command::IeeeAddress { address } => {
                address.map(|a| a.to_vec()).unwrap_or_default()
            }
        }
    }

    /// Whether this is the "set" form of a get/set command.
    pub fn is_set(&self) -> bool {
        match self {
            Command::SendData { .. } => false,
            _ => !self.parameters().is_empty(),
        }
    }

    /// Reject arguments that [`Command::encode`] would silently drop.
    pub fn validate(&self) -> ProtocolResult<()> {
        match self {
            Command::OperatingChannel { params: Some(params) } => params.validate(),

            Command::EnergySave { policy: Some(policy) } if !policy.is_known() => {
                Err(ProtocolError::InvalidParameter(format!(
                    "unsupported energy save policy 0x{:02X}",
                    policy.code()
                )))
            }

            Command::NetworkAddress { address: Some(value) }
            | Command::NetworkIdentifier { identifier: Some(value) }
                if !NETWORK_ADDRESS_SIZES.contains(&value.len()) =>
            {
                Err(ProtocolError::InvalidParameter(format!(
                    "network address must be 2 or 4 bytes, got {}",
                    value.len()
                )))
            }

            Command::SendData { target, payload } => {
                target.validate()?;
                let len = self.opcode_bytes().len() + target.header().len() + payload.len();
                if len > MAX_PAYLOAD_LEN {
                    return Err(ProtocolError::InvalidParameter(format!(
                        "send data needs {} bytes, a frame holds at most {}",
                        len, MAX_PAYLOAD_LEN
                    )));
                }
                Ok(())
            }

            _ => Ok(()),
        }
    }

    /// Encode the command to bytes (opcode followed by parameters).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = self.opcode_bytes().to_vec();
        buf.extend_from_slice(&self.parameters());
        buf
    }
}
