//! Common types used in the protocol.

use crate::constants::*;
use crate::error::*;
use crate::tables::*;

/// Network protocol run on top of the LoRa radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum NetworkProtocol {
    /// Proprietary point-to-point / broadcast link ("LoRaEMB").
    #[default]
    LoraEmb,
    /// LoRaWAN.
    LoraWan,
}

impl std::fmt::Display for NetworkProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkProtocol::LoraEmb => write!(f, "LoRaEMB"),
            NetworkProtocol::LoraWan => write!(f, "LoRaWAN"),
        }
    }
}

/// Channel and modulation parameters for the LoRa radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RadioParameters {
    /// Operating channel.
    pub channel: LoraChannel,
    /// Spreading factor.
    pub spreading_factor: SpreadingFactor,
    /// Channel bandwidth.
    pub bandwidth: Bandwidth,
    /// Coding rate.
    pub coding_rate: CodingRate,
}

impl Default for RadioParameters {
    fn default() -> Self {
        RadioParameters {
            channel: LoraChannel::Ch868_100,
            spreading_factor: SpreadingFactor::Sf7,
            bandwidth: Bandwidth::Khz125,
            coding_rate: CodingRate::Cr4_5,
        }
    }
}

impl RadioParameters {
    /// Build parameters from raw codes, rejecting any code absent from its table.
    pub fn from_codes(
        channel: u8,
        spreading_factor: u8,
        bandwidth: u8,
        coding_rate: u8,
    ) -> ProtocolResult<Self> {
        let params = RadioParameters {
            channel: LoraChannel::from(channel),
            spreading_factor: SpreadingFactor::from(spreading_factor),
            bandwidth: Bandwidth::from(bandwidth),
            coding_rate: CodingRate::from(coding_rate),
        };
        params.validate()?;
        Ok(params)
    }

    /// Check that every field holds a code listed in its table.
    pub fn validate(&self) -> ProtocolResult<()> {
        let invalid = if !self.channel.is_known() {
            Some(("channel", self.channel.code()))
        } else if !self.spreading_factor.is_known() {
            Some(("spreading factor", self.spreading_factor.code()))
        } else if !self.bandwidth.is_known() {
            Some(("bandwidth", self.bandwidth.code()))
        } else if !self.coding_rate.is_known() {
            Some(("coding rate", self.coding_rate.code()))
        } else {
            None
        };
        match invalid {
            Some((name, code)) => Err(ProtocolError::InvalidParameter(format!(
                "unsupported {} code 0x{:02X}",
                name, code
            ))),
            None => Ok(()),
        }
    }

    /// Wire representation: channel, SF, bandwidth, coding rate.
    pub fn to_bytes(&self) -> [u8; 4] {
        [
            self.channel.code(),
            self.spreading_factor.code(),
            self.bandwidth.code(),
            self.coding_rate.code(),
        ]
    }
}

/// Network preference flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NetworkPreference {
    /// Preferred network protocol.
    pub protocol: NetworkProtocol,
    /// Join the network automatically after boot.
    pub auto_join: bool,
    /// Adaptive data rate.
    pub adr: bool,
}

impl NetworkPreference {
    /// Pack into the single preference byte.
    pub fn pack(&self) -> u8 {
        let mut byte = 0;
        if self.protocol == NetworkProtocol::LoraWan {
            byte |= PREF_PROTOCOL_LORAWAN;
        }
        if self.auto_join {
            byte |= PREF_AUTO_JOIN;
        }
        if self.adr {
            byte |= PREF_ADR;
        }
        byte
    }

    /// Unpack the preference byte; unused low bits are ignored.
    pub fn unpack(byte: u8) -> Self {
        NetworkPreference {
            protocol: if byte & PREF_PROTOCOL_LORAWAN != 0 {
                NetworkProtocol::LoraWan
            } else {
                NetworkProtocol::LoraEmb
            },
            auto_join: byte & PREF_AUTO_JOIN != 0,
            adr: byte & PREF_ADR != 0,
        }
    }
}

/// Where a data packet is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTarget {
    /// Proprietary link, addressed to a 16-bit destination.
    LoraEmb {
        /// Destination address (`FF:FF` is broadcast).
        destination: [u8; 2],
    },
    /// LoRaWAN uplink on an application port.
    LoraWan {
        /// Application port, 1 to 223.
        port: u8,
    },
}

impl SendTarget {
    /// Broadcast on the proprietary link.
    pub fn broadcast() -> Self {
        SendTarget::LoraEmb {
            destination: BROADCAST_ADDRESS,
        }
    }

    /// Proprietary link target; `None` means broadcast.
    pub fn lora_emb(destination: Option<[u8; 2]>) -> Self {
        SendTarget::LoraEmb {
            destination: destination.unwrap_or(BROADCAST_ADDRESS),
        }
    }

    /// LoRaWAN target, rejecting ports outside 1..=223.
    pub fn lora_wan(port: u8) -> ProtocolResult<Self> {
        let target = SendTarget::LoraWan { port };
        target.validate()?;
        Ok(target)
    }

    /// Network protocol this target belongs to.
    pub fn protocol(&self) -> NetworkProtocol {
        match self {
            SendTarget::LoraEmb { .. } => NetworkProtocol::LoraEmb,
            SendTarget::LoraWan { .. } => NetworkProtocol::LoraWan,
        }
    }

    /// Check the LoRaWAN port range.
    pub fn validate(&self) -> ProtocolResult<()> {
        match self {
            SendTarget::LoraWan { port } if !(LORAWAN_PORT_MIN..=LORAWAN_PORT_MAX).contains(port) => {
                Err(ProtocolError::InvalidParameter(format!(
                    "LoRaWAN port {} outside {}..={}",
                    port, LORAWAN_PORT_MIN, LORAWAN_PORT_MAX
                )))
            }
            _ => Ok(()),
        }
    }

    /// Options and addressing header that precedes the payload.
    pub fn header(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(4);
        match self {
            SendTarget::LoraEmb { destination } => {
                header.extend_from_slice(&SEND_OPTIONS_EMB);
                header.extend_from_slice(destination);
            }
            SendTarget::LoraWan { port } => {
                header.extend_from_slice(&SEND_OPTIONS_WAN);
                header.push(*port);
            }
        }
        header
    }
}

/// Identity returned by the device info command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeviceInfo {
    /// Link protocol implemented by the firmware.
    pub protocol: LinkProtocol,
    /// Module model.
    pub module: ModuleModel,
    /// Module UUID.
    pub uuid: Vec<u8>,
}

impl DeviceInfo {
    /// UUID as colon-separated hex.
    pub fn uuid_hex(&self) -> String {
        to_colon_hex(&self.uuid)
    }
}

/// Firmware version bytes as reported by the module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FirmwareVersion(pub Vec<u8>);

impl FirmwareVersion {
    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&to_colon_hex(&self.0))
    }
}

/// Extra transmit details reported after a successful LoRaWAN uplink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LoraWanTxInfo {
    /// Channels used for the uplink.
    pub channel_mask: u16,
    /// Data rates used for the uplink.
    pub datarate_mask: u8,
    /// Transmit power.
    pub tx_power: u8,
    /// Time to wait before the next uplink is allowed.
    pub waiting_time: u32,
}

/// Outcome of a send data command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SendReport {
    /// Send status.
    pub status: Status,
    /// Number of retransmissions.
    pub retries: u8,
    /// RSSI of the acknowledgement, as transmitted (unsigned).
    pub rssi: u16,
    /// Present for successful LoRaWAN sends only.
    pub lorawan: Option<LoraWanTxInfo>,
}

/// Link-dependent part of a received packet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PacketBody {
    /// Packet received on the proprietary link.
    LoraEmb {
        /// Source address.
        source: [u8; 2],
        /// Destination address.
        destination: [u8; 2],
        /// Application data.
        data: Vec<u8>,
    },
    /// Downlink received on LoRaWAN.
    LoraWan {
        /// Application port.
        port: u8,
        /// Application data.
        data: Vec<u8>,
    },
}

/// A packet received from the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NetworkPacket {
    /// Receive options, raw.
    pub options: [u8; 2],
    /// Signal strength.
    pub rssi: i16,
    /// Addressing and data.
    pub body: PacketBody,
}

impl NetworkPacket {
    /// Application data carried by the packet.
    pub fn data(&self) -> &[u8] {
        match &self.body {
            PacketBody::LoraEmb { data, .. } | PacketBody::LoraWan { data, .. } => data,
        }
    }
}

impl std::fmt::Display for NetworkPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "options: {}, rssi: {}, ",
            to_colon_hex(&self.options),
            self.rssi
        )?;
        match &self.body {
            PacketBody::LoraEmb {
                source,
                destination,
                data,
            } => write!(
                f,
                "src: {}, dst: {}, data: {}",
                to_colon_hex(source),
                to_colon_hex(destination),
                to_colon_hex(data)
            ),
            PacketBody::LoraWan { port, data } => {
                write!(f, "port: {}, data: {}", port, to_colon_hex(data))
            }
        }
    }
}

/// Result of a reset: the command status and the state announced after boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResetReport {
    /// Status of the reset command.
    pub status: Status,
    /// State carried by the boot notification.
    pub boot_state: DeviceState,
}

/// Format bytes as colon-separated lowercase hex (`01:02:ab`).
pub fn to_colon_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radio_parameters_from_codes() {
        let params = RadioParameters::from_codes(1, 7, 0, 1).unwrap();
        assert_eq!(params, RadioParameters::default());
        assert_eq!(params.to_bytes(), [0x01, 0x07, 0x00, 0x01]);

        assert!(RadioParameters::from_codes(5, 7, 0, 1).is_err());
        assert!(RadioParameters::from_codes(1, 13, 0, 1).is_err());
        assert!(RadioParameters::from_codes(1, 7, 2, 1).is_err());
        let err = RadioParameters::from_codes(1, 7, 0, 0).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidParameter(msg) if msg.contains("coding rate")));
    }

    #[test]
    fn test_network_preference_packing() {
        let pref = NetworkPreference {
            protocol: NetworkProtocol::LoraWan,
            auto_join: true,
            adr: false,
        };
        assert_eq!(pref.pack(), 0xC0);
        assert_eq!(NetworkPreference::unpack(0xC0), pref);
        assert_eq!(
            NetworkPreference::unpack(0x3F),
            NetworkPreference {
                protocol: NetworkProtocol::LoraEmb,
                auto_join: false,
                adr: true,
            }
        );
    }

    #[test]
    fn test_send_target_headers() {
        assert_eq!(SendTarget::lora_emb(None).header(), vec![0x00, 0x00, 0xFF, 0xFF]);
        assert_eq!(
            SendTarget::lora_emb(Some([0x00, 0x02])).header(),
            vec![0x00, 0x00, 0x00, 0x02]
        );
        assert_eq!(SendTarget::lora_wan(5).unwrap().header(), vec![0x09, 0x00, 0x05]);
    }

    #[test]
    fn test_lorawan_port_range() {
        assert!(SendTarget::lora_wan(1).is_ok());
        assert!(SendTarget::lora_wan(223).is_ok());
        assert!(SendTarget::lora_wan(0).is_err());
        assert!(SendTarget::lora_wan(224).is_err());
    }

    #[test]
    fn test_colon_hex() {
        assert_eq!(to_colon_hex(&[0x00, 0x1A, 0xFF]), "00:1a:ff");
        assert_eq!(to_colon_hex(&[]), "");
    }
}
