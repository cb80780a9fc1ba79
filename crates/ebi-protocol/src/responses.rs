//! Responses and notifications from the radio module.

use crate::commands::Command;
use crate::constants::*;
use crate::error::*;
use crate::tables::*;
use crate::types::*;

/// Responses received from the radio module.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Response {
    /// Status of a "set" or action command.
    Status(Status),

    /// Device identity.
    DeviceInfo(DeviceInfo),

    /// Operating state.
    DeviceState(DeviceState),

    /// Firmware version.
    FirmwareVersion(FirmwareVersion),

    /// Output power in dBm.
    OutputPower(i8),

    /// Operating channel.
    OperatingChannel(LoraChannel),

    /// Energy save policy.
    EnergySave(SleepPolicy),

    /// Network address, raw.
    NetworkAddress(Vec<u8>),

    /// Network identifier, raw.
    NetworkIdentifier(Vec<u8>),

    /// Network preference.
    NetworkPreference(NetworkPreference),

    /// Send data outcome.
    Sent(SendReport),

    /// IEEE address, raw.
    IeeeAddress(Vec<u8>),
}

impl Response {
    /// Check the acknowledgement byte and return the bytes after it.
    pub fn strip_ack<'a>(command: &Command, payload: &'a [u8]) -> ProtocolResult<&'a [u8]> {
        ensure_len(payload, 1)?;
        let expected = command.ack_code();
        if payload[0] != expected {
            return Err(ProtocolError::AckMismatch {
                expected,
                actual: payload[0],
            });
        }
        Ok(&payload[1..])
    }

    /// Decode a full response payload (acknowledgement byte included).
    pub fn decode_payload(command: &Command, payload: &[u8]) -> ProtocolResult<Self> {
        let body = Self::strip_ack(command, payload)?;
        Self::decode(command, body)
    }

    /// Decode the bytes that follow the acknowledgement of `command`.
    pub fn decode(command: &Command, body: &[u8]) -> ProtocolResult<Self> {
        if command.is_set() {
            return decode_status(body).map(Response::Status);
        }

        match command {
            Command::Reset | Command::NetworkStop | Command::NetworkStart => {
                decode_status(body).map(Response::Status)
            }

            Command::DeviceInfo => {
                ensure_len(body, 2)?;
                Ok(Response::DeviceInfo(DeviceInfo {
                    protocol: LinkProtocol::from(body[0]),
                    module: ModuleModel::from(body[1]),
                    uuid: body[2..].to_vec(),
                }))
            }

            Command::DeviceState => {
                ensure_len(body, 1)?;
                Ok(Response::DeviceState(DeviceState::from(body[0])))
            }

            Command::FirmwareVersion => Ok(Response::FirmwareVersion(FirmwareVersion(
                body.to_vec(),
            ))),

            Command::OutputPower { .. } => {
                ensure_len(body, 1)?;
                Ok(Response::OutputPower(body[0] as i8))
            }

            Command::OperatingChannel { .. } => {
                ensure_len(body, 1)?;
                Ok(Response::OperatingChannel(LoraChannel::from(body[0])))
            }

            Command::EnergySave { .. } => {
                ensure_len(body, 1)?;
                Ok(Response::EnergySave(SleepPolicy::from(body[0])))
            }

            Command::NetworkAddress { .. } => Ok(Response::NetworkAddress(body.to_vec())),

            Command::NetworkIdentifier { .. } => Ok(Response::NetworkIdentifier(body.to_vec())),

            Command::NetworkPreference { .. } => {
                ensure_len(body, 1)?;
                Ok(Response::NetworkPreference(NetworkPreference::unpack(
                    body[0],
                )))
            }

            Command::SendData { target, .. } => {
                decode_send_report(body, target.protocol()).map(Response::Sent)
            }

            Command::IeeeAddress { .. } => Ok(Response::IeeeAddress(body.to_vec())),
        }
    }

    /// Status carried by the response, if it is a status response.
    pub fn status(&self) -> Option<Status> {
        match self {
            Response::Status(status) => Some(*status),
            Response::Sent(report) => Some(report.status),
            _ => None,
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Status(status) => write!(f, "status: {}", status),
            Response::DeviceInfo(info) => write!(
                f,
                "protocol: {}, module: {}, uuid: {}",
                info.protocol,
                info.module,
                info.uuid_hex()
            ),
            Response::DeviceState(state) => write!(f, "state: {}", state),
            Response::FirmwareVersion(version) => write!(f, "firmware version: {}", version),
            Response::OutputPower(power) => write!(f, "power: {} dBm", power),
            Response::OperatingChannel(channel) => write!(f, "channel: {}", channel),
            Response::EnergySave(policy) => write!(f, "policy: {}", policy),
            Response::NetworkAddress(address) => write!(f, "address: {}", to_colon_hex(address)),
            Response::NetworkIdentifier(identifier) => {
                write!(f, "identifier: {}", to_colon_hex(identifier))
            }
            Response::NetworkPreference(pref) => write!(
                f,
                "protocol: {}, auto_join: {}, adr: {}",
                pref.protocol, pref.auto_join, pref.adr
            ),
            Response::Sent(report) => {
                write!(
                    f,
                    "status: {}, retries: {}, rssi: {}",
                    report.status, report.retries, report.rssi
                )?;
                if let Some(tx) = &report.lorawan {
                    write!(
                        f,
                        ", tx_channel_mask: 0x{:04X}, tx_datarate_mask: 0x{:02X}, tx_power: {}, waiting_time: {}",
                        tx.channel_mask, tx.datarate_mask, tx.tx_power, tx.waiting_time
                    )?;
                }
                Ok(())
            }
            Response::IeeeAddress(address) => {
                write!(f, "ieee_address: {}", to_colon_hex(address))
            }
        }
    }
}

// ============================================================================
// Unsolicited frames
// ============================================================================

/// Frames the module sends without being asked.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Notification {
    /// State announced after a boot (`0x84`).
    DeviceState(DeviceState),

    /// Packet received from the radio (`0xE0`).
    Received(NetworkPacket),
}

impl Notification {
    /// Decode an unsolicited payload. `protocol` selects the packet body layout.
    pub fn decode(payload: &[u8], protocol: NetworkProtocol) -> ProtocolResult<Self> {
        ensure_len(payload, 1)?;
        match payload[0] {
            NOTIFY_DEVICE_STATE => decode_boot_state(payload).map(Notification::DeviceState),
            NOTIFY_RECEIVED_DATA => decode_received(payload, protocol).map(Notification::Received),
            actual => Err(ProtocolError::UnexpectedOpcode {
                expected: NOTIFY_RECEIVED_DATA,
                actual,
            }),
        }
    }
}

/// Decode the device state notification the module emits after booting.
pub fn decode_boot_state(payload: &[u8]) -> ProtocolResult<DeviceState> {
    expect_code(payload, NOTIFY_DEVICE_STATE)?;
    ensure_len(payload, 2)?;
    Ok(DeviceState::from(payload[1]))
}

/// Decode a received-data notification.
///
/// Layout: code, 2 option bytes, 2 RSSI bytes (signed, big-endian), then
/// source + destination + data on the proprietary link or port + data on
/// LoRaWAN.
pub fn decode_received(payload: &[u8], protocol: NetworkProtocol) -> ProtocolResult<NetworkPacket> {
    expect_code(payload, NOTIFY_RECEIVED_DATA)?;
    ensure_len(payload, 5)?;

    let options = [payload[1], payload[2]];
    let rssi = i16::from_be_bytes([payload[3], payload[4]]);

    let body = match protocol {
        NetworkProtocol::LoraEmb => {
            ensure_len(payload, 9)?;
            PacketBody::LoraEmb {
                source: [payload[5], payload[6]],
                destination: [payload[7], payload[8]],
                data: payload[9..].to_vec(),
            }
        }
        NetworkProtocol::LoraWan => {
            ensure_len(payload, 6)?;
            PacketBody::LoraWan {
                port: payload[5],
                data: payload[6..].to_vec(),
            }
        }
    };

    Ok(NetworkPacket {
        options,
        rssi,
        body,
    })
}

// ============================================================================
// Helper decode functions
// ============================================================================

fn expect_code(payload: &[u8], expected: u8) -> ProtocolResult<()> {
    ensure_len(payload, 1)?;
    if payload[0] != expected {
        return Err(ProtocolError::UnexpectedOpcode {
            expected,
            actual: payload[0],
        });
    }
    Ok(())
}

fn decode_status(body: &[u8]) -> ProtocolResult<Status> {
    ensure_len(body, 1)?;
    let status = Status::from(body[0]);
    if !status.is_known() {
        log::debug!("module returned unlisted status code 0x{:02X}", body[0]);
    }
    Ok(status)
}

fn decode_send_report(body: &[u8], protocol: NetworkProtocol) -> ProtocolResult<SendReport> {
    // status + retries + rssi
    ensure_len(body, 4)?;
    let status = Status::from(body[0]);
    let retries = body[1];
    let rssi = u16::from_be_bytes([body[2], body[3]]);

    let lorawan = if status.is_success() && protocol == NetworkProtocol::LoraWan {
        // channel mask (2) + datarate mask (1) + tx power (1) + waiting time (4)
        ensure_len(body, 12)?;
        Some(LoraWanTxInfo {
            channel_mask: u16::from_be_bytes([body[4], body[5]]),
            datarate_mask: body[6],
            tx_power: body[7],
            waiting_time: u32::from_be_bytes([body[8], body[9], body[10], body[11]]),
        })
    } else {
        None
    };

    Ok(SendReport {
        status,
        retries,
        rssi,
        lorawan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rssi_packet(rssi: [u8; 2]) -> Vec<u8> {
        vec![0xE0, 0x00, 0x00, rssi[0], rssi[1], 0x00, 0x01, 0xFF, 0xFF, b'h', b'i']
    }

    #[test]
    fn test_ack_mismatch_is_reported() {
        let err = Response::decode_payload(&Command::DeviceState, &[0x86, 0x10]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::AckMismatch {
                expected: 0x84,
                actual: 0x86
            }
        );

        let err = Response::decode_payload(&Command::DeviceState, &[0x04, 0x10]).unwrap_err();
        assert!(matches!(err, ProtocolError::AckMismatch { .. }));
    }

    #[test]
    fn test_empty_payload_is_too_short() {
        assert_eq!(
            Response::decode_payload(&Command::Reset, &[]),
            Err(ProtocolError::FrameTooShort {
                expected: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn test_device_info() {
        let payload = [0x81, 0x50, 0x55, 0x00, 0x11, 0x22, 0xAB];
        let response = Response::decode_payload(&Command::DeviceInfo, &payload).unwrap();
        match response {
            Response::DeviceInfo(info) => {
                assert_eq!(info.protocol, LinkProtocol::Lora);
                assert_eq!(info.module, ModuleModel::EmbLr1276S);
                assert_eq!(info.uuid, vec![0x00, 0x11, 0x22, 0xAB]);
                assert_eq!(info.uuid_hex(), "00:11:22:ab");
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_set_responses_decode_status() {
        let cmd = Command::OutputPower { power: Some(13) };
        assert_eq!(
            Response::decode_payload(&cmd, &[0x90, 0x00]).unwrap(),
            Response::Status(Status::Success)
        );
        assert_eq!(
            Response::decode_payload(&cmd, &[0x90, 0x06]).unwrap(),
            Response::Status(Status::Busy)
        );
        // unknown statuses pass through rather than failing
        assert_eq!(
            Response::decode_payload(&cmd, &[0x90, 0x2A]).unwrap(),
            Response::Status(Status::Unknown(0x2A))
        );
    }

    #[test]
    fn test_get_responses() {
        assert_eq!(
            Response::decode_payload(&Command::OutputPower { power: None }, &[0x90, 0xFD]).unwrap(),
            Response::OutputPower(-3)
        );
        assert_eq!(
            Response::decode_payload(&Command::OperatingChannel { params: None }, &[0x91, 0x01])
                .unwrap(),
            Response::OperatingChannel(LoraChannel::Ch868_100)
        );
        assert_eq!(
            Response::decode_payload(&Command::EnergySave { policy: None }, &[0x93, 0x01]).unwrap(),
            Response::EnergySave(SleepPolicy::RxWindow)
        );
        assert_eq!(
            Response::decode_payload(&Command::NetworkAddress { address: None }, &[0xA1, 0x00, 0x02])
                .unwrap(),
            Response::NetworkAddress(vec![0x00, 0x02])
        );
        assert_eq!(
            Response::decode_payload(&Command::FirmwareVersion, &[0x86, 0x01, 0x02, 0x03, 0x04])
                .unwrap()
                .to_string(),
            "firmware version: 01:02:03:04"
        );
        assert_eq!(
            Response::decode_payload(&Command::IeeeAddress { address: None }, &[0xFE, 1, 2, 3, 4, 5, 6, 7, 8])
                .unwrap(),
            Response::IeeeAddress(vec![1, 2, 3, 4, 5, 6, 7, 8])
        );
    }

    #[test]
    fn test_network_preference_get() {
        let response =
            Response::decode_payload(&Command::NetworkPreference { preference: None }, &[0xA5, 0xE0])
                .unwrap();
        assert_eq!(
            response,
            Response::NetworkPreference(NetworkPreference {
                protocol: NetworkProtocol::LoraWan,
                auto_join: true,
                adr: true,
            })
        );
    }

    #[test]
    fn test_send_report_proprietary() {
        let cmd = Command::SendData {
            target: SendTarget::broadcast(),
            payload: vec![1, 2, 3, 4],
        };
        let report = Response::decode_payload(&cmd, &[0xD0, 0x00, 0x02, 0xFF, 0xB0]).unwrap();
        assert_eq!(
            report,
            Response::Sent(SendReport {
                status: Status::Success,
                retries: 2,
                rssi: 0xFFB0,
                lorawan: None,
            })
        );
    }

    #[test]
    fn test_send_report_lorawan_extras() {
        let cmd = Command::SendData {
            target: SendTarget::lora_wan(5).unwrap(),
            payload: vec![1],
        };
        let payload = [
            0xD0, 0x00, 0x01, 0x00, 0x20, 0x00, 0x07, 0x3F, 0x0E, 0x00, 0x00, 0x01, 0x2C,
        ];
        let response = Response::decode_payload(&cmd, &payload).unwrap();
        assert_eq!(
            response.status(),
            Some(Status::Success)
        );
        match response {
            Response::Sent(report) => {
                let tx = report.lorawan.expect("LoRaWAN extras");
                assert_eq!(tx.channel_mask, 0x0007);
                assert_eq!(tx.datarate_mask, 0x3F);
                assert_eq!(tx.tx_power, 0x0E);
                assert_eq!(tx.waiting_time, 300);
            }
            other => panic!("unexpected response: {:?}", other),
        }

        // no extras when the send failed
        let failed = Response::decode_payload(&cmd, &[0xD0, 0x07, 0x00, 0x00, 0x00]).unwrap();
        assert!(matches!(
            failed,
            Response::Sent(SendReport {
                status: Status::CannotSend,
                lorawan: None,
                ..
            })
        ));

        // successful LoRaWAN send missing its extras
        assert!(matches!(
            Response::decode_payload(&cmd, &[0xD0, 0x00, 0x00, 0x00, 0x00]),
            Err(ProtocolError::FrameTooShort { expected: 12, .. })
        ));
    }

    #[test]
    fn test_received_rssi_sign_extension() {
        let cases = [
            ([0xFF, 0xFF], -1),
            ([0x80, 0x00], -32768),
            ([0x7F, 0xFF], 32767),
            ([0x00, 0x00], 0),
        ];
        for (raw, expected) in cases {
            let packet = decode_received(&rssi_packet(raw), NetworkProtocol::LoraEmb).unwrap();
            assert_eq!(packet.rssi, expected);
        }
    }

    #[test]
    fn test_received_proprietary_packet() {
        let packet = decode_received(&rssi_packet([0xFF, 0xC4]), NetworkProtocol::LoraEmb).unwrap();
        assert_eq!(packet.options, [0x00, 0x00]);
        assert_eq!(packet.rssi, -60);
        assert_eq!(
            packet.body,
            PacketBody::LoraEmb {
                source: [0x00, 0x01],
                destination: [0xFF, 0xFF],
                data: b"hi".to_vec(),
            }
        );
        assert_eq!(packet.data(), b"hi");
    }

    #[test]
    fn test_received_lorawan_packet() {
        let payload = [0xE0, 0x01, 0x00, 0xFF, 0x9C, 0x05, 0xCA, 0xFE];
        let packet = decode_received(&payload, NetworkProtocol::LoraWan).unwrap();
        assert_eq!(packet.rssi, -100);
        assert_eq!(
            packet.body,
            PacketBody::LoraWan {
                port: 5,
                data: vec![0xCA, 0xFE],
            }
        );
    }

    #[test]
    fn test_received_requires_data_opcode() {
        assert_eq!(
            decode_received(&[0x84, 0x10], NetworkProtocol::LoraEmb),
            Err(ProtocolError::UnexpectedOpcode {
                expected: 0xE0,
                actual: 0x84
            })
        );
        assert!(matches!(
            decode_received(&[0xE0, 0x00, 0x00, 0x00], NetworkProtocol::LoraEmb),
            Err(ProtocolError::FrameTooShort { .. })
        ));
    }

    #[test]
    fn test_notification_dispatch() {
        assert_eq!(
            Notification::decode(&[0x84, 0x30], NetworkProtocol::LoraEmb).unwrap(),
            Notification::DeviceState(DeviceState::Online)
        );
        assert!(matches!(
            Notification::decode(&rssi_packet([0x00, 0x10]), NetworkProtocol::LoraEmb),
            Ok(Notification::Received(NetworkPacket { rssi: 16, .. }))
        ));
        assert!(matches!(
            Notification::decode(&[0x90, 0x00], NetworkProtocol::LoraEmb),
            Err(ProtocolError::UnexpectedOpcode { actual: 0x90, .. })
        ));
    }

    #[test]
    fn test_boot_state() {
        assert_eq!(decode_boot_state(&[0x84, 0x10]).unwrap(), DeviceState::Ready);
        assert_eq!(
            decode_boot_state(&[0x85, 0x00]),
            Err(ProtocolError::UnexpectedOpcode {
                expected: 0x84,
                actual: 0x85
            })
        );
    }
}
