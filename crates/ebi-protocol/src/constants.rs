//! Protocol constants
//!
//! These constants define the opcodes, notification codes, option headers and
//! size limits used by the EBI serial protocol.

use std::time::Duration;

// ============================================================================
// Opcodes (host → module)
// ============================================================================

/// Query link protocol, module model and UUID.
pub const CMD_DEVICE_INFO: u8 = 0x01;
/// Query the module operating state.
pub const CMD_DEVICE_STATE: u8 = 0x04;
/// Reset the module.
pub const CMD_RESET: u8 = 0x05;
/// Query the firmware version.
pub const CMD_FIRMWARE_VERSION: u8 = 0x06;
/// Get or set the radio output power.
pub const CMD_OUTPUT_POWER: u8 = 0x10;
/// Get or set the operating channel and modulation.
pub const CMD_OPERATING_CHANNEL: u8 = 0x11;
/// Get or set the energy save (sleep) policy.
pub const CMD_ENERGY_SAVE: u8 = 0x13;
/// Get or set the network address.
pub const CMD_NETWORK_ADDRESS: u8 = 0x21;
/// Get or set the network identifier.
pub const CMD_NETWORK_IDENTIFIER: u8 = 0x22;
/// Get or set the network preference (protocol, auto-join, ADR).
pub const CMD_NETWORK_PREFERENCE: u8 = 0x25;
/// Stop (leave) the network.
pub const CMD_NETWORK_STOP: u8 = 0x30;
/// Start (join) the network.
pub const CMD_NETWORK_START: u8 = 0x31;
/// Send a data packet.
pub const CMD_SEND_DATA: u8 = 0x50;
/// Extended command group; the next byte is the sub-opcode.
pub const CMD_EXTENDED: u8 = 0x7E;

/// Extended sub-opcode: get or set the IEEE (EUI-64) address.
pub const EXT_IEEE_ADDRESS: u8 = 0x20;

// ============================================================================
// Acknowledgement and notification codes (module → host)
// ============================================================================

/// Bit set on the echoed opcode of every response.
pub const ACK_FLAG: u8 = 0x80;

/// Unsolicited device state notification, sent once the module has booted.
pub const NOTIFY_DEVICE_STATE: u8 = CMD_DEVICE_STATE | ACK_FLAG;

/// Unsolicited received-data notification.
pub const NOTIFY_RECEIVED_DATA: u8 = 0xE0;

// ============================================================================
// Send options
// ============================================================================

/// Send options for the proprietary (LoRaEMB) link.
pub const SEND_OPTIONS_EMB: [u8; 2] = [0x00, 0x00];
/// Send options for the LoRaWAN link.
pub const SEND_OPTIONS_WAN: [u8; 2] = [0x09, 0x00];
/// Broadcast destination on the proprietary link.
pub const BROADCAST_ADDRESS: [u8; 2] = [0xFF, 0xFF];
/// Lowest application port usable on LoRaWAN.
pub const LORAWAN_PORT_MIN: u8 = 1;
/// Highest application port usable on LoRaWAN.
pub const LORAWAN_PORT_MAX: u8 = 223;

// ============================================================================
// Network preference bits
// ============================================================================

/// Set when the preferred network protocol is LoRaWAN.
pub const PREF_PROTOCOL_LORAWAN: u8 = 0x80;
/// Set when the module joins automatically after boot.
pub const PREF_AUTO_JOIN: u8 = 0x40;
/// Set when adaptive data rate is enabled.
pub const PREF_ADR: u8 = 0x20;

// ============================================================================
// Sizes
// ============================================================================

/// Size of the big-endian length field.
pub const LENGTH_FIELD_SIZE: usize = 2;
/// Size of the trailing checksum.
pub const CHECKSUM_SIZE: usize = 1;
/// Smallest length a frame may declare (length field plus checksum).
pub const MIN_FRAME_LEN: usize = LENGTH_FIELD_SIZE + CHECKSUM_SIZE;
/// Largest length the 16-bit length field can declare.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;
/// Largest payload (opcode plus parameters) that fits in one frame.
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - MIN_FRAME_LEN;
/// Size of an IEEE (EUI-64) address.
pub const IEEE_ADDRESS_SIZE: usize = 8;
/// Allowed lengths of network addresses and identifiers.
pub const NETWORK_ADDRESS_SIZES: [usize; 2] = [2, 4];

// ============================================================================
// Link defaults
// ============================================================================

/// Baud rate used by this module family.
pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// Read timeout applied to ordinary commands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Read timeout for the boot notification that follows a reset.
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(3);
/// Read timeout for the network start response.
pub const DEFAULT_NETWORK_START_TIMEOUT: Duration = Duration::from_secs(3);
