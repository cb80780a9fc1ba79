//! Lookup tables for the small integer codes carried in EBI payloads.
//!
//! Every table is an enum with one variant per documented code and an
//! `Unknown(u8)` fallback, so a code the table does not list still decodes and
//! the raw value stays retrievable through [`code`](Status::code).

/// Declares a code table enum with `From<u8>`, `From<Enum> for u8`, labels and
/// `Display`.
macro_rules! code_table {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize))]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// Code absent from the table.
            Unknown(u8),
        }

        impl $name {
            /// Every code listed in the table.
            pub const KNOWN: &'static [$name] = &[$($name::$variant),+];

            /// Raw wire code.
            pub const fn code(self) -> u8 {
                match self {
                    $( $name::$variant => $code, )+
                    $name::Unknown(code) => code,
                }
            }

            /// Label from the table, `None` for an unknown code.
            pub const fn label(self) -> Option<&'static str> {
                match self {
                    $( $name::$variant => Some($label), )+
                    $name::Unknown(_) => None,
                }
            }

            /// Whether the code appears in the table.
            pub const fn is_known(self) -> bool {
                !matches!(self, $name::Unknown(_))
            }

            /// Look a code up, rejecting codes the table does not list.
            pub fn from_known(code: u8) -> Option<Self> {
                Some(Self::from(code)).filter(|value| value.is_known())
            }
        }

        impl From<u8> for $name {
            fn from(code: u8) -> Self {
                match code {
                    $( $code => $name::$variant, )+
                    _ => $name::Unknown(code),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                value.code()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.label() {
                    Some(label) => f.write_str(label),
                    None => write!(f, "Unknown (0x{:02X})", self.code()),
                }
            }
        }
    };
}

code_table! {
    /// Status byte returned by "set" style commands.
    pub enum Status {
        Success = 0x00 => "Success",
        GenericError = 0x01 => "Generic error",
        ParametersNotAccepted = 0x02 => "Parameters not accepted",
        OperationTimeout = 0x03 => "Operation timeout",
        NoMemory = 0x04 => "No memory",
        Unsupported = 0x05 => "Unsupported",
        Busy = 0x06 => "Busy",
        CannotSend = 0x07 => "Cannot send",
    }
}

impl Status {
    /// Whether the module accepted the request.
    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

code_table! {
    /// Link protocol implemented by the module firmware.
    ///
    /// Code `0x00` ("unknown protocol") decodes to `Unknown(0x00)`.
    pub enum LinkProtocol {
        Proprietary = 0x01 => "Proprietary",
        Ieee802154 = 0x10 => "802.15.4",
        Zigbee = 0x20 => "Zigbee",
        Zigbee2004 = 0x21 => "Zigbee 2004 (1.0)",
        Zigbee2006 = 0x22 => "Zigbee 2006",
        Zigbee2007 = 0x23 => "Zigbee 2007",
        Zigbee2007Pro = 0x24 => "Zigbee 2007-Pro",
        WirelessMBus = 0x40 => "Wireless M-Bus",
        Lora = 0x50 => "LoRa",
    }
}

code_table! {
    /// Hardware module model.
    ///
    /// Code `0x00` ("unknown module") decodes to `Unknown(0x00)`.
    pub enum ModuleModel {
        Reserved = 0x10 => "Reserved",
        EmbZrf2xx = 0x20 => "EMB-ZRF2xx",
        EmbZrf231xx = 0x24 => "EMB-ZRF231xx",
        EmbZrf231Pa = 0x26 => "EMB-ZRF231PA",
        EmbZrf212xx = 0x28 => "EMB-ZRF212xx",
        EmbZrf212B = 0x29 => "EMB-ZRF212B",
        EmbZ253x = 0x30 => "EMB-Z253x",
        EmbZ2530x = 0x34 => "EMB-Z2530x",
        EmbZ2530Pa = 0x36 => "EMB-Z2530PA",
        EmbZ2531x = 0x38 => "EMB-Z2531x",
        EmbZ2531PaUsb = 0x3A => "EMB-Z2531PA-USB",
        EmbZ2538x = 0x3C => "EMB-Z2538x",
        EmbZ2538Pa = 0x3D => "EMB-Z2538PA",
        EmbWmbx = 0x40 => "EMB-WMBx",
        EmbWmb169x = 0x44 => "EMB-WMB169x",
        EmbWmb169T = 0x45 => "EMB-WMB169T",
        EmbWmb169Pa = 0x46 => "EMB-WMB169PA",
        EmbWmb868x = 0x48 => "EMB-WMB868x",
        EmbWmb868 = 0x49 => "EMB-WMB868",
        EmbLrx = 0x50 => "EMB-LRx",
        EmbLr1272 = 0x54 => "EMB-LR1272",
        EmbLr1276S = 0x55 => "EMB-LR1276S",
        EmbAerx = 0x60 => "EMB-AERx",
    }
}

code_table! {
    /// Operating state reported by the module.
    pub enum DeviceState {
        Booting = 0x00 => "Booting",
        InsideBootloader = 0x01 => "Inside bootloader",
        Ready = 0x10 => "Ready (startup operations completed successfully)",
        ReadyStartupFailed = 0x11 => "Ready (startup operations failed)",
        Offline = 0x20 => "Offline",
        Connecting = 0x21 => "Connecting",
        TransparentModeStartup = 0x22 => "Transparent mode startup",
        Online = 0x30 => "Online",
        Disconnecting = 0x40 => "Disconnecting",
        Reserved = 0x50 => "Reserved",
        EndOfReceivingWindow = 0x51 => "End of receiving window",
        FirmwareUpdateStarted = 0x71 => "Firmware update over the air started",
        FirmwareUpdateCompleted = 0x72 => "Firmware update over the air completed (reset required to switch to new fw)",
    }
}

impl DeviceState {
    /// Whether the module has joined a network.
    pub fn is_online(self) -> bool {
        self == DeviceState::Online
    }
}

code_table! {
    /// LoRa operating channel (EU868 plan).
    pub enum LoraChannel {
        Ch868_100 = 0x01 => "868.100 MHz",
        Ch868_300 = 0x02 => "868.300 MHz",
        Ch868_500 = 0x03 => "868.500 MHz",
        Ch869_525 = 0x04 => "869.525 MHz",
    }
}

code_table! {
    /// LoRa spreading factor.
    pub enum SpreadingFactor {
        Sf7 = 0x07 => "128 Chips/symbol",
        Sf8 = 0x08 => "256 Chips/symbol",
        Sf9 = 0x09 => "512 Chips/symbol",
        Sf10 = 0x0A => "1024 Chips/symbol",
        Sf11 = 0x0B => "2048 Chips/symbol",
        Sf12 = 0x0C => "4096 Chips/symbol",
    }
}

code_table! {
    /// LoRa channel bandwidth.
    pub enum Bandwidth {
        Khz125 = 0x00 => "125 kHz",
        Khz250 = 0x01 => "250 kHz",
    }
}

code_table! {
    /// LoRa forward error correction coding rate.
    pub enum CodingRate {
        Cr4_5 = 0x01 => "4/5",
        Cr4_6 = 0x02 => "4/6",
        Cr4_7 = 0x03 => "4/7",
        Cr4_8 = 0x04 => "4/8",
    }
}

code_table! {
    /// Module energy save (sleep) policy.
    pub enum SleepPolicy {
        AlwaysOn = 0x00 => "ALWAYS ON",
        RxWindow = 0x01 => "RX WINDOW",
        TxOnly = 0x02 => "TX ONLY",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_resolve() {
        assert_eq!(Status::from(0x06), Status::Busy);
        assert_eq!(LinkProtocol::from(0x50), LinkProtocol::Lora);
        assert_eq!(ModuleModel::from(0x55), ModuleModel::EmbLr1276S);
        assert_eq!(DeviceState::from(0x30), DeviceState::Online);
        assert_eq!(SleepPolicy::from(0x02), SleepPolicy::TxOnly);
        assert_eq!(Status::Busy.to_string(), "Busy");
        assert_eq!(LoraChannel::Ch868_100.to_string(), "868.100 MHz");
    }

    #[test]
    fn test_unknown_code_keeps_raw_value() {
        let status = Status::from(0x42);
        assert_eq!(status, Status::Unknown(0x42));
        assert!(!status.is_known());
        assert_eq!(status.code(), 0x42);
        assert_eq!(u8::from(status), 0x42);
        assert_eq!(status.label(), None);
        assert_eq!(status.to_string(), "Unknown (0x42)");

        assert_eq!(LinkProtocol::from(0x00), LinkProtocol::Unknown(0x00));
        assert_eq!(ModuleModel::from(0xFF).code(), 0xFF);
        assert_eq!(DeviceState::from(0x99), DeviceState::Unknown(0x99));
    }

    #[test]
    fn test_codes_round_trip_through_u8() {
        for state in DeviceState::KNOWN {
            assert_eq!(DeviceState::from(state.code()), *state);
        }
        for model in ModuleModel::KNOWN {
            assert_eq!(ModuleModel::from(u8::from(*model)), *model);
        }
    }

    #[test]
    fn test_from_known_rejects_absent_codes() {
        assert_eq!(SpreadingFactor::from_known(0x07), Some(SpreadingFactor::Sf7));
        assert_eq!(SpreadingFactor::from_known(0x06), None);
        assert_eq!(Bandwidth::from_known(0x02), None);
        assert_eq!(CodingRate::from_known(0x00), None);
        assert_eq!(LoraChannel::from_known(0x05), None);
    }
}
