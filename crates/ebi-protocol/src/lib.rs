//! EBI Binary Serial Protocol
//!
//! This crate provides types and utilities for talking to an EBI LoRa radio
//! module over its binary serial interface. It is transport-agnostic: it turns
//! commands into frames and frames back into typed responses, and leaves the
//! byte stream to the caller (see the `ebi-device` crate).
//!
//! # Protocol Overview
//!
//! Every message is wrapped in a frame: a 2-byte big-endian length, the
//! payload, and a trailing sum-of-bytes checksum. Payloads are either:
//!
//! - **Commands** (host → module): start with a `CMD_*` opcode
//! - **Responses** (module → host): start with the request opcode | `0x80`
//! - **Notifications** (module → host, unsolicited): boot state (`0x84`) and
//!   received data (`0xE0`)
//!
//! # Example
//!
//! ```rust,ignore
//! use ebi_protocol::{Command, FrameCodec, Response};
//!
//! let cmd = Command::OutputPower { power: Some(13) };
//! let frame = FrameCodec::encode(&cmd.encode());
//!
//! let payload = FrameCodec::decode(&received)?;
//! let response = Response::decode_payload(&cmd, &payload)?;
//! ```

mod commands;
mod constants;
mod error;
mod frame;
mod responses;
mod tables;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use responses::*;
pub use tables::*;
pub use types::*;
