//! Device session engine for EBI radio modules.
//!
//! [`DeviceSession`] owns a byte-stream [`Transport`] and sequences the
//! request/response exchanges defined by `ebi-protocol`: the identity
//! handshake at open, reset with boot confirmation, network start/stop, and
//! every get/set operation. It is strictly synchronous: one request in
//! flight, one blocking read per response.
//!
//! # Example
//!
//! ```rust,ignore
//! use ebi_device::{DeviceSession, SessionConfig};
//! use ebi_protocol::{NetworkProtocol, SendTarget};
//!
//! let mut session = DeviceSession::connect("/dev/ttyUSB0", SessionConfig::default())?;
//! println!("{}", session.state().operational_state);
//!
//! session.send_data(b"hello", SendTarget::broadcast())?;
//! if let Some(packet) = session.receive(NetworkProtocol::LoraEmb, Some(Duration::from_secs(10)))? {
//!     println!("{}", packet);
//! }
//! ```

mod config;
mod error;
mod guard;
pub mod metrics;
pub mod mock;
mod serial;
mod session;
mod transport;

pub use config::*;
pub use error::*;
pub use guard::*;
pub use serial::*;
pub use session::*;
pub use transport::*;
