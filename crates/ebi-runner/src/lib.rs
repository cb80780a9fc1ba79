//! Library side of the `ebi` command line tool.
//!
//! The binary parses arguments and prints results; the pieces that talk to a
//! module (setup sequence, network pause policy, argument parsing) live here
//! so they can be exercised against a mock transport.

pub mod commands;
pub mod config;
pub mod error;

pub use error::{RunnerError, RunnerResult};
