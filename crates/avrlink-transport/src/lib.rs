//! Stream transport for AV receiver remote control.
//!
//! Provides the duplex stream abstraction the session layer runs on:
//! - [`AvrStream`]: write / read-or-no-data / close
//! - [`TcpTransport`]: the TCP implementation used by real receivers
//!
//! This is the lowest layer of avrlink. Everything else builds on top of
//! the [`AvrStream`] trait provided here.

pub mod address;
pub mod error;
pub mod tcp;
pub mod traits;

pub use address::{DeviceAddress, DEFAULT_PORT};
pub use error::{Result, TransportError};
pub use tcp::{TcpConfig, TcpTransport};
pub use traits::{AvrStream, ReadOutcome};
