//! Session management for AV receivers.
//!
//! This is the "just works" layer. Connect to a receiver, query and set
//! typed attributes with acknowledgement checking, and receive unsolicited
//! updates from a background listener.

pub mod ack;
pub mod control;
pub mod error;
pub mod listener;
pub mod session;
pub mod state;

#[cfg(test)]
mod fake;

pub use ack::{settle_interval, PendingAck, COMMAND_SETTLE, POWER_ON_SETTLE, QUERY_SETTLE};
pub use control::Controller;
pub use error::{Result, SessionError};
pub use session::{Session, SessionConfig, DEFAULT_MAX_VOLUME};
pub use state::{StateSink, StateStore};
