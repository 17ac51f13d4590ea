//! Control Denon and Marantz AV receivers over their line protocol.
//!
//! The receiver listens on TCP port 23 and speaks carriage-return terminated
//! ASCII frames: a two-letter attribute code followed by a value or `?`.
//! avrlink turns that into typed attributes with acknowledged writes and a
//! background listener for the updates the receiver pushes on its own.
//!
//! # Crate Structure
//!
//! - [`transport`]: device addressing and the TCP stream
//! - [`frame`]: attribute registry, value codec and response parsing
//! - [`session`]: requests, acknowledged commands, listener and state store
//!
//! ```no_run
//! use avrlink::frame::Attribute;
//! use avrlink::session::{Controller, SessionConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let address = "192.168.1.40".parse()?;
//! let controller = Controller::connect(address, SessionConfig::default())?;
//! controller.set(Attribute::Volume, 42.5)?;
//! println!("{:?}", controller.get(Attribute::Input)?);
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use avrlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use avrlink_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use avrlink_session::*;
}
