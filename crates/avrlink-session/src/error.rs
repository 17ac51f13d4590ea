use avrlink_frame::{Attribute, FrameError, Value};
use avrlink_transport::TransportError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The stream to the receiver could not be established.
    #[error("connection failed: {0}")]
    Connection(#[source] TransportError),

    /// The stream rejected the frame or accepted only part of it.
    #[error("sending {frame:?} failed: {reason}")]
    SendFailed { frame: String, reason: String },

    /// A query got no parsable answer within the settle interval.
    #[error("no response for {attribute}")]
    NoResponse { attribute: Attribute },

    /// The receiver did not confirm a command.
    #[error(
        "{attribute} change to {expected} was not acknowledged (device reported {})",
        .received.as_ref().map_or_else(|| "nothing".to_string(), |value| value.to_string())
    )]
    AckMismatch {
        attribute: Attribute,
        expected: Value,
        received: Option<Value>,
    },

    /// The value is outside the attribute's domain. Raised before any I/O.
    #[error(transparent)]
    InvalidValue(#[from] FrameError),

    /// The session was stopped.
    #[error("session is not alive")]
    NotAlive,
}

pub type Result<T> = std::result::Result<T, SessionError>;
