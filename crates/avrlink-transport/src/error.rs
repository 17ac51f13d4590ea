use std::net::SocketAddr;

/// Errors that can occur in stream transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The device address could not be parsed.
    #[error("invalid device address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    /// Failed to connect to the device.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: SocketAddr,
        source: std::io::Error,
    },

    /// An I/O error occurred on the stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device closed the connection, or the stream was closed locally.
    #[error("stream closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
