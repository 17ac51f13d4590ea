use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::address::DeviceAddress;
use crate::error::{Result, TransportError};
use crate::traits::{AvrStream, ReadOutcome};

/// Configuration for TCP connections.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Upper bound for establishing the connection.
    pub connect_timeout: Duration,
    /// Disable Nagle's algorithm so short command frames go out immediately.
    pub nodelay: bool,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            nodelay: true,
        }
    }
}

/// TCP stream to a receiver's control port.
///
/// The socket is switched to non-blocking mode after connecting, so a read
/// with nothing pending returns [`ReadOutcome::NoData`] instead of parking
/// the calling thread.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    address: DeviceAddress,
}

impl TcpTransport {
    /// Connect to the receiver at `address`.
    pub fn connect(address: &DeviceAddress, config: &TcpConfig) -> Result<Self> {
        let socket_addr = address.socket_addr();
        let stream = TcpStream::connect_timeout(&socket_addr, config.connect_timeout).map_err(
            |source| TransportError::Connect {
                address: socket_addr,
                source,
            },
        )?;
        Self::from_stream(stream, config)
    }

    /// Wrap an already connected stream and apply the transport's socket options.
    pub fn from_stream(stream: TcpStream, config: &TcpConfig) -> Result<Self> {
        let address = DeviceAddress::from(stream.peer_addr()?);
        if config.nodelay {
            stream.set_nodelay(true)?;
        }
        stream.set_nonblocking(true)?;
        debug!(%address, "connected to receiver");
        Ok(Self {
            stream: Some(stream),
            address,
        })
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(TransportError::Closed)
    }
}

impl AvrStream for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let stream = self.stream_mut()?;
        loop {
            match stream.write(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                // Nothing accepted; the caller sees a short write.
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(0),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn read(&mut self, max: usize) -> Result<ReadOutcome> {
        let stream = self.stream_mut()?;
        let mut buf = vec![0u8; max];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(ReadOutcome::Data(Bytes::from(buf)));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Ok(ReadOutcome::NoData)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        match self.stream.take() {
            Some(stream) => {
                debug!(address = %self.address, "closing receiver connection");
                match stream.shutdown(Shutdown::Both) {
                    Ok(()) => Ok(()),
                    Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
                    Err(err) => Err(TransportError::Io(err)),
                }
            }
            None => Err(TransportError::Closed),
        }
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("address", &self.address)
            .field("open", &self.stream.is_some())
            .finish()
    }
}
