use bytes::Bytes;

use crate::error::Result;

/// Outcome of a single read attempt on an [`AvrStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes that were available on the stream.
    Data(Bytes),
    /// Nothing was available right now. This is the idle case, not an error.
    NoData,
}

/// A connected duplex stream to a receiver.
///
/// Reads never block indefinitely: when no bytes are pending the stream
/// reports [`ReadOutcome::NoData`]. Hard failures (reset, EOF) are errors.
pub trait AvrStream: Send {
    /// Write `buf` in a single call and report how many bytes the stream accepted.
    ///
    /// Callers compare the count against the frame length to detect short writes.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Read at most `max` bytes that are currently available.
    fn read(&mut self, max: usize) -> Result<ReadOutcome>;

    /// Close the stream. Later reads and writes fail with `TransportError::Closed`.
    fn close(&mut self) -> Result<()>;
}

impl<T: AvrStream + ?Sized> AvrStream for Box<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn read(&mut self, max: usize) -> Result<ReadOutcome> {
        (**self).read(max)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
