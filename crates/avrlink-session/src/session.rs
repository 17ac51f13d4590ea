use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use avrlink_frame::{
    canonical, encode_command, encode_query, parse_chunk, Attribute, ParsedChunk, Update, Value,
};
use avrlink_transport::{AvrStream, DeviceAddress, ReadOutcome, TcpConfig, TcpTransport};
use bytes::BytesMut;
use tracing::{debug, error, info, warn};

use crate::ack::{settle_interval, PendingAck, QUERY_SETTLE};
use crate::error::{Result, SessionError};
use crate::listener;
use crate::state::StateSink;

/// Default maximum volume until the receiver reports its own ceiling.
pub const DEFAULT_MAX_VOLUME: f64 = 99.0;

/// Runtime behavior settings for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pause between listener reads.
    pub poll_interval: Duration,
    /// Upper bound for a single read from the stream.
    pub read_chunk_size: usize,
    /// Socket settings used by [`Session::connect`].
    pub tcp: TcpConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            read_chunk_size: 2048,
            tcp: TcpConfig::default(),
        }
    }
}

/// State shared between the foreground session handle and the listener thread.
pub(crate) struct Shared<S> {
    stream: Mutex<S>,
    pub(crate) alive: AtomicBool,
    max_volume: Mutex<f64>,
    sink: Arc<dyn StateSink>,
    pub(crate) config: SessionConfig,
}

impl<S: AvrStream> Shared<S> {
    /// Acquire exclusive access to the stream.
    pub(crate) fn lock_stream(&self) -> MutexGuard<'_, S> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the side effect of a parsed chunk and forward its updates.
    pub(crate) fn apply(&self, parsed: ParsedChunk) {
        self.apply_max_volume(&parsed);
        self.forward(parsed.updates);
    }

    pub(crate) fn apply_max_volume(&self, parsed: &ParsedChunk) {
        if let Some(max_volume) = parsed.max_volume {
            *self.max_volume.lock().unwrap_or_else(PoisonError::into_inner) = max_volume;
        }
    }

    pub(crate) fn forward(&self, updates: Vec<Update>) {
        for update in updates {
            debug!(attribute = %update.attribute, value = %update.value, "attribute update");
            self.sink.notify(update.attribute, &update.value);
        }
    }

    /// One read under an already held lock. Hard errors are logged and read as silence.
    pub(crate) fn read_chunk(&self, stream: &mut S, context: &str) -> Option<ParsedChunk> {
        match stream.read(self.config.read_chunk_size) {
            Ok(ReadOutcome::Data(bytes)) => Some(parse_chunk(&bytes)),
            Ok(ReadOutcome::NoData) => None,
            Err(err) => {
                warn!(error = %err, context, "read from receiver failed");
                None
            }
        }
    }
}

/// A connection to one receiver.
///
/// All stream access, foreground and background, goes through one mutex:
/// a query, a command with its acknowledgement read, and a listener poll
/// never interleave.
pub struct Session<S: AvrStream + 'static = TcpTransport> {
    shared: Arc<Shared<S>>,
    address: Option<DeviceAddress>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Session<TcpTransport> {
    /// Connect to the receiver at `address` and start the listener.
    pub fn connect(
        address: DeviceAddress,
        config: SessionConfig,
        sink: Arc<dyn StateSink>,
    ) -> Result<Self> {
        let stream = TcpTransport::connect(&address, &config.tcp).map_err(|err| {
            error!(%address, error = %err, "could not connect to receiver");
            SessionError::Connection(err)
        })?;
        let mut session = Self::from_stream(stream, config, sink)?;
        session.address = Some(address);
        info!(%address, "receiver session started");
        Ok(session)
    }
}

impl<S: AvrStream + 'static> Session<S> {
    /// Start a session on an already connected stream.
    pub fn from_stream(stream: S, config: SessionConfig, sink: Arc<dyn StateSink>) -> Result<Self> {
        let shared = Arc::new(Shared {
            stream: Mutex::new(stream),
            alive: AtomicBool::new(true),
            max_volume: Mutex::new(DEFAULT_MAX_VOLUME),
            sink,
            config,
        });

        let handle = listener::spawn(shared.clone()).map_err(|err| {
            shared.alive.store(false, Ordering::SeqCst);
            SessionError::Connection(err.into())
        })?;

        Ok(Self {
            shared,
            address: None,
            listener: Mutex::new(Some(handle)),
        })
    }

    /// Query the current value of `attribute`.
    ///
    /// Other updates carried by the same read are forwarded to the sink.
    pub fn request_attribute(&self, attribute: Attribute) -> Result<Value> {
        self.ensure_alive()?;

        let mut query = BytesMut::new();
        encode_query(attribute, &mut query);

        let mut stream = self.shared.lock_stream();
        write_frame(&mut *stream, &query)?;
        thread::sleep(QUERY_SETTLE);

        let Some(mut parsed) = self.shared.read_chunk(&mut stream, "query") else {
            error!(%attribute, "query did not yield any response");
            return Err(SessionError::NoResponse { attribute });
        };
        self.shared.apply_max_volume(&parsed);
        let value = parsed.take(attribute);
        self.shared.forward(parsed.updates);

        match value {
            Some(value) => {
                debug!(%attribute, %value, "query answered");
                Ok(value)
            }
            None => {
                error!(%attribute, "response did not answer the query");
                Err(SessionError::NoResponse { attribute })
            }
        }
    }

    /// Send a command and keep the stream locked for its acknowledgement.
    ///
    /// The value is validated before any I/O. Call [`PendingAck::confirm`]
    /// on the result to read and check the receiver's echo.
    pub fn send_command(&self, attribute: Attribute, value: &Value) -> Result<PendingAck<'_, S>> {
        self.ensure_alive()?;

        let expected = canonical(attribute, value)?;
        let mut frame = BytesMut::new();
        encode_command(attribute, value, &mut frame)?;

        let mut stream = self.shared.lock_stream();
        write_frame(&mut *stream, &frame)?;

        let settle = settle_interval(attribute, &expected);
        Ok(PendingAck::new(&self.shared, stream, attribute, expected, settle))
    }

    /// Stop the listener, then close the stream. Later calls are no-ops.
    pub fn stop(&self) {
        if !self.shared.alive.swap(false, Ordering::SeqCst) {
            return;
        }

        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("listener thread panicked");
            }
        }

        let mut stream = self.shared.lock_stream();
        if let Err(err) = stream.close() {
            debug!(error = %err, "closing stream failed");
        }
        debug!("receiver session stopped");
    }

    /// True between a successful connect and [`stop`](Self::stop).
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    /// Volume ceiling last reported by the receiver.
    pub fn max_volume(&self) -> f64 {
        *self
            .shared
            .max_volume
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Receiver address, when the session was opened with [`Session::connect`].
    pub fn address(&self) -> Option<&DeviceAddress> {
        self.address.as_ref()
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(SessionError::NotAlive)
        }
    }
}

impl<S: AvrStream + 'static> Drop for Session<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<S: AvrStream + 'static> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("alive", &self.is_alive())
            .field("max_volume", &self.max_volume())
            .finish()
    }
}

/// Write one frame and require the stream to accept all of it.
fn write_frame<S: AvrStream + ?Sized>(stream: &mut S, frame: &[u8]) -> Result<()> {
    let printable = || {
        String::from_utf8_lossy(frame)
            .trim_end_matches('\r')
            .to_string()
    };
    debug!(frame = %printable(), "sending frame");

    match stream.write(frame) {
        Ok(written) if written == frame.len() => Ok(()),
        Ok(written) => {
            error!(frame = %printable(), written, "short write to receiver");
            Err(SessionError::SendFailed {
                frame: printable(),
                reason: format!("stream accepted {written} of {} bytes", frame.len()),
            })
        }
        Err(err) => {
            error!(frame = %printable(), error = %err, "write to receiver failed");
            Err(SessionError::SendFailed {
                frame: printable(),
                reason: err.to_string(),
            })
        }
    }
}
