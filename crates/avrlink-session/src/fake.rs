//! Scripted receiver used by the session tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use avrlink_frame::{frames, Attribute, Value};
use avrlink_transport::{AvrStream, ReadOutcome, TransportError};
use bytes::Bytes;

use crate::state::StateSink;

#[derive(Default)]
struct Script {
    pending: Vec<u8>,
    values: HashMap<String, String>,
    ack_overrides: HashMap<String, String>,
    writes: Vec<String>,
    silent: bool,
    short_writes: bool,
    failing_reads: bool,
    read_delay: Duration,
    closed: bool,
}

#[derive(Default)]
struct State {
    script: Mutex<Script>,
    busy: AtomicBool,
    overlaps: AtomicUsize,
    reads: AtomicUsize,
    failed_reads: AtomicUsize,
    closes: AtomicUsize,
}

/// In-memory receiver. Clones share state, so a test keeps a handle after
/// moving one clone into a session.
///
/// Queries are answered from the value table, commands update it and are
/// echoed back unless an override is configured. Concurrent stream access
/// is counted in [`overlaps`](Self::overlaps).
#[derive(Clone, Default)]
pub(crate) struct FakeReceiver {
    state: Arc<State>,
}

impl FakeReceiver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_value(self, code: &str, token: &str) -> Self {
        self.script().values.insert(code.to_string(), token.to_string());
        self
    }

    /// Replace the echo of the next command for `code` with `reply`.
    pub(crate) fn with_ack_override(self, code: &str, reply: &str) -> Self {
        self.script()
            .ack_overrides
            .insert(code.to_string(), reply.to_string());
        self
    }

    pub(crate) fn with_read_delay(self, delay: Duration) -> Self {
        self.script().read_delay = delay;
        self
    }

    /// Never answer queries or commands.
    pub(crate) fn silent(self) -> Self {
        self.set_silent(true);
        self
    }

    pub(crate) fn set_silent(&self, silent: bool) {
        self.script().silent = silent;
    }

    pub(crate) fn set_short_writes(&self, short: bool) {
        self.script().short_writes = short;
    }

    pub(crate) fn set_failing_reads(&self, failing: bool) {
        self.script().failing_reads = failing;
    }

    /// Queue unsolicited bytes as if the receiver had sent them.
    pub(crate) fn push(&self, text: &str) {
        self.script().pending.extend_from_slice(text.as_bytes());
    }

    pub(crate) fn writes(&self) -> Vec<String> {
        self.script().writes.clone()
    }

    pub(crate) fn overlaps(&self) -> usize {
        self.state.overlaps.load(Ordering::SeqCst)
    }

    pub(crate) fn reads(&self) -> usize {
        self.state.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn failed_reads(&self) -> usize {
        self.state.failed_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.state.script.lock().unwrap()
    }

    fn enter(&self) {
        if self.state.busy.swap(true, Ordering::SeqCst) {
            self.state.overlaps.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn leave(&self) {
        self.state.busy.store(false, Ordering::SeqCst);
    }

    fn respond(script: &mut Script, frame: &str) {
        if frame.len() < 2 {
            return;
        }
        let (code, rest) = frame.split_at(2);
        let reply = if rest == "?" {
            script.values.get(code).map(|token| format!("{code}{token}"))
        } else {
            script.values.insert(code.to_string(), rest.to_string());
            Some(
                script
                    .ack_overrides
                    .remove(code)
                    .unwrap_or_else(|| frame.to_string()),
            )
        };
        if let (Some(reply), false) = (reply, script.silent) {
            script.pending.extend_from_slice(reply.as_bytes());
            script.pending.push(b'\r');
        }
    }
}

impl AvrStream for FakeReceiver {
    fn write(&mut self, buf: &[u8]) -> avrlink_transport::Result<usize> {
        self.enter();
        let result = {
            let mut script = self.script();
            if script.closed {
                Err(TransportError::Closed)
            } else if script.short_writes {
                Ok(buf.len().saturating_sub(1))
            } else {
                let text = String::from_utf8_lossy(buf).to_string();
                script.writes.push(text.clone());
                for frame in frames(&text) {
                    Self::respond(&mut script, frame);
                }
                Ok(buf.len())
            }
        };
        self.leave();
        result
    }

    fn read(&mut self, max: usize) -> avrlink_transport::Result<ReadOutcome> {
        self.enter();
        self.state.reads.fetch_add(1, Ordering::SeqCst);
        let delay = self.script().read_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let result = {
            let mut script = self.script();
            if script.closed {
                Err(TransportError::Closed)
            } else if script.failing_reads {
                self.state.failed_reads.fetch_add(1, Ordering::SeqCst);
                Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "scripted failure",
                )))
            } else if script.pending.is_empty() {
                Ok(ReadOutcome::NoData)
            } else {
                let take = max.min(script.pending.len());
                let chunk: Vec<u8> = script.pending.drain(..take).collect();
                Ok(ReadOutcome::Data(Bytes::from(chunk)))
            }
        };
        self.leave();
        result
    }

    fn close(&mut self) -> avrlink_transport::Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script();
        if script.closed {
            return Err(TransportError::Closed);
        }
        script.closed = true;
        Ok(())
    }
}

/// Sink that records every notification in order.
#[derive(Default)]
pub(crate) struct RecordingSink {
    updates: Mutex<Vec<(Attribute, Value)>>,
}

impl RecordingSink {
    pub(crate) fn updates(&self) -> Vec<(Attribute, Value)> {
        self.updates.lock().unwrap().clone()
    }
}

impl StateSink for RecordingSink {
    fn notify(&self, attribute: Attribute, value: &Value) {
        self.updates.lock().unwrap().push((attribute, value.clone()));
    }
}
