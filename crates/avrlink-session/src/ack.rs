use std::sync::MutexGuard;
use std::thread;
use std::time::Duration;

use avrlink_frame::{Attribute, Value};
use avrlink_transport::AvrStream;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::session::Shared;

/// Wait between a query and its read; the receiver's documented worst case.
pub const QUERY_SETTLE: Duration = Duration::from_millis(200);
/// Wait between a command and its acknowledgement read.
pub const COMMAND_SETTLE: Duration = Duration::from_millis(200);
/// Powering on takes up to a second before the receiver answers again.
pub const POWER_ON_SETTLE: Duration = Duration::from_millis(1000);

/// Settle interval for a command setting `attribute` to `value`.
pub fn settle_interval(attribute: Attribute, value: &Value) -> Duration {
    match (attribute, value) {
        (Attribute::Power, Value::Bool(true)) => POWER_ON_SETTLE,
        _ => COMMAND_SETTLE,
    }
}

/// A command that was written and awaits the receiver's acknowledgement.
///
/// Holds the stream lock: nothing else reads or writes the stream until the
/// acknowledgement is confirmed or this value is dropped.
#[must_use = "the command is only checked by `confirm`; dropping releases the stream unchecked"]
pub struct PendingAck<'a, S: AvrStream> {
    shared: &'a Shared<S>,
    stream: MutexGuard<'a, S>,
    attribute: Attribute,
    expected: Value,
    settle: Duration,
}

impl<'a, S: AvrStream> PendingAck<'a, S> {
    pub(crate) fn new(
        shared: &'a Shared<S>,
        stream: MutexGuard<'a, S>,
        attribute: Attribute,
        expected: Value,
        settle: Duration,
    ) -> Self {
        Self {
            shared,
            stream,
            attribute,
            expected,
            settle,
        }
    }

    /// Attribute the command targets.
    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    /// Value the receiver has to echo, as the wire represents it.
    pub fn expected(&self) -> &Value {
        &self.expected
    }

    /// How long [`confirm`](Self::confirm) waits before reading.
    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// Wait the settle interval, read once and check the echo.
    ///
    /// On success every other update in the same read is forwarded to the
    /// sink. On mismatch the error carries what the receiver reported; reverting
    /// local state is up to the caller. The stream lock is released either way.
    pub fn confirm(mut self) -> Result<()> {
        thread::sleep(self.settle);

        let mut parsed = self
            .shared
            .read_chunk(&mut self.stream, "acknowledgement")
            .unwrap_or_default();
        self.shared.apply_max_volume(&parsed);

        let received = parsed.take(self.attribute);
        // Unrelated notifications that arrived with the echo still count.
        self.shared.forward(parsed.updates);

        if received.as_ref() == Some(&self.expected) {
            debug!(attribute = %self.attribute, value = %self.expected, "command acknowledged");
            return Ok(());
        }

        warn!(
            attribute = %self.attribute,
            expected = %self.expected,
            received = ?received,
            "command not acknowledged"
        );
        Err(SessionError::AckMismatch {
            attribute: self.attribute,
            expected: self.expected,
            received,
        })
    }
}

impl<S: AvrStream> std::fmt::Debug for PendingAck<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAck")
            .field("attribute", &self.attribute)
            .field("expected", &self.expected)
            .field("settle", &self.settle)
            .finish()
    }
}
