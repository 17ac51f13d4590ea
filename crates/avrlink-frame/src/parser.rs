use tracing::{debug, trace};

use crate::attribute::{Attribute, Value};
use crate::codec::{decode_volume, DELIMITER};

/// Prefix of the side-channel frame that reports the volume ceiling (`MVMAX 98`).
pub const MAX_VOLUME_PREFIX: &str = "MVMAX";

/// One received line split into wire code and raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame<'a> {
    pub wire_code: &'a str,
    pub value: &'a str,
}

impl<'a> ResponseFrame<'a> {
    /// Split a frame after its two-character wire code.
    ///
    /// Returns `None` for frames too short to carry a code.
    pub fn split(frame: &'a str) -> Option<Self> {
        if frame.len() < 2 || !frame.is_char_boundary(2) {
            return None;
        }
        let (wire_code, value) = frame.split_at(2);
        Some(Self { wire_code, value })
    }
}

/// A decoded attribute update.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub attribute: Attribute,
    pub value: Value,
}

/// Everything one received chunk carried.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedChunk {
    /// Volume ceiling announced in the chunk, if any.
    pub max_volume: Option<f64>,
    /// Decoded updates in the order their frames appeared.
    pub updates: Vec<Update>,
}

impl ParsedChunk {
    /// True when the chunk yielded neither updates nor a side effect.
    pub fn is_empty(&self) -> bool {
        self.max_volume.is_none() && self.updates.is_empty()
    }

    /// Remove every update for `attribute` and return the latest value among them.
    pub fn take(&mut self, attribute: Attribute) -> Option<Value> {
        let mut taken = None;
        self.updates.retain(|update| {
            if update.attribute == attribute {
                taken = Some(update.value.clone());
                false
            } else {
                true
            }
        });
        taken
    }
}

/// Split received text into non-empty frames.
pub fn frames(text: &str) -> impl Iterator<Item = &str> {
    text.split(char::from(DELIMITER))
        .filter(|frame| !frame.is_empty())
}

/// Parse a raw chunk read from the stream.
///
/// Volume-ceiling frames only set [`ParsedChunk::max_volume`]. Frames with
/// unknown wire codes are dropped, as are known frames whose value does not
/// decode.
pub fn parse_chunk(chunk: &[u8]) -> ParsedChunk {
    let text = String::from_utf8_lossy(chunk);
    let mut parsed = ParsedChunk::default();

    for frame in frames(&text) {
        trace!(frame, "received frame");

        if let Some(rest) = frame.strip_prefix(MAX_VOLUME_PREFIX) {
            let token = rest.rsplit(' ').next().unwrap_or(rest);
            match decode_volume(token) {
                Ok(max_volume) => {
                    debug!(max_volume, "device reported maximum volume");
                    parsed.max_volume = Some(max_volume);
                }
                Err(err) => debug!(frame, error = %err, "ignoring malformed volume ceiling"),
            }
            continue;
        }

        let Some(response) = ResponseFrame::split(frame) else {
            trace!(frame, "ignoring short frame");
            continue;
        };
        let Some(attribute) = Attribute::from_wire_code(response.wire_code) else {
            trace!(wire_code = response.wire_code, "ignoring unmodeled wire code");
            continue;
        };

        match attribute.spec().decode(response.value) {
            Ok(value) => parsed.updates.push(Update { attribute, value }),
            Err(err) => debug!(frame, error = %err, "ignoring undecodable frame"),
        }
    }

    parsed
}
