use bytes::{BufMut, BytesMut};

use crate::attribute::{Attribute, Value, ValueKind};
use crate::error::{FrameError, Result};

/// Frame terminator.
pub const DELIMITER: u8 = b'\r';

/// Token that turns a wire code into a status query (`MV?`).
pub const QUERY_MARKER: &str = "?";

/// Highest volume the wire format can express. Inputs that round to it are accepted.
pub const MAX_VOLUME: f64 = 99.5;

/// Trailing digit that marks a half step in volume tokens (`455` is 45.5).
const HALF_STEP_MARKER: char = '5';

/// One input channel: the logical name and the device's code for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSource {
    pub name: &'static str,
    pub code: &'static str,
}

/// Input vocabulary. Both lookup directions are derived from this table.
pub const INPUT_SOURCES: &[InputSource] = &[
    InputSource {
        name: "Media Player",
        code: "MPLAY",
    },
    InputSource {
        name: "Satellite/Cable",
        code: "SAT/CBL",
    },
    InputSource {
        name: "Game",
        code: "GAME",
    },
    InputSource {
        name: "Blu-ray Player",
        code: "BD",
    },
    InputSource {
        name: "Phonograph",
        code: "PHONO",
    },
    InputSource {
        name: "TV",
        code: "TV",
    },
    InputSource {
        name: "DVD",
        code: "DVD",
    },
    InputSource {
        name: "CD",
        code: "CD",
    },
    InputSource {
        name: "DVR",
        code: "DVR",
    },
];

/// Device code for an input name.
pub fn input_code(name: &str) -> Option<&'static str> {
    INPUT_SOURCES
        .iter()
        .find(|source| source.name == name)
        .map(|source| source.code)
}

/// Input name for a device code.
pub fn input_name(code: &str) -> Option<&'static str> {
    INPUT_SOURCES
        .iter()
        .find(|source| source.code == code)
        .map(|source| source.name)
}

/// Encode a typed value into the attribute's wire token.
pub fn encode(attribute: Attribute, value: &Value) -> Result<String> {
    attribute.spec().encode(value)
}

/// Decode a wire token into the attribute's typed value.
pub fn decode(attribute: Attribute, token: &str) -> Result<Value> {
    attribute.spec().decode(token)
}

/// The value as the device will report it back: `decode(encode(value))`.
///
/// Volumes are rounded to the half step the wire can carry, so a command for
/// 45.3 is acknowledged as 45.5.
pub fn canonical(attribute: Attribute, value: &Value) -> Result<Value> {
    decode(attribute, &encode(attribute, value)?)
}

pub(crate) fn encode_power(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "STANDBY"
    }
}

/// Permissive: anything that does not read as "on" is standby.
pub(crate) fn decode_power(token: &str) -> bool {
    parse_bool(token).unwrap_or(false)
}

pub(crate) fn encode_mute(muted: bool) -> &'static str {
    if muted {
        "ON"
    } else {
        "OFF"
    }
}

pub(crate) fn decode_mute(token: &str) -> Result<bool> {
    parse_bool(token).ok_or_else(|| {
        FrameError::invalid(Attribute::Mute, format!("unrecognized token '{token}'"))
    })
}

pub(crate) fn encode_input(name: &str) -> Result<&'static str> {
    input_code(name).ok_or_else(|| {
        FrameError::invalid(Attribute::Input, format!("unknown input source '{name}'"))
    })
}

pub(crate) fn decode_input(code: &str) -> Result<&'static str> {
    input_name(code).ok_or_else(|| {
        FrameError::invalid(Attribute::Input, format!("unknown input code '{code}'"))
    })
}

/// Encode a volume as the device's integer or integer-plus-half-step token.
///
/// The range check applies to the rounded value, so 99.6 encodes as 99.5.
pub(crate) fn encode_volume(volume: f64) -> Result<String> {
    let out_of_range = || {
        FrameError::invalid(
            Attribute::Volume,
            format!("{volume} is outside 0..={MAX_VOLUME}"),
        )
    };
    if !volume.is_finite() || volume < 0.0 {
        return Err(out_of_range());
    }

    let mut whole = volume.trunc();
    let mut half = ((volume - whole) * 2.0).round_ties_even() / 2.0;
    if half >= 1.0 {
        whole += 1.0;
        half = 0.0;
    }
    if whole + half > MAX_VOLUME {
        return Err(out_of_range());
    }

    let whole = whole as u8;
    if half == 0.0 {
        Ok(format!("{whole:02}"))
    } else {
        Ok(format!("{whole:02}{HALF_STEP_MARKER}"))
    }
}

/// Two characters are a whole number; three are the first two plus a half step.
pub(crate) fn decode_volume(token: &str) -> Result<f64> {
    let invalid = |reason: &str| {
        FrameError::invalid(Attribute::Volume, format!("token '{token}' {reason}"))
    };

    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("is not numeric"));
    }

    match token.len() {
        2 => token
            .parse::<u8>()
            .map(f64::from)
            .map_err(|_| invalid("is not numeric")),
        3 => token[..2]
            .parse::<u8>()
            .map(|whole| f64::from(whole) + 0.5)
            .map_err(|_| invalid("is not numeric")),
        _ => Err(invalid("must be 2 or 3 digits")),
    }
}

fn parse_bool(token: &str) -> Option<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Turn user-supplied text into a value of the attribute's kind.
///
/// Booleans accept `on/off`, `true/false`, `yes/no`, `1/0` and `standby`.
/// Inputs accept the logical name or the device code, case-insensitively.
pub fn parse_value(attribute: Attribute, text: &str) -> Result<Value> {
    let text = text.trim();
    match attribute.kind() {
        ValueKind::Boolean => {
            if text.eq_ignore_ascii_case("standby") {
                return Ok(Value::Bool(false));
            }
            parse_bool(text).map(Value::Bool).ok_or_else(|| {
                FrameError::invalid(attribute, format!("'{text}' is not a boolean"))
            })
        }
        ValueKind::Enumerated => INPUT_SOURCES
            .iter()
            .find(|source| {
                source.name.eq_ignore_ascii_case(text) || source.code.eq_ignore_ascii_case(text)
            })
            .map(|source| Value::from(source.name))
            .ok_or_else(|| {
                FrameError::invalid(attribute, format!("unknown input source '{text}'"))
            }),
        ValueKind::Numeric => text
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| FrameError::invalid(attribute, format!("'{text}' is not a number"))),
    }
}

/// Encode a status query (`<code>?\r`).
pub fn encode_query(attribute: Attribute, dst: &mut BytesMut) {
    let code = attribute.wire_code();
    dst.reserve(code.len() + QUERY_MARKER.len() + 1);
    dst.put_slice(code.as_bytes());
    dst.put_slice(QUERY_MARKER.as_bytes());
    dst.put_u8(DELIMITER);
}

/// Encode a command frame (`<code><token>\r`).
///
/// Nothing is written to `dst` when the value is rejected.
pub fn encode_command(attribute: Attribute, value: &Value, dst: &mut BytesMut) -> Result<()> {
    let token = encode(attribute, value)?;
    let code = attribute.wire_code();
    dst.reserve(code.len() + token.len() + 1);
    dst.put_slice(code.as_bytes());
    dst.put_slice(token.as_bytes());
    dst.put_u8(DELIMITER);
    Ok(())
}
