use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::codec;
use crate::error::{FrameError, Result};

/// Logical attributes of a receiver that the client models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Power,
    Input,
    Volume,
    Mute,
}

impl Attribute {
    /// Every modeled attribute, in registry order.
    pub const ALL: [Attribute; 4] = [
        Attribute::Power,
        Attribute::Input,
        Attribute::Volume,
        Attribute::Mute,
    ];

    /// Registry entry for this attribute.
    pub fn spec(self) -> &'static AttributeSpec {
        // Registry order follows the enum discriminants.
        &ATTRIBUTES[self as usize]
    }

    /// Logical name (`power`, `input`, `volume`, `mute`).
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Two-letter wire code.
    pub fn wire_code(self) -> &'static str {
        self.spec().wire_code
    }

    /// Kind of value the attribute carries.
    pub fn kind(self) -> ValueKind {
        self.spec().kind
    }

    /// Look up an attribute by its wire code.
    pub fn from_wire_code(code: &str) -> Option<Attribute> {
        ATTRIBUTES
            .iter()
            .find(|spec| spec.wire_code == code)
            .map(|spec| spec.attribute)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = FrameError;

    fn from_str(name: &str) -> Result<Self> {
        ATTRIBUTES
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name.trim()))
            .map(|spec| spec.attribute)
            .ok_or_else(|| FrameError::UnknownAttribute(name.to_string()))
    }
}

/// Kinds of values an attribute can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Boolean,
    Enumerated,
    Numeric,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Enumerated => "enumerated string",
            ValueKind::Numeric => "number",
        })
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Text(String),
    Number(f64),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Boolean,
            Value::Text(_) => ValueKind::Enumerated,
            Value::Number(_) => ValueKind::Numeric,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
            Value::Number(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Static description of one attribute: identity plus its wire codec.
pub struct AttributeSpec {
    pub attribute: Attribute,
    pub name: &'static str,
    pub wire_code: &'static str,
    pub kind: ValueKind,
    encode: fn(&Value) -> Result<String>,
    decode: fn(&str) -> Result<Value>,
}

impl AttributeSpec {
    /// Encode a typed value into the attribute's wire token.
    pub fn encode(&self, value: &Value) -> Result<String> {
        if value.kind() != self.kind {
            return Err(FrameError::invalid(
                self.attribute,
                format!("expected {}, got {}", self.kind, value.kind()),
            ));
        }
        (self.encode)(value)
    }

    /// Decode a wire token into a typed value.
    pub fn decode(&self, token: &str) -> Result<Value> {
        (self.decode)(token)
    }
}

impl fmt::Debug for AttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSpec")
            .field("name", &self.name)
            .field("wire_code", &self.wire_code)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Attribute registry, indexed by `Attribute` discriminant.
pub static ATTRIBUTES: [AttributeSpec; 4] = [
    AttributeSpec {
        attribute: Attribute::Power,
        name: "power",
        wire_code: "PW",
        kind: ValueKind::Boolean,
        encode: |value| Ok(codec::encode_power(value.as_bool().unwrap_or_default()).to_string()),
        decode: |token| Ok(Value::Bool(codec::decode_power(token))),
    },
    AttributeSpec {
        attribute: Attribute::Input,
        name: "input",
        wire_code: "SI",
        kind: ValueKind::Enumerated,
        encode: |value| codec::encode_input(value.as_str().unwrap_or_default()).map(str::to_string),
        decode: |token| codec::decode_input(token).map(Value::from),
    },
    AttributeSpec {
        attribute: Attribute::Volume,
        name: "volume",
        wire_code: "MV",
        kind: ValueKind::Numeric,
        encode: |value| codec::encode_volume(value.as_f64().unwrap_or(f64::NAN)),
        decode: |token| codec::decode_volume(token).map(Value::Number),
    },
    AttributeSpec {
        attribute: Attribute::Mute,
        name: "mute",
        wire_code: "MU",
        kind: ValueKind::Boolean,
        encode: |value| Ok(codec::encode_mute(value.as_bool().unwrap_or_default()).to_string()),
        decode: |token| codec::decode_mute(token).map(Value::Bool),
    },
];
