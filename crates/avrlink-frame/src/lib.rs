//! Attribute codec and frame parsing for the AVR text control protocol.
//!
//! Every message on the wire is a line of ASCII text terminated by a
//! carriage return:
//! - two characters of wire code (`PW`, `SI`, `MV`, `MU`)
//! - the value token (`ON`, `BD`, `455`, ...) or `?` for a query
//!
//! This layer is pure: no I/O and no state. It turns typed attribute values
//! into wire tokens and received chunks back into typed updates.

pub mod attribute;
pub mod codec;
pub mod error;
pub mod parser;

pub use attribute::{Attribute, AttributeSpec, Value, ValueKind, ATTRIBUTES};
pub use codec::{
    canonical, decode, encode, encode_command, encode_query, input_code, input_name,
    parse_value, InputSource, DELIMITER, INPUT_SOURCES, MAX_VOLUME, QUERY_MARKER,
};
pub use error::{FrameError, Result};
pub use parser::{frames, parse_chunk, ParsedChunk, ResponseFrame, Update, MAX_VOLUME_PREFIX};
