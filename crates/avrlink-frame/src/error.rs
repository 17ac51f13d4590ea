use crate::attribute::Attribute;

/// Errors that can occur while encoding or decoding attribute values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    /// A value is outside the attribute's domain, or a wire token could not be decoded.
    #[error("invalid value for {attribute}: {reason}")]
    InvalidValue { attribute: Attribute, reason: String },

    /// The attribute name is not part of the registry.
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),
}

impl FrameError {
    pub(crate) fn invalid(attribute: Attribute, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            attribute,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
