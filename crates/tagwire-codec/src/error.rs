use crate::value::ValueKind;

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A message root must be a list or a map.
    #[error("invalid message root: {kind} (expected list or map)")]
    InvalidRoot { kind: ValueKind },

    /// The value cannot be represented on the wire.
    #[error("unsupported value: {0}")]
    UnsupportedType(String),

    /// A read would run past the end of the buffer.
    #[error("buffer underrun at offset {offset} (needed {needed} bytes, {available} available)")]
    BufferUnderrun {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A tag byte outside the recognized set.
    #[error("unknown tag 0x{tag:02X} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },

    /// A bool payload other than `0x00` or `0x01`.
    #[error("invalid bool byte 0x{byte:02X} at offset {offset}")]
    InvalidBool { byte: u8, offset: usize },

    /// Text or key bytes are not valid UTF-8.
    #[error("invalid UTF-8 in text at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// Bytes remain after the root value was fully decoded.
    #[error("{remaining} trailing bytes after message at offset {offset}")]
    TrailingBytes { offset: usize, remaining: usize },

    /// Nesting exceeds the configured maximum depth.
    #[error("nesting depth exceeds limit of {limit}")]
    DepthLimitExceeded { limit: usize },
}

impl CodecError {
    /// The tag byte carried by an [`CodecError::UnknownTag`] error.
    pub fn unknown_tag(&self) -> Option<u8> {
        match self {
            CodecError::UnknownTag { tag, .. } => Some(*tag),
            _ => None,
        }
    }

    /// Returns true for errors raised by truncated input.
    pub fn is_underrun(&self) -> bool {
        matches!(self, CodecError::BufferUnderrun { .. })
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
