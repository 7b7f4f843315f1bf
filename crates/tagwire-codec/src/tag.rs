//! Tag bytes.
//!
//! Tags live in two namespaces that share byte values. At the root of a
//! message `0x01`/`0x02` open a list/map; at a value position the same bytes
//! mean bool/int32. Nested lists and maps are written with the structural
//! tags, so a nested `0x01`/`0x02` is resolved by the decoder (see
//! [`crate::decode`]).

/// Null value (value namespace).
pub const NULL: u8 = 0x00;

/// Boolean value (value namespace), 1-byte payload.
pub const BOOL: u8 = 0x01;

/// Signed 32-bit integer (value namespace), 4-byte big-endian payload.
pub const INT32: u8 = 0x02;

/// IEEE-754 double, 8-byte big-endian payload.
pub const FLOAT64: u8 = 0x03;

/// UTF-8 text, u32 big-endian byte length then bytes.
pub const TEXT: u8 = 0x04;

/// List (structural namespace), u32 big-endian count then elements.
pub const LIST: u8 = 0x01;

/// Map (structural namespace), u32 big-endian count then entries.
pub const MAP: u8 = 0x02;

/// Reserved streaming list. Never produced or accepted.
pub const STREAM_LIST: u8 = 0x05;

/// Reserved streaming map. Never produced or accepted.
pub const STREAM_MAP: u8 = 0x06;

/// Returns a human-readable name for a tag byte read at a value position.
pub fn tag_name(tag: u8) -> &'static str {
    match tag {
        NULL => "NULL",
        BOOL => "BOOL|LIST",
        INT32 => "INT32|MAP",
        FLOAT64 => "FLOAT64",
        TEXT => "TEXT",
        STREAM_LIST => "STREAM_LIST (reserved)",
        STREAM_MAP => "STREAM_MAP (reserved)",
        _ => "UNKNOWN",
    }
}

/// Returns true if the tag is reserved but unimplemented.
pub fn is_reserved(tag: u8) -> bool {
    matches!(tag, STREAM_LIST | STREAM_MAP)
}

/// Returns true if the tag is shared between the value and structural namespaces.
pub fn is_dual_use(tag: u8) -> bool {
    matches!(tag, LIST | MAP)
}
