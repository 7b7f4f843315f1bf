use std::fmt;
use std::io;

use tagwire_codec::{tag, CodecError};

// Process exit codes. Malformed input is DATA_INVALID, bad invocation is USAGE.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn codec_error(context: &str, err: CodecError) -> CliError {
    let code = match err {
        CodecError::InvalidRoot { .. } => USAGE,
        _ => DATA_INVALID,
    };
    match err.unknown_tag() {
        Some(byte) if tag::is_reserved(byte) => CliError::new(
            code,
            format!("{context}: {err} ({})", tag::tag_name(byte)),
        ),
        _ => CliError::new(code, format!("{context}: {err}")),
    }
}

pub fn json_error(context: &str, err: serde_json::Error) -> CliError {
    if err.is_io() {
        return CliError::new(INTERNAL, format!("{context}: {err}"));
    }
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn hex_error(context: &str, err: hex::FromHexError) -> CliError {
    CliError::new(USAGE, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_errors_are_data_invalid() {
        let err = codec_error(
            "decode failed",
            CodecError::UnknownTag {
                tag: 0xFF,
                offset: 0,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
        assert_eq!(err.message, "decode failed: unknown tag 0xFF at offset 0");
    }

    #[test]
    fn reserved_tags_are_named() {
        let err = codec_error(
            "decode failed",
            CodecError::UnknownTag {
                tag: tag::STREAM_MAP,
                offset: 5,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
        assert_eq!(
            err.message,
            "decode failed: unknown tag 0x06 at offset 5 (STREAM_MAP (reserved))"
        );
    }

    #[test]
    fn invalid_root_is_usage() {
        let err = codec_error(
            "encode failed",
            CodecError::InvalidRoot {
                kind: tagwire_codec::ValueKind::Int32,
            },
        );
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn io_errors_map_by_kind() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(io_error("read", denied).code, PERMISSION_DENIED);
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(io_error("read", missing).code, USAGE);
        let other = io::Error::other("boom");
        assert_eq!(io_error("read", other).code, INTERNAL);
    }

    #[test]
    fn json_syntax_is_data_invalid() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(json_error("parse", err).code, DATA_INVALID);
    }
}
