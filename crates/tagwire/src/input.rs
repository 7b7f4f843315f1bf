use std::fs;
use std::io::{self, Read};
use std::path::Path;

use tracing::debug;

use crate::exit::{hex_error, io_error, CliResult};

/// Message bytes from a file, inline hex, or stdin.
pub fn read_message(path: Option<&Path>, hex: Option<&str>) -> CliResult<Vec<u8>> {
    if let Some(text) = hex {
        return decode_hex(text);
    }
    if let Some(path) = path {
        let bytes = fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        debug!(path = %path.display(), bytes = bytes.len(), "read message");
        return Ok(bytes);
    }
    read_stdin()
}

/// Text from inline input, a file, or stdin.
pub fn read_text(inline: Option<&str>, path: Option<&Path>) -> CliResult<String> {
    if let Some(text) = inline {
        return Ok(text.to_owned());
    }
    if let Some(path) = path {
        return fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    let bytes = read_stdin()?;
    String::from_utf8(bytes).map_err(|err| {
        io_error(
            "stdin is not UTF-8",
            io::Error::new(io::ErrorKind::InvalidData, err),
        )
    })
}

/// Hex text with optional whitespace between bytes.
pub fn decode_hex(text: &str) -> CliResult<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(compact).map_err(|err| hex_error("invalid hex input", err))
}

fn read_stdin() -> CliResult<Vec<u8>> {
    let mut bytes = Vec::new();
    io::stdin()
        .read_to_end(&mut bytes)
        .map_err(|err| io_error("failed reading stdin", err))?;
    debug!(bytes = bytes.len(), "read stdin");
    Ok(bytes)
}
