//! Encoder: [`Value`] tree to bytes.
//!
//! Wire format:
//! ```text
//! list   : 0x01 │ count (u32 BE) │ value × count
//! map    : 0x02 │ count (u32 BE) │ (key len (u16 BE) │ key │ value) × count
//! null   : 0x00
//! bool   : 0x01 │ 0x00 / 0x01
//! int32  : 0x02 │ i32 BE
//! float64: 0x03 │ f64 BE
//! text   : 0x04 │ len (u32 BE) │ UTF-8
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{CodecError, Result};
use crate::tag;
use crate::value::{wire_int, Map, Value};

/// Maximum key length in bytes.
pub const MAX_KEY_LEN: usize = u16::MAX as usize;

/// Maximum text length in bytes, and maximum list/map element count.
pub const MAX_LEN: usize = u32::MAX as usize;

/// Envelope key carrying the result list.
pub const DATA_KEY: &str = "data";

/// Envelope key carrying diagnostic lines.
pub const TRACEBACK_KEY: &str = "traceback";

/// Encode a message. The root must be a list or a map.
pub fn encode(root: &Value) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    encode_into(root, &mut dst)?;
    Ok(dst.freeze())
}

/// Encode a message, appending to `dst`.
///
/// On error `dst` is left as it was.
pub fn encode_into(root: &Value, dst: &mut BytesMut) -> Result<()> {
    if !root.is_collection() {
        return Err(CodecError::InvalidRoot { kind: root.kind() });
    }
    let len = encoded_len(root)?;
    let start = dst.len();
    dst.reserve(len);
    put_value(root, dst)?;
    debug_assert_eq!(dst.len() - start, len);
    trace!(bytes = len, root = %root.kind(), "encoded message");
    Ok(())
}

/// Encode a request: always a top-level list of arguments.
pub fn encode_request(args: Vec<Value>) -> Result<Bytes> {
    encode(&Value::List(args))
}

/// Encode a list as a message.
pub fn encode_list(items: &[Value]) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    check_count(items.len())?;
    put_list(items, &mut dst)?;
    Ok(dst.freeze())
}

/// Encode a map as a message.
pub fn encode_map(map: &Map) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    check_count(map.len())?;
    put_map(map, &mut dst)?;
    Ok(dst.freeze())
}

/// Encode a response envelope.
///
/// The map holds `"data"` iff `data` is supplied and `"traceback"` iff
/// `traceback` is supplied, in that order, and nothing else.
pub fn encode_envelope(data: Option<Vec<Value>>, traceback: Option<Vec<Value>>) -> Result<Bytes> {
    encode(&Value::Map(envelope_map(data, traceback)))
}

pub(crate) fn envelope_map(data: Option<Vec<Value>>, traceback: Option<Vec<Value>>) -> Map {
    let mut map = Map::with_capacity(2);
    if let Some(data) = data {
        map.insert(DATA_KEY, Value::List(data));
    }
    if let Some(traceback) = traceback {
        map.insert(TRACEBACK_KEY, Value::List(traceback));
    }
    map
}

/// Exact number of bytes `value` occupies on the wire.
///
/// Fails with [`CodecError::UnsupportedType`] if any part of the value
/// exceeds a wire length limit.
pub fn encoded_len(value: &Value) -> Result<usize> {
    Ok(match value {
        Value::Null => 1,
        Value::Bool(_) => 2,
        Value::Int32(_) => 5,
        Value::Float64(n) => {
            if wire_int(*n).is_some() {
                5
            } else {
                9
            }
        }
        Value::Text(s) => {
            check_text(s)?;
            5 + s.len()
        }
        Value::List(items) => {
            check_count(items.len())?;
            items
                .iter()
                .try_fold(5usize, |acc, item| Ok(acc + encoded_len(item)?))?
        }
        Value::Map(map) => {
            check_count(map.len())?;
            map.iter().try_fold(5usize, |acc, (key, value)| {
                check_key(key)?;
                Ok(acc + 2 + key.len() + encoded_len(value)?)
            })?
        }
    })
}

fn put_value(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Null => dst.put_u8(tag::NULL),
        Value::Bool(b) => {
            dst.put_u8(tag::BOOL);
            dst.put_u8(u8::from(*b));
        }
        Value::Int32(i) => put_int(*i, dst),
        Value::Float64(n) => match wire_int(*n) {
            Some(i) => put_int(i, dst),
            None => {
                dst.put_u8(tag::FLOAT64);
                dst.put_f64(*n);
            }
        },
        Value::Text(s) => {
            check_text(s)?;
            dst.put_u8(tag::TEXT);
            dst.put_u32(s.len() as u32);
            dst.put_slice(s.as_bytes());
        }
        Value::List(items) => put_list(items, dst)?,
        Value::Map(map) => put_map(map, dst)?,
    }
    Ok(())
}

fn put_int(i: i32, dst: &mut BytesMut) {
    dst.put_u8(tag::INT32);
    dst.put_i32(i);
}

fn put_list(items: &[Value], dst: &mut BytesMut) -> Result<()> {
    check_count(items.len())?;
    dst.put_u8(tag::LIST);
    dst.put_u32(items.len() as u32);
    for item in items {
        put_value(item, dst)?;
    }
    Ok(())
}

fn put_map(map: &Map, dst: &mut BytesMut) -> Result<()> {
    check_count(map.len())?;
    dst.put_u8(tag::MAP);
    dst.put_u32(map.len() as u32);
    for (key, value) in map {
        check_key(key)?;
        dst.put_u16(key.len() as u16);
        dst.put_slice(key.as_bytes());
        put_value(value, dst)?;
    }
    Ok(())
}

fn check_count(count: usize) -> Result<()> {
    if count > MAX_LEN {
        return Err(CodecError::UnsupportedType(format!(
            "collection of {count} elements exceeds {MAX_LEN}"
        )));
    }
    Ok(())
}

fn check_text(s: &str) -> Result<()> {
    if s.len() > MAX_LEN {
        return Err(CodecError::UnsupportedType(format!(
            "text of {} bytes exceeds {MAX_LEN}",
            s.len()
        )));
    }
    Ok(())
}

fn check_key(key: &str) -> Result<()> {
    if key.len() > MAX_KEY_LEN {
        return Err(CodecError::UnsupportedType(format!(
            "map key of {} bytes exceeds {MAX_KEY_LEN}",
            key.len()
        )));
    }
    Ok(())
}
