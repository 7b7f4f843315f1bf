//! Decoder: bytes to a [`Value`] tree.
//!
//! Decoding runs in two passes over the same buffer. The first resolves
//! every nested `0x01`/`0x02` tag to either its primitive (bool/int32) or
//! structural (list/map) reading ([`crate::resolve`]); the second walks the
//! buffer once with a forward-only cursor and builds the tree.
//!
//! A whole buffer is one message: bytes left over after the root value are
//! an error.

use tracing::trace;

use crate::config::DecodeConfig;
use crate::cursor::Cursor;
use crate::error::{CodecError, Result};
use crate::resolve::resolve;
use crate::tag;
use crate::value::{Map, Value};

/// Decode one message with the default configuration.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    Decoder::new(bytes).decode()
}

/// Decode one message with an explicit configuration.
pub fn decode_with_config(bytes: &[u8], config: DecodeConfig) -> Result<Value> {
    Decoder::with_config(bytes, config).decode()
}

/// Single-use decoder for one buffer.
///
/// [`Decoder::decode`] consumes the decoder, so a cursor is never shared
/// between messages.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    config: DecodeConfig,
}

impl<'a> Decoder<'a> {
    /// Create a decoder with default configuration.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_config(buf, DecodeConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(buf: &'a [u8], config: DecodeConfig) -> Self {
        Self { buf, config }
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decode the buffer into exactly one value.
    pub fn decode(self) -> Result<Value> {
        let shapes = resolve(self.buf, &self.config)?;
        let mut cursor = Cursor::new(self.buf);
        let mut walk = Walk {
            cursor: &mut cursor,
            shapes: shapes.iter().copied(),
            max_depth: self.config.max_depth,
        };
        let value = walk.root()?;

        let remaining = cursor.remaining();
        if remaining != 0 {
            return Err(CodecError::TrailingBytes {
                offset: cursor.position(),
                remaining,
            });
        }
        trace!(
            bytes = cursor.len(),
            nested_tags = shapes.len(),
            root = %value.kind(),
            "decoded message"
        );
        Ok(value)
    }
}

struct Walk<'c, 'a, I> {
    cursor: &'c mut Cursor<'a>,
    shapes: I,
    max_depth: usize,
}

impl<I: Iterator<Item = bool>> Walk<'_, '_, I> {
    /// The root tag is read in the structural namespace.
    fn root(&mut self) -> Result<Value> {
        let offset = self.cursor.position();
        match self.cursor.read_u8()? {
            tag::LIST => self.list(1),
            tag::MAP => self.map(1),
            other => self.primitive(other, offset),
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        let offset = self.cursor.position();
        let tag = self.cursor.read_u8()?;
        if !tag::is_dual_use(tag) {
            return self.primitive(tag, offset);
        }

        let structural = self.shapes.next().unwrap_or(false);
        match (tag, structural) {
            (tag::LIST, true) => self.list(depth + 1),
            (tag::MAP, true) => self.map(depth + 1),
            (tag::BOOL, false) => Ok(Value::Bool(self.cursor.read_bool()?)),
            _ => Ok(Value::Int32(self.cursor.read_i32()?)),
        }
    }

    fn primitive(&mut self, tag: u8, offset: usize) -> Result<Value> {
        match tag {
            tag::NULL => Ok(Value::Null),
            tag::FLOAT64 => Ok(Value::Float64(self.cursor.read_f64()?)),
            tag::TEXT => {
                let len = self.cursor.read_u32()? as usize;
                Ok(Value::Text(self.cursor.read_str(len)?.to_owned()))
            }
            other => Err(CodecError::UnknownTag { tag: other, offset }),
        }
    }

    fn list(&mut self, depth: usize) -> Result<Value> {
        self.check_depth(depth)?;
        let count = self.cursor.read_u32()? as usize;
        let mut items = Vec::with_capacity(count.min(self.cursor.remaining()));
        for _ in 0..count {
            items.push(self.value(depth)?);
        }
        Ok(Value::List(items))
    }

    fn map(&mut self, depth: usize) -> Result<Value> {
        self.check_depth(depth)?;
        let count = self.cursor.read_u32()? as usize;
        let mut map = Map::with_capacity(count.min(self.cursor.remaining() / 3));
        for _ in 0..count {
            let key_len = usize::from(self.cursor.read_u16()?);
            let key = self.cursor.read_str(key_len)?.to_owned();
            let value = self.value(depth)?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(CodecError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }
        Ok(())
    }
}
