use bytes::Buf;

use crate::error::{CodecError, Result};

/// Bounds-checked big-endian reads over a borrowed buffer.
///
/// Every read checks the remaining length first, so a failed read never
/// moves the position.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    /// Move to an absolute position at or before the end of the buffer.
    pub(crate) fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.buf.len());
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if n > available {
            return Err(CodecError::BufferUnderrun {
                offset: self.pos,
                needed: n,
                available,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?.get_u8())
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        Ok(self.take(2)?.get_u16())
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        Ok(self.take(4)?.get_u32())
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32> {
        Ok(self.take(4)?.get_i32())
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64> {
        Ok(self.take(8)?.get_f64())
    }

    /// Read a bool payload, which must be `0x00` or `0x01`.
    pub(crate) fn read_bool(&mut self) -> Result<bool> {
        let offset = self.pos;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            byte => {
                self.pos = offset;
                Err(CodecError::InvalidBool { byte, offset })
            }
        }
    }

    /// Read `len` bytes of UTF-8.
    pub(crate) fn read_str(&mut self, len: usize) -> Result<&'a str> {
        let mut ahead = *self;
        let bytes = ahead.take(len)?;
        let text = std::str::from_utf8(bytes)
            .map_err(|_| CodecError::InvalidUtf8 { offset: self.pos })?;
        *self = ahead;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian() {
        let bytes = [0x01, 0x02, 0x00, 0x00, 0x00, 0x03, 0xFF, 0xFF, 0xFF, 0xFE];
        let mut cur = Cursor::new(&bytes);
        assert_eq!(cur.read_u16().unwrap(), 0x0102);
        assert_eq!(cur.read_u32().unwrap(), 3);
        assert_eq!(cur.read_i32().unwrap(), -2);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn underrun_does_not_advance() {
        let bytes = [0x00, 0x01];
        let mut cur = Cursor::new(&bytes);
        cur.read_u8().unwrap();
        let err = cur.read_u32().unwrap_err();
        assert_eq!(
            err,
            CodecError::BufferUnderrun {
                offset: 1,
                needed: 4,
                available: 1
            }
        );
        assert_eq!(cur.position(), 1);
    }

    #[test]
    fn invalid_utf8_reports_offset() {
        let bytes = [0x41, 0xC3, 0x28];
        let mut cur = Cursor::new(&bytes);
        cur.read_u8().unwrap();
        assert_eq!(
            cur.read_str(2).unwrap_err(),
            CodecError::InvalidUtf8 { offset: 1 }
        );
        assert_eq!(cur.position(), 1);
    }

    #[test]
    fn bool_payload_must_be_canonical() {
        let bytes = [0x00, 0x01, 0x02];
        let mut cur = Cursor::new(&bytes);
        assert!(!cur.read_bool().unwrap());
        assert!(cur.read_bool().unwrap());
        assert_eq!(
            cur.read_bool().unwrap_err(),
            CodecError::InvalidBool {
                byte: 0x02,
                offset: 2
            }
        );
        assert_eq!(cur.position(), 2);
    }

    #[test]
    fn seek_clamps_to_end() {
        let bytes = [0u8; 4];
        let mut cur = Cursor::new(&bytes);
        cur.seek(10);
        assert_eq!(cur.position(), 4);
        assert_eq!(cur.len(), 4);
    }
}
