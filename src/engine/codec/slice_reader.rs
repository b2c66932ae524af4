use crate::engine::errors::{ExchangeError, Result};

pub const SIZE_U32: usize = 4;
pub const SIZE_U64: usize = 8;

/// Little-endian cursor over a received message. Running short is a format error.
pub struct LeSliceReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> LeSliceReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn has_bytes(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if !self.has_bytes(n) {
            return Err(ExchangeError::format(format!(
                "message truncated: needed {n} bytes at offset {}, {} left",
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; SIZE_U32];
        raw.copy_from_slice(self.read_bytes(SIZE_U32)?);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut raw = [0u8; SIZE_U32];
        raw.copy_from_slice(self.read_bytes(SIZE_U32)?);
        Ok(i32::from_le_bytes(raw))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let mut raw = [0u8; SIZE_U64];
        raw.copy_from_slice(self.read_bytes(SIZE_U64)?);
        Ok(i64::from_le_bytes(raw))
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos.min(self.buf.len())..];
        self.pos = self.buf.len();
        rest
    }
}
