//! A minimal big-endian byte cursor over an immutable slice, used only by
//! the segment parser to walk marker/length/payload structure. Distinct
//! from `BitReader`: this operates byte-at-a-time on segment framing, never
//! on the entropy-coded bitstream itself.

use crate::error::JpegError;

pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos:  usize
}

impl<'a> ByteCursor<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, JpegError> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or(JpegError::UnexpectedEof { context: "reading a byte" })?;
        self.pos += 1;
        Ok(b)
    }

    /// Step back one byte. Used by the ECS collector to un-consume a marker
    /// byte once it determines the `0xFF` it just read terminates the scan
    /// rather than being stuffed.
    pub fn unread_u8(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    pub fn read_u16_be(&mut self) -> Result<u16, JpegError> {
        let hi = self.read_u8()?;
        let lo = self.read_u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], JpegError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&e| e <= self.data.len())
            .ok_or(JpegError::UnexpectedEof { context: "reading a segment payload" })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}
