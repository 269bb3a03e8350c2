//! Bounds-checked cursor for big-endian wire data.
//!
//! Every multi-byte field on the wire is big-endian (network byte order).
//! Reads never index past the end of the input; a short read reports how many
//! bytes the message needed in total and how many were actually present.

use crate::error::FrameError;

/// Forward-only reader over a borrowed byte buffer
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the buffer
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Check that `len` more bytes are available without consuming them
    pub fn require(&self, len: usize) -> Result<(), FrameError> {
        if len > self.remaining() {
            return Err(FrameError::Truncated {
                expected: self.pos.saturating_add(len),
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Borrow the next `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], FrameError> {
        self.require(len)?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8, FrameError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a big-endian `u16`
    pub fn read_u16(&mut self) -> Result<u16, FrameError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian `u32`
    pub fn read_u32(&mut self) -> Result<u32, FrameError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
