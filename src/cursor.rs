//! Byte-stream cursor: a borrowed, bounds-checked read pointer over the
//! input buffer, with endian-normalized 16-bit reads. Generalizes
//! `netvl-immeta`'s `BufRead`-based reads (`r.read_u16::<LittleEndian>()`,
//! `r.skip_exact(n)`) onto a plain slice, since the frame-loop controller
//! needs to restart the walk from byte zero for its two decode passes
//! rather than consume a single forward-only `Read`.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{unexpected_eof, Error, Result};

/// A read-only cursor over a borrowed byte slice.
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the buffer, for handing a raw view to a sink
    /// (e.g. the application-metadata sink).
    #[inline]
    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| unexpected_eof!())?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        if self.remaining() < 2 {
            return Err(unexpected_eof!());
        }
        let v = LittleEndian::read_u16(&self.data[self.pos..self.pos + 2]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(unexpected_eof!());
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Advances by `n` bytes, clamping (and reporting exhaustion) if the
    /// buffer runs out first.
    pub fn advance(&mut self, n: usize) -> Result<()> {
        if self.remaining() < n {
            self.pos = self.data.len();
            return Err(unexpected_eof!());
        }
        self.pos += n;
        Ok(())
    }
}
