use crate::{ErrorCode, MsgPackError};

/// Bounds-checked read cursor over an immutable input buffer.
///
/// Every read either returns exactly the requested bytes or fails with `UnexpectedEof` at the
/// offset where the read started; the position never moves past the end.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn peek_u8(&self) -> Result<u8, MsgPackError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| MsgPackError::new(ErrorCode::UnexpectedEof, self.pos))
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, MsgPackError> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], MsgPackError> {
        let off = self.pos;
        let end = off
            .checked_add(n)
            .ok_or_else(|| MsgPackError::new(ErrorCode::LengthOverflow, off))?;
        if end > self.data.len() {
            return Err(MsgPackError::new(ErrorCode::UnexpectedEof, off));
        }
        let s = &self.data[off..end];
        self.pos = end;
        Ok(s)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], MsgPackError> {
        let s = self.read_exact(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(s);
        Ok(out)
    }

    #[inline]
    pub fn read_be_u16(&mut self) -> Result<u16, MsgPackError> {
        self.read_array().map(u16::from_be_bytes)
    }

    #[inline]
    pub fn read_be_u32(&mut self) -> Result<u32, MsgPackError> {
        self.read_array().map(u32::from_be_bytes)
    }

    #[inline]
    pub fn read_be_u64(&mut self) -> Result<u64, MsgPackError> {
        self.read_array().map(u64::from_be_bytes)
    }

    /// Read a big-endian unsigned length field of `width` bytes (1, 2 or 4).
    pub fn read_len(&mut self, width: u8) -> Result<usize, MsgPackError> {
        let off = self.pos;
        let len = match width {
            1 => u32::from(self.read_u8()?),
            2 => u32::from(self.read_be_u16()?),
            4 => self.read_be_u32()?,
            _ => return Err(MsgPackError::new(ErrorCode::InvalidFormat, off)),
        };
        usize::try_from(len).map_err(|_| MsgPackError::new(ErrorCode::LengthOverflow, off))
    }
}
