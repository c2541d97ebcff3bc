//! Bounds-checked little/big-endian reader over a byte slice.
//!
//! Every chunked stream in the source formats is walked through a [`Cursor`]
//! so malformed input turns into a [`DecodeError`] instead of an
//! out-of-bounds read.

use crate::error::{DecodeError, DecodeResult};

/// Byte order of the values being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// A forward-only reader over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> Cursor<'a> {
    /// Create a little-endian cursor at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            endian: Endian::Little,
        }
    }

    /// Create a cursor positioned at `offset`.
    pub fn at(data: &'a [u8], offset: usize) -> DecodeResult<Self> {
        let mut cursor = Self::new(data);
        cursor.seek(offset)?;
        Ok(cursor)
    }

    /// Switch the byte order used by subsequent reads.
    #[must_use]
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Move to an absolute offset. Seeking to exactly the end is allowed.
    pub fn seek(&mut self, offset: usize) -> DecodeResult<()> {
        if offset > self.data.len() {
            return Err(DecodeError::UnexpectedEof {
                offset,
                needed: 0,
                len: self.data.len(),
            });
        }
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> DecodeResult<()> {
        self.take(count).map(|_| ())
    }

    /// Borrow the next `count` bytes and advance past them.
    pub fn take(&mut self, count: usize) -> DecodeResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or(DecodeError::UnexpectedEof {
                offset: self.pos,
                needed: count,
                len: self.data.len(),
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        let bytes = self.array()?;
        Ok(match self.endian {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        })
    }

    pub fn read_i16(&mut self) -> DecodeResult<i16> {
        let bytes = self.array()?;
        Ok(match self.endian {
            Endian::Little => i16::from_le_bytes(bytes),
            Endian::Big => i16::from_be_bytes(bytes),
        })
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        let bytes = self.array()?;
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        })
    }

    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        let bytes = self.array()?;
        Ok(match self.endian {
            Endian::Little => i32::from_le_bytes(bytes),
            Endian::Big => i32::from_be_bytes(bytes),
        })
    }

    pub fn read_u64(&mut self) -> DecodeResult<u64> {
        let bytes = self.array()?;
        Ok(match self.endian {
            Endian::Little => u64::from_le_bytes(bytes),
            Endian::Big => u64::from_be_bytes(bytes),
        })
    }

    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        self.read_u32().map(f32::from_bits)
    }

    pub fn read_vec3(&mut self) -> DecodeResult<glam::Vec3> {
        Ok(glam::Vec3::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_and_big_endian() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut le = Cursor::new(&data);
        assert_eq!(le.read_u16().unwrap(), 0x0201);
        assert_eq!(le.read_u16().unwrap(), 0x0403);

        let mut be = Cursor::new(&data).with_endian(Endian::Big);
        assert_eq!(be.read_u32().unwrap(), 0x0102_0304);
        assert!(be.is_empty());
    }

    #[test]
    fn short_read_is_an_error() {
        let data = [0xFF; 3];
        let mut cursor = Cursor::new(&data);
        assert_eq!(
            cursor.read_u32(),
            Err(DecodeError::UnexpectedEof {
                offset: 0,
                needed: 4,
                len: 3
            })
        );
        // A failed read does not advance.
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_u16().unwrap(), 0xFFFF);
    }

    #[test]
    fn seek_past_end_fails() {
        let data = [0u8; 8];
        assert!(Cursor::at(&data, 8).is_ok());
        assert!(Cursor::at(&data, 9).is_err());
    }
}
