//! A primitive reader over a borrowed, fully-buffered byte slice.
//!
//! Unlike the lineage's `Read`-generic basic decoders (one struct per
//! endianness), this is a single type parameterized by [`Endianness`] at
//! construction, since the parser always has the whole input available up
//! front and never needs to work against a streaming source.

use byteordered::byteorder::{BigEndian, ByteOrder, LittleEndian};
pub use byteordered::Endianness;
use dcmk_core::Tag;
use snafu::{ensure, Snafu};

/// Error produced when a read runs past the end of the buffer.
#[derive(Debug, Snafu, PartialEq, Eq, Clone, Copy)]
#[snafu(display("unexpected end of input: need {needed} more byte(s), {available} available"))]
pub struct UnexpectedEof {
    pub needed: usize,
    pub available: usize,
}

pub type Result<T, E = UnexpectedEof> = std::result::Result<T, E>;

/// A cursor over a borrowed byte slice, decoding binary primitives
/// according to a fixed [`Endianness`].
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
    endianness: Endianness,
}

macro_rules! read_primitive {
    ($name:ident, $ty:ty, $width:literal, $read_le:path, $read_be:path) => {
        /// Read and advance past a single
        #[doc = stringify!($ty)]
        /// value.
        pub fn $name(&mut self) -> Result<$ty> {
            let b = self.take($width)?;
            Ok(match self.endianness {
                Endianness::Little => $read_le(b),
                Endianness::Big => $read_be(b),
            })
        }
    };
}

impl<'a> ByteReader<'a> {
    /// Wrap a buffer for decoding in the given byte order.
    pub fn new(buf: &'a [u8], endianness: Endianness) -> Self {
        ByteReader { buf, pos: 0, endianness }
    }

    /// The byte order this reader was constructed with.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The current offset into the wrapped buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The number of unread bytes left in the buffer.
    pub fn bytes_left(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// The unread tail of the buffer, without consuming it.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        ensure!(self.bytes_left() >= n, UnexpectedEofSnafu { needed: n, available: self.bytes_left() });
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read `n` raw bytes, advancing the cursor.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Advance the cursor by `n` bytes without interpreting them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    read_primitive!(read_u16, u16, 2, LittleEndian::read_u16, BigEndian::read_u16);
    read_primitive!(read_u32, u32, 4, LittleEndian::read_u32, BigEndian::read_u32);
    read_primitive!(read_u64, u64, 8, LittleEndian::read_u64, BigEndian::read_u64);
    read_primitive!(read_i16, i16, 2, LittleEndian::read_i16, BigEndian::read_i16);
    read_primitive!(read_i32, i32, 4, LittleEndian::read_i32, BigEndian::read_i32);
    read_primitive!(read_i64, i64, 8, LittleEndian::read_i64, BigEndian::read_i64);
    read_primitive!(read_f32, f32, 4, LittleEndian::read_f32, BigEndian::read_f32);
    read_primitive!(read_f64, f64, 8, LittleEndian::read_f64, BigEndian::read_f64);

    /// Read a tag as a pair of `u16`s (group, element).
    pub fn read_tag(&mut self) -> Result<Tag> {
        let group = self.read_u16()?;
        let element = self.read_u16()?;
        Ok(Tag(group, element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_primitives() {
        let buf = [0x10, 0x00, 0x02, 0x00, 0x00, 0x00];
        let mut r = ByteReader::new(&buf, Endianness::Little);
        assert_eq!(r.read_u16().unwrap(), 0x0010);
        assert_eq!(r.read_u32().unwrap(), 0x0002);
    }

    #[test]
    fn reads_big_endian_tag() {
        let buf = [0x00, 0x08, 0x00, 0x10];
        let mut r = ByteReader::new(&buf, Endianness::Big);
        assert_eq!(r.read_tag().unwrap(), Tag(0x0008, 0x0010));
    }

    #[test]
    fn reports_unexpected_eof() {
        let buf = [0x01];
        let mut r = ByteReader::new(&buf, Endianness::Little);
        assert!(r.read_u16().is_err());
    }
}
