//! Fixed- and declared-width integer reads.
//!
//! Every read in the crate goes through [`ChunkSource`], which wraps any
//! [`Read`] and keeps track of the byte offset for diagnostics.

use std::io::{self, Read};

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::header::Endianness;

/// Widest integer field the decoder accepts.
pub const MAX_FIELD_WIDTH: u8 = 8;

/// A byte stream positioned somewhere inside a chunk.
#[derive(Debug)]
pub struct ChunkSource<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> ChunkSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Number of bytes consumed so far.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Fill as much of `buf` as the stream allows, returning the count.
    /// Only a genuine end of stream stops early.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }

    /// Read exactly `buf.len()` bytes or fail with [`Error::ShortRead`].
    pub fn read_exact_block(&mut self, buf: &mut [u8], what: &'static str) -> Result<()> {
        let start = self.offset;
        let n = self.fill(buf)?;
        if n < buf.len() {
            return Err(Error::ShortRead {
                what,
                offset: start,
                expected: buf.len() as u64,
                actual: n as u64,
            });
        }
        Ok(())
    }

    /// Read exactly `len` bytes into a new vector.
    ///
    /// The vector grows with the data actually present, so a huge declared
    /// length on a truncated stream fails with a short read instead of
    /// allocating the declared size up front.
    pub fn read_vec(&mut self, len: u64, what: &'static str) -> Result<Vec<u8>> {
        let start = self.offset;
        let mut buf = Vec::with_capacity(len.min(4096) as usize);
        let n = (&mut self.inner).take(len).read_to_end(&mut buf)?;
        self.offset += n as u64;
        if (buf.len() as u64) < len {
            return Err(Error::ShortRead {
                what,
                offset: start,
                expected: len,
                actual: buf.len() as u64,
            });
        }
        Ok(buf)
    }

    pub fn read_u8(&mut self, what: &'static str) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_exact_block(&mut b, what)?;
        Ok(b[0])
    }

    /// True if the stream has no more bytes. Consumes one byte if it does.
    pub(crate) fn at_eof(&mut self) -> Result<bool> {
        let mut b = [0u8; 1];
        Ok(self.fill(&mut b)? == 0)
    }
}

fn check_width(width: u8) -> Result<usize> {
    if width == 0 || width > MAX_FIELD_WIDTH {
        return Err(Error::UnsupportedDeclaration {
            field: "integer field width",
            value: width as u64,
        });
    }
    Ok(width as usize)
}

fn read_field<R: Read>(
    src: &mut ChunkSource<R>,
    width: u8,
    what: &'static str,
) -> Result<([u8; 8], usize)> {
    let width = check_width(width)?;
    let mut buf = [0u8; 8];
    src.read_exact_block(&mut buf[..width], what)?;
    Ok((buf, width))
}

/// Read an unsigned integer of `width` bytes in the given byte order.
pub fn read_uint<R: Read>(
    src: &mut ChunkSource<R>,
    width: u8,
    endianness: Endianness,
) -> Result<u64> {
    let (buf, n) = read_field(src, width, "unsigned integer")?;
    let v = match endianness {
        Endianness::Little => LittleEndian::read_uint(&buf[..n], n),
        Endianness::Big => BigEndian::read_uint(&buf[..n], n),
    };
    log::trace!("read_uint width={} {:?} -> {:#X}", n, endianness, v);
    Ok(v)
}

/// Read a two's complement integer of `width` bytes, sign-extended to 64 bits.
pub fn read_int<R: Read>(
    src: &mut ChunkSource<R>,
    width: u8,
    endianness: Endianness,
) -> Result<i64> {
    let (buf, n) = read_field(src, width, "signed integer")?;
    let v = match endianness {
        Endianness::Little => LittleEndian::read_int(&buf[..n], n),
        Endianness::Big => BigEndian::read_int(&buf[..n], n),
    };
    log::trace!("read_int width={} {:?} -> {}", n, endianness, v);
    Ok(v)
}

/// Turn a declared element count into a length, rejecting negative values.
pub(crate) fn count_from(declared: i64, offset: u64, what: &str) -> Result<usize> {
    usize::try_from(declared)
        .map_err(|_| Error::invalid(offset, format!("negative {} count: {}", what, declared)))
}
