use std::fmt;
use std::io::Read;

use crate::error::{Error, Result, ResultExt};
use crate::header::Header;
use crate::primitive::{read_uint, ChunkSource};

/// A length-prefixed string as stored in the chunk.
///
/// The payload keeps the trailing NUL; an empty payload is the "absent"
/// string (declared length 0) that nested prototypes use for their name.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct LuaString {
    raw: Vec<u8>,
}

impl LuaString {
    /// Build from a raw payload. The payload must be empty or end with NUL.
    pub fn from_raw(raw: Vec<u8>) -> Option<Self> {
        match raw.last() {
            None | Some(0) => Some(Self { raw }),
            Some(_) => None,
        }
    }

    /// Payload including the trailing NUL.
    #[inline]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Logical text, without the trailing NUL.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self.raw.split_last() {
            Some((_, body)) => body,
            None => &self.raw,
        }
    }

    /// Declared length as it appears in the size field.
    #[inline]
    pub fn declared_len(&self) -> u64 {
        self.raw.len() as u64
    }

    /// True for the zero-length "absent" string.
    #[inline]
    pub fn is_absent(&self) -> bool {
        self.raw.is_empty()
    }
}

impl fmt::Debug for LuaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_absent() {
            return f.write_str("<absent>");
        }
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}

/// Read a `size_t`-prefixed, NUL-terminated string.
pub fn read_string<R: Read>(src: &mut ChunkSource<R>, header: &Header) -> Result<LuaString> {
    let size = read_uint(src, header.size_t_size, header.endianness).step("string size")?;
    if size == 0 {
        return Ok(LuaString::default());
    }

    let start = src.offset();
    let raw = src.read_vec(size, "string payload").step("string payload")?;

    let last = raw[raw.len() - 1];
    if last != 0 {
        return Err(Error::invalid(
            start + size - 1,
            format!("string is not NUL-terminated: last byte is 0x{:02X}", last),
        ));
    }

    Ok(LuaString { raw })
}
