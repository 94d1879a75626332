//! The fixed 12-byte chunk header.
//!
//! Layout:
//! - 0x00: signature `ESC 'L' 'u' 'a'`
//! - 0x04: version (`0x51` for Lua 5.1)
//! - 0x05: format (0 = official)
//! - 0x06: endianness (0 = big, 1 = little)
//! - 0x07: size of `int`
//! - 0x08: size of `size_t`
//! - 0x09: size of `Instruction` (always 4)
//! - 0x0A: size of `lua_Number`
//! - 0x0B: integral flag (0 = floating point, 1 = integral)
//!
//! The header's own fields are single bytes; it is this structure that
//! announces the widths used by everything after it.

use std::fmt;
use std::io::Read;

use crate::error::{Error, Result};
use crate::primitive::{ChunkSource, MAX_FIELD_WIDTH};

pub const HEADER_SIZE: usize = 12;
pub const SIGNATURE: [u8; 4] = *b"\x1bLua";
pub const VERSION: u8 = 0x51;
pub const FORMAT_OFFICIAL: u8 = 0;
pub const INSTRUCTION_SIZE: u8 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Endianness::Big),
            1 => Some(Endianness::Little),
            _ => None,
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            Endianness::Big => 0,
            Endianness::Little => 1,
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Big => f.write_str("big endian"),
            Endianness::Little => f.write_str("little endian"),
        }
    }
}

/// How `lua_Number` constants are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumberFormat {
    Float,
    Integral,
}

impl NumberFormat {
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(NumberFormat::Float),
            1 => Some(NumberFormat::Integral),
            _ => None,
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            NumberFormat::Float => 0,
            NumberFormat::Integral => 1,
        }
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberFormat::Float => f.write_str("floating-point"),
            NumberFormat::Integral => f.write_str("integral"),
        }
    }
}

/// Validated chunk header. Immutable; every later decode step borrows it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Header {
    pub signature: [u8; 4],
    pub version: u8,
    pub format: u8,
    pub endianness: Endianness,
    pub int_size: u8,
    pub size_t_size: u8,
    pub instruction_size: u8,
    pub number_size: u8,
    pub number_format: NumberFormat,
}

impl Header {
    /// The header `luac` writes on a typical 32-bit little-endian build.
    pub fn native() -> Self {
        Self {
            signature: SIGNATURE,
            version: VERSION,
            format: FORMAT_OFFICIAL,
            endianness: Endianness::Little,
            int_size: 4,
            size_t_size: 4,
            instruction_size: INSTRUCTION_SIZE,
            number_size: 8,
            number_format: NumberFormat::Float,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut b = [0u8; HEADER_SIZE];
        b[..4].copy_from_slice(&self.signature);
        b[4] = self.version;
        b[5] = self.format;
        b[6] = self.endianness.flag();
        b[7] = self.int_size;
        b[8] = self.size_t_size;
        b[9] = self.instruction_size;
        b[10] = self.number_size;
        b[11] = self.number_format.flag();
        b
    }

    /// Validate raw header bytes. Fields are checked in stream order and the
    /// first violation is reported.
    pub fn parse(b: &[u8; HEADER_SIZE]) -> Result<Self> {
        if b[..4] != SIGNATURE {
            return Err(Error::invalid(
                0,
                format!(
                    "invalid signature: got {:02x?}, expected {:02x?}",
                    &b[..4],
                    SIGNATURE
                ),
            ));
        }

        if b[4] != VERSION {
            return Err(Error::invalid(
                4,
                format!(
                    "unsupported version: got 0x{:02X}, expected 0x{:02X} (Lua 5.1)",
                    b[4], VERSION
                ),
            ));
        }

        if b[5] != FORMAT_OFFICIAL {
            return Err(Error::invalid(
                5,
                format!(
                    "unsupported format: got {}, expected {} (official)",
                    b[5], FORMAT_OFFICIAL
                ),
            ));
        }

        let endianness = Endianness::from_flag(b[6]).ok_or_else(|| {
            Error::invalid(
                6,
                format!("invalid endianness flag: got {}, expected 0 (big) or 1 (little)", b[6]),
            )
        })?;

        let int_size = check_width("int size", b[7])?;
        let size_t_size = check_width("size_t size", b[8])?;

        if b[9] != INSTRUCTION_SIZE {
            return Err(Error::invalid(
                9,
                format!(
                    "unsupported instruction size: got {}, expected {}",
                    b[9], INSTRUCTION_SIZE
                ),
            ));
        }

        let number_size = check_width("lua_Number size", b[10])?;

        let number_format = NumberFormat::from_flag(b[11]).ok_or_else(|| {
            Error::invalid(
                11,
                format!("invalid integral flag: got {}, expected 0 (float) or 1 (integral)", b[11]),
            )
        })?;

        Ok(Self {
            signature: SIGNATURE,
            version: VERSION,
            format: FORMAT_OFFICIAL,
            endianness,
            int_size,
            size_t_size,
            instruction_size: INSTRUCTION_SIZE,
            number_size,
            number_format,
        })
    }
}

/// Declared widths must be 1..=8 bytes; a zero width is rejected as well.
fn check_width(field: &'static str, width: u8) -> Result<u8> {
    if width == 0 || width > MAX_FIELD_WIDTH {
        return Err(Error::UnsupportedDeclaration {
            field,
            value: width as u64,
        });
    }
    Ok(width)
}

/// Read and validate the header. Nothing is returned unless all twelve
/// bytes are present and valid.
pub fn read_header<R: Read>(src: &mut ChunkSource<R>) -> Result<Header> {
    let mut b = [0u8; HEADER_SIZE];
    src.read_exact_block(&mut b, "chunk header")?;
    let header = Header::parse(&b)?;
    log::debug!(
        "chunk header: {}, int={} size_t={} number={} ({})",
        header.endianness,
        header.int_size,
        header.size_t_size,
        header.number_size,
        header.number_format
    );
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn parse(bytes: &[u8]) -> Result<Header> {
        read_header(&mut ChunkSource::new(bytes))
    }

    #[test]
    fn native_header_bytes() {
        let bytes = hex::decode("1b4c7561510001040404080000").unwrap();
        // one trailing byte past the header must stay unread
        let mut src = ChunkSource::new(&bytes[..]);
        let header = read_header(&mut src).unwrap();
        assert_eq!(header, Header::native());
        assert_eq!(src.offset(), HEADER_SIZE as u64);
    }

    #[test]
    fn round_trips_every_valid_shape() {
        for endianness in [Endianness::Big, Endianness::Little] {
            for number_format in [NumberFormat::Float, NumberFormat::Integral] {
                for width in 1..=8u8 {
                    let header = Header {
                        endianness,
                        number_format,
                        int_size: width,
                        size_t_size: 9 - width,
                        number_size: width,
                        ..Header::native()
                    };
                    assert_eq!(parse(&header.encode()).unwrap(), header);
                }
            }
        }
    }

    #[test]
    fn short_header() {
        let bytes = Header::native().encode();
        let err = parse(&bytes[..11]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShortRead);
    }

    #[test]
    fn each_field_is_validated() {
        let cases: [(usize, u8, ErrorKind); 9] = [
            (0, b'X', ErrorKind::InvalidFormat),
            (4, 0x52, ErrorKind::InvalidFormat),
            (5, 1, ErrorKind::InvalidFormat),
            (6, 2, ErrorKind::InvalidFormat),
            (7, 9, ErrorKind::UnsupportedDeclaration),
            (8, 0, ErrorKind::UnsupportedDeclaration),
            (9, 8, ErrorKind::InvalidFormat),
            (10, 16, ErrorKind::UnsupportedDeclaration),
            (11, 2, ErrorKind::InvalidFormat),
        ];
        for (idx, value, kind) in cases {
            let mut bytes = Header::native().encode();
            bytes[idx] = value;
            let err = parse(&bytes).unwrap_err();
            assert_eq!(err.kind(), kind, "byte {idx} = {value}");
        }
    }

    #[test]
    fn first_violation_wins() {
        let mut bytes = Header::native().encode();
        bytes[4] = 0x50;
        bytes[6] = 7;
        bytes[11] = 9;
        let err = parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported version"), "{err}");
    }
}
