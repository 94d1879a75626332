//! Constant pool entries.

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result, ResultExt};
use crate::header::{Header, NumberFormat};
use crate::instruction::PREALLOC_LIMIT;
use crate::primitive::{count_from, read_int, read_uint, ChunkSource, MAX_FIELD_WIDTH};
use crate::string::{read_string, LuaString};

pub const TAG_NIL: u8 = 0;
pub const TAG_BOOLEAN: u8 = 1;
pub const TAG_NUMBER: u8 = 3;
pub const TAG_STRING: u8 = 4;

/// Undecoded `lua_Number` bits, as wide as the header declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawNumber {
    pub bits: u64,
    pub width: u8,
}

/// A `lua_Number` interpreted according to the header's number format.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Float(f64),
    Integer(i64),
}

impl RawNumber {
    pub fn interpret(&self, header: &Header) -> Result<Number> {
        match header.number_format {
            NumberFormat::Float => match self.width {
                4 => Ok(Number::Float(f32::from_bits(self.bits as u32) as f64)),
                8 => Ok(Number::Float(f64::from_bits(self.bits))),
                w => Err(Error::UnsupportedDeclaration {
                    field: "floating-point lua_Number size",
                    value: w as u64,
                }),
            },
            NumberFormat::Integral => {
                if self.width == 0 || self.width > MAX_FIELD_WIDTH {
                    return Err(Error::UnsupportedDeclaration {
                        field: "integral lua_Number size",
                        value: self.width as u64,
                    });
                }
                let n = self.width as usize;
                // bits are already in host order; re-extend the sign from the declared width
                let bytes = self.bits.to_le_bytes();
                Ok(Number::Integer(LittleEndian::read_int(&bytes[..n], n)))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Nil,
    /// Raw flag byte. `luac` writes 0 or 1, but any value is structurally valid.
    Boolean(u8),
    Number(RawNumber),
    String(LuaString),
}

impl Constant {
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Nil => TAG_NIL,
            Constant::Boolean(_) => TAG_BOOLEAN,
            Constant::Number(_) => TAG_NUMBER,
            Constant::String(_) => TAG_STRING,
        }
    }

    /// False for a boolean whose flag byte is neither 0 nor 1.
    pub fn is_strict_boolean(&self) -> bool {
        !matches!(self, Constant::Boolean(b) if *b > 1)
    }
}

pub fn read_constant<R: Read>(src: &mut ChunkSource<R>, header: &Header) -> Result<Constant> {
    let at = src.offset();
    let tag = src.read_u8("constant tag")?;
    match tag {
        TAG_NIL => Ok(Constant::Nil),
        TAG_BOOLEAN => {
            let b = src.read_u8("boolean constant")?;
            if b > 1 {
                log::warn!("boolean constant at offset 0x{:X} has flag byte {}", at, b);
            }
            Ok(Constant::Boolean(b))
        }
        TAG_NUMBER => {
            let bits =
                read_uint(src, header.number_size, header.endianness).step("number constant")?;
            Ok(Constant::Number(RawNumber {
                bits,
                width: header.number_size,
            }))
        }
        TAG_STRING => Ok(Constant::String(read_string(src, header).step("string constant")?)),
        other => Err(Error::invalid(at, format!("unknown constant type tag {}", other))),
    }
}

pub fn read_constant_list<R: Read>(
    src: &mut ChunkSource<R>,
    header: &Header,
) -> Result<Vec<Constant>> {
    let at = src.offset();
    let declared = read_int(src, header.int_size, header.endianness).step("constant count")?;
    let count = count_from(declared, at, "constant")?;

    let mut constants = Vec::with_capacity(count.min(PREALLOC_LIMIT));
    for i in 0..count {
        let k = read_constant(src, header).with_step(|| format!("constant[{}]", i))?;
        constants.push(k);
    }
    Ok(constants)
}
