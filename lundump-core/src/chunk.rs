use std::io::Read;

use crate::error::{Error, Result, ResultExt};
use crate::function::{read_function_prototype, FunctionPrototype};
use crate::header::{read_header, Header};
use crate::primitive::ChunkSource;

/// Lua 5.1 refuses to nest functions deeper than `LUAI_MAXCCALLS`.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Knobs for decoding a chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Deepest allowed prototype nesting; the main function is at depth 0.
    pub max_depth: usize,
    /// Decode the line info, locals and upvalue name lists after each
    /// prototype's children.
    pub debug_info: bool,
    /// Fail if bytes remain after the main function.
    pub reject_trailing_bytes: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            debug_info: false,
            reject_trailing_bytes: false,
        }
    }
}

impl DecodeOptions {
    /// Options matching what `luac` writes: debug lists are always present,
    /// possibly empty.
    pub fn luac() -> Self {
        Self {
            debug_info: true,
            ..Default::default()
        }
    }
}

/// A fully decoded container.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub header: Header,
    pub main: FunctionPrototype,
}

impl Chunk {
    pub fn from_bytes(bytes: &[u8], options: &DecodeOptions) -> Result<Self> {
        read_chunk(bytes, options)
    }
}

/// Decode a whole chunk: header followed by the main function.
pub fn read_chunk<R: Read>(reader: R, options: &DecodeOptions) -> Result<Chunk> {
    let mut src = ChunkSource::new(reader);
    let header = read_header(&mut src).step("header")?;
    let main = read_function_prototype(&mut src, &header, options).step("main function")?;

    if options.reject_trailing_bytes && !src.at_eof()? {
        return Err(Error::invalid(
            src.offset() - 1,
            "trailing bytes after the main function",
        ));
    }

    log::debug!(
        "decoded chunk: {} prototypes, {} bytes",
        main.count(),
        src.offset()
    );
    Ok(Chunk { header, main })
}
