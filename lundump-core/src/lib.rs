//! Reader for Lua 5.1 precompiled chunks.
//!
//! A chunk is a 12-byte header followed by the main function prototype. The
//! header announces the byte order and the widths of `int`, `size_t` and
//! `lua_Number`; every later field is decoded with those parameters. Function
//! prototypes nest, so the reader is recursive, with a depth ceiling taken from
//! [`DecodeOptions`].
//!
//! ```no_run
//! use lundump_core::{read_chunk, DecodeOptions};
//!
//! let file = std::fs::File::open("luac.out")?;
//! let chunk = read_chunk(std::io::BufReader::new(file), &DecodeOptions::luac())?;
//! println!("{} instructions", chunk.main.code.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod chunk;
pub mod constant;
pub mod debug;
pub mod error;
pub mod function;
pub mod header;
pub mod instruction;
pub mod primitive;
pub mod string;

#[cfg(test)]
mod test_util;

pub use chunk::{read_chunk, Chunk, DecodeOptions, DEFAULT_MAX_DEPTH};
pub use constant::{read_constant, read_constant_list, Constant, Number, RawNumber};
pub use debug::{read_debug_info, DebugInfo, LocalVar};
pub use error::{Error, ErrorKind, Result};
pub use function::{read_function_prototype, FunctionPrototype};
pub use header::{read_header, Endianness, Header, NumberFormat};
pub use instruction::{read_instruction, read_instruction_list};
pub use primitive::{read_int, read_uint, ChunkSource};
pub use string::{read_string, LuaString};
