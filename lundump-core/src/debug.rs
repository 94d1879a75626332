//! Debug lists that `luac` appends after each prototype's children.
//!
//! A stripped chunk still carries the three counts, all zero.

use std::io::Read;

use crate::error::{Result, ResultExt};
use crate::header::Header;
use crate::instruction::PREALLOC_LIMIT;
use crate::primitive::{count_from, read_int, ChunkSource};
use crate::string::{read_string, LuaString};

/// A local variable and the pc range where it is live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalVar {
    pub name: LuaString,
    pub start_pc: i64,
    pub end_pc: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DebugInfo {
    /// Source line of each instruction.
    pub line_info: Vec<i64>,
    pub locals: Vec<LocalVar>,
    pub upvalue_names: Vec<LuaString>,
}

impl DebugInfo {
    pub fn is_stripped(&self) -> bool {
        self.line_info.is_empty() && self.locals.is_empty() && self.upvalue_names.is_empty()
    }
}

fn read_count<R: Read>(src: &mut ChunkSource<R>, header: &Header, what: &str) -> Result<usize> {
    let at = src.offset();
    let declared = read_int(src, header.int_size, header.endianness)?;
    count_from(declared, at, what)
}

pub fn read_debug_info<R: Read>(src: &mut ChunkSource<R>, header: &Header) -> Result<DebugInfo> {
    let n = read_count(src, header, "line info").step("line info count")?;
    let mut line_info = Vec::with_capacity(n.min(PREALLOC_LIMIT));
    for i in 0..n {
        let line = read_int(src, header.int_size, header.endianness)
            .with_step(|| format!("line info[{}]", i))?;
        line_info.push(line);
    }

    let n = read_count(src, header, "local").step("local count")?;
    let mut locals = Vec::with_capacity(n.min(PREALLOC_LIMIT));
    for i in 0..n {
        let local = read_local(src, header).with_step(|| format!("local[{}]", i))?;
        locals.push(local);
    }

    let n = read_count(src, header, "upvalue name").step("upvalue name count")?;
    let mut upvalue_names = Vec::with_capacity(n.min(PREALLOC_LIMIT));
    for i in 0..n {
        let name = read_string(src, header).with_step(|| format!("upvalue name[{}]", i))?;
        upvalue_names.push(name);
    }

    Ok(DebugInfo {
        line_info,
        locals,
        upvalue_names,
    })
}

fn read_local<R: Read>(src: &mut ChunkSource<R>, header: &Header) -> Result<LocalVar> {
    let name = read_string(src, header).step("name")?;
    let start_pc = read_int(src, header.int_size, header.endianness).step("start pc")?;
    let end_pc = read_int(src, header.int_size, header.endianness).step("end pc")?;
    Ok(LocalVar {
        name,
        start_pc,
        end_pc,
    })
}
