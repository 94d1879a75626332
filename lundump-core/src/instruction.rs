use std::io::Read;

use crate::error::{Result, ResultExt};
use crate::header::{Header, INSTRUCTION_SIZE};
use crate::primitive::{count_from, read_int, read_uint, ChunkSource};

/// Upper bound on speculative pre-allocation for declared list lengths.
pub(crate) const PREALLOC_LIMIT: usize = 1024;

/// Read one 32-bit instruction word.
pub fn read_instruction<R: Read>(src: &mut ChunkSource<R>, header: &Header) -> Result<u32> {
    let word = read_uint(src, INSTRUCTION_SIZE, header.endianness)?;
    Ok(word as u32)
}

/// Read an `int`-prefixed list of instruction words, in program order.
pub fn read_instruction_list<R: Read>(
    src: &mut ChunkSource<R>,
    header: &Header,
) -> Result<Vec<u32>> {
    let at = src.offset();
    let declared = read_int(src, header.int_size, header.endianness).step("instruction count")?;
    let count = count_from(declared, at, "instruction")?;

    let mut code = Vec::with_capacity(count.min(PREALLOC_LIMIT));
    for i in 0..count {
        let word = read_instruction(src, header).with_step(|| format!("instruction[{}]", i))?;
        code.push(word);
    }
    Ok(code)
}
