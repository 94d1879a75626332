use std::io::Read;

use crate::chunk::DecodeOptions;
use crate::constant::{read_constant_list, Constant};
use crate::debug::{read_debug_info, DebugInfo};
use crate::error::{Error, Result, ResultExt};
use crate::header::Header;
use crate::instruction::{read_instruction_list, PREALLOC_LIMIT};
use crate::primitive::{count_from, read_int, ChunkSource};
use crate::string::{read_string, LuaString};

/// `is_vararg` bits.
pub const VARARG_HASARG: u8 = 1;
pub const VARARG_ISVARARG: u8 = 2;
pub const VARARG_NEEDSARG: u8 = 4;

/// One compiled function, owning its code, constants and nested functions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionPrototype {
    /// Only the main function carries a name; nested ones have the absent string.
    pub source: LuaString,
    pub line_defined: i64,
    pub last_line_defined: i64,
    pub upvalue_count: u8,
    pub param_count: u8,
    pub is_vararg: u8,
    pub max_stack_size: u8,
    pub code: Vec<u32>,
    pub constants: Vec<Constant>,
    pub prototypes: Vec<FunctionPrototype>,
    /// Present when the chunk was decoded with debug lists enabled.
    pub debug: Option<DebugInfo>,
}

impl FunctionPrototype {
    /// Height of the prototype tree: 0 for a function with no children.
    pub fn depth(&self) -> usize {
        self.prototypes
            .iter()
            .map(|p| p.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Total number of prototypes in the tree, including this one.
    pub fn count(&self) -> usize {
        1 + self.prototypes.iter().map(FunctionPrototype::count).sum::<usize>()
    }

    pub fn is_vararg(&self) -> bool {
        self.is_vararg & VARARG_ISVARARG != 0
    }
}

/// Read a function prototype and, recursively, all of its children.
pub fn read_function_prototype<R: Read>(
    src: &mut ChunkSource<R>,
    header: &Header,
    options: &DecodeOptions,
) -> Result<FunctionPrototype> {
    read_function_at(src, header, options, 0)
}

fn read_function_at<R: Read>(
    src: &mut ChunkSource<R>,
    header: &Header,
    options: &DecodeOptions,
    depth: usize,
) -> Result<FunctionPrototype> {
    if depth > options.max_depth {
        return Err(Error::StructuralLimitExceeded {
            limit: options.max_depth,
        });
    }

    let start = src.offset();
    let source = read_string(src, header).step("source name")?;
    let line_defined = read_int(src, header.int_size, header.endianness).step("line defined")?;
    let last_line_defined =
        read_int(src, header.int_size, header.endianness).step("last line defined")?;

    let mut counts = [0u8; 4];
    src.read_exact_block(&mut counts, "function counts")
        .map_err(|e| match e {
            Error::ShortRead { offset, actual, .. } => Error::invalid(
                offset,
                format!(
                    "upvalue count, parameter count, vararg flags and stack size need 4 bytes, got {}",
                    actual
                ),
            ),
            other => other,
        })
        .step("function counts")?;
    let [upvalue_count, param_count, is_vararg, max_stack_size] = counts;

    let code = read_instruction_list(src, header).step("instruction list")?;
    let constants = read_constant_list(src, header).step("constant list")?;

    let at = src.offset();
    let declared = read_int(src, header.int_size, header.endianness).step("prototype count")?;
    let count = count_from(declared, at, "prototype").step("prototype count")?;
    let mut prototypes = Vec::with_capacity(count.min(PREALLOC_LIMIT));
    for i in 0..count {
        let child = read_function_at(src, header, options, depth + 1)
            .with_step(|| format!("prototype[{}]", i))?;
        prototypes.push(child);
    }

    let debug = if options.debug_info {
        Some(read_debug_info(src, header).step("debug info")?)
    } else {
        None
    };

    log::debug!(
        "function at 0x{:X} (depth {}): lines {}..{}, {} instructions, {} constants, {} children",
        start,
        depth,
        line_defined,
        last_line_defined,
        code.len(),
        constants.len(),
        prototypes.len()
    );

    Ok(FunctionPrototype {
        source,
        line_defined,
        last_line_defined,
        upvalue_count,
        param_count,
        is_vararg,
        max_stack_size,
        code,
        constants,
        prototypes,
        debug,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::RawNumber;
    use crate::error::ErrorKind;
    use crate::test_util::{nested, ChunkBuilder};
    use pretty_assertions::assert_eq;

    fn decode(bytes: &[u8], header: &Header, options: &DecodeOptions) -> Result<FunctionPrototype> {
        read_function_prototype(&mut ChunkSource::new(bytes), header, options)
    }

    #[test]
    fn minimal_leaf() {
        let header = Header::native();
        let mut b = ChunkBuilder::new(header);
        b.absent().int(0).int(0).bytes(&[0, 0, 0, 0]);
        b.int(1).instruction(0x0000_0000);
        b.int(0).int(0);
        let bytes = b.finish();

        let f = decode(&bytes, &header, &DecodeOptions::default()).unwrap();
        assert_eq!(f.code, vec![0]);
        assert!(f.constants.is_empty());
        assert!(f.prototypes.is_empty());
        assert_eq!(f.debug, None);
    }

    #[test]
    fn encoded_tree_decodes_to_itself() {
        let header = Header::native();
        let child = FunctionPrototype {
            line_defined: 3,
            last_line_defined: 5,
            param_count: 2,
            max_stack_size: 3,
            code: vec![0x0100_0080, 0x0080_001E],
            constants: vec![Constant::Nil, Constant::Boolean(1)],
            ..Default::default()
        };
        let main = FunctionPrototype {
            source: LuaString::from_raw(b"@test.lua\0".to_vec()).unwrap(),
            is_vararg: VARARG_ISVARARG,
            max_stack_size: 2,
            code: vec![0x0000_0024, 0x0080_001E],
            constants: vec![Constant::Number(RawNumber {
                bits: 42f64.to_bits(),
                width: 8,
            })],
            prototypes: vec![child.clone(), child],
            ..Default::default()
        };

        let mut b = ChunkBuilder::new(header);
        b.function(&main);
        let f = decode(&b.finish(), &header, &DecodeOptions::default()).unwrap();
        assert_eq!(f, main);
        assert!(f.is_vararg());
        assert_eq!(f.count(), 3);
        assert_eq!(f.depth(), 1);
    }

    #[test]
    fn short_counts_block_is_invalid_format() {
        let header = Header::native();
        let mut b = ChunkBuilder::new(header);
        b.absent().int(0).int(0).bytes(&[0, 0, 2]);
        let err = decode(&b.finish(), &header, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        assert_eq!(err.steps(), vec!["function counts"]);
    }

    #[test]
    fn child_failure_is_annotated() {
        let header = Header::native();
        let mut b = ChunkBuilder::new(header);
        b.absent().int(0).int(0).bytes(&[0, 0, 0, 2]);
        b.int(0).int(0);
        b.int(2);
        b.function(&FunctionPrototype::default());
        // second child: constant list with a bad tag
        b.absent().int(0).int(0).bytes(&[0, 0, 0, 2]);
        b.int(0).int(1).byte(9);
        let err = decode(&b.finish(), &header, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        assert_eq!(err.steps(), vec!["prototype[1]", "constant list", "constant[0]"]);
    }

    #[test]
    fn nesting_up_to_the_ceiling() {
        let header = Header::native();
        let options = DecodeOptions {
            max_depth: 16,
            ..Default::default()
        };
        for d in [0usize, 1, 5, 16] {
            let mut b = ChunkBuilder::new(header);
            b.function(&nested(d));
            let f = decode(&b.finish(), &header, &options).unwrap();
            assert_eq!(f.depth(), d);
        }
    }

    #[test]
    fn nesting_past_the_ceiling() {
        let header = Header::native();
        let options = DecodeOptions {
            max_depth: 16,
            ..Default::default()
        };
        let mut b = ChunkBuilder::new(header);
        b.function(&nested(17));
        let err = decode(&b.finish(), &header, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralLimitExceeded);
        assert_eq!(err.steps().len(), 17);
    }

    #[test]
    fn debug_lists_when_enabled() {
        let header = Header::native();
        let options = DecodeOptions {
            debug_info: true,
            ..Default::default()
        };
        let main = FunctionPrototype {
            code: vec![0x0080_001E],
            prototypes: vec![FunctionPrototype {
                debug: Some(DebugInfo::default()),
                ..Default::default()
            }],
            debug: Some(DebugInfo {
                line_info: vec![7],
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut b = ChunkBuilder::new(header);
        b.function(&main);
        let bytes = b.finish();
        assert_eq!(decode(&bytes, &header, &options).unwrap(), main);

        // a chunk written without the lists ends where they should start
        let mut b = ChunkBuilder::new(header);
        b.function(&FunctionPrototype::default());
        let stripped = b.finish();
        let err = decode(&stripped, &header, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShortRead);
        assert_eq!(err.steps()[0], "debug info");
    }
}
