//! Chunk writer for building test inputs.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::constant::Constant;
use crate::debug::DebugInfo;
use crate::function::FunctionPrototype;
use crate::header::{Endianness, Header};
use crate::string::LuaString;

pub struct ChunkBuilder {
    header: Header,
    out: Vec<u8>,
}

impl ChunkBuilder {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            out: Vec::new(),
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }

    pub fn header(&mut self) -> &mut Self {
        let bytes = self.header.encode();
        self.bytes(&bytes)
    }

    pub fn byte(&mut self, b: u8) -> &mut Self {
        self.out.push(b);
        self
    }

    pub fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.out.extend_from_slice(b);
        self
    }

    fn uint(&mut self, v: u64, width: u8) -> &mut Self {
        let n = width as usize;
        let mut buf = [0u8; 8];
        match self.header.endianness {
            Endianness::Little => LittleEndian::write_uint(&mut buf, v, n),
            Endianness::Big => BigEndian::write_uint(&mut buf, v, n),
        }
        self.bytes(&buf[..n])
    }

    pub fn int(&mut self, v: i64) -> &mut Self {
        let n = self.header.int_size as usize;
        let mut buf = [0u8; 8];
        match self.header.endianness {
            Endianness::Little => LittleEndian::write_int(&mut buf, v, n),
            Endianness::Big => BigEndian::write_int(&mut buf, v, n),
        }
        self.bytes(&buf[..n])
    }

    pub fn size(&mut self, v: u64) -> &mut Self {
        self.uint(v, self.header.size_t_size)
    }

    pub fn instruction(&mut self, word: u32) -> &mut Self {
        self.uint(word as u64, 4)
    }

    /// Write `text` plus a NUL terminator.
    pub fn string(&mut self, text: &[u8]) -> &mut Self {
        self.size(text.len() as u64 + 1);
        self.bytes(text).byte(0)
    }

    /// The zero-length string nested prototypes use for their name.
    pub fn absent(&mut self) -> &mut Self {
        self.size(0)
    }

    pub fn lua_string(&mut self, s: &LuaString) -> &mut Self {
        self.size(s.declared_len());
        self.bytes(s.raw())
    }

    pub fn constant(&mut self, k: &Constant) -> &mut Self {
        self.byte(k.tag());
        match k {
            Constant::Nil => self,
            Constant::Boolean(b) => self.byte(*b),
            Constant::Number(n) => self.uint(n.bits, n.width),
            Constant::String(s) => self.lua_string(s),
        }
    }

    pub fn function(&mut self, f: &FunctionPrototype) -> &mut Self {
        self.lua_string(&f.source)
            .int(f.line_defined)
            .int(f.last_line_defined)
            .bytes(&[f.upvalue_count, f.param_count, f.is_vararg, f.max_stack_size]);

        self.int(f.code.len() as i64);
        for word in &f.code {
            self.instruction(*word);
        }

        self.int(f.constants.len() as i64);
        for k in &f.constants {
            self.constant(k);
        }

        self.int(f.prototypes.len() as i64);
        for p in &f.prototypes {
            self.function(p);
        }

        if let Some(debug) = &f.debug {
            self.debug(debug);
        }
        self
    }

    pub fn debug(&mut self, d: &DebugInfo) -> &mut Self {
        self.int(d.line_info.len() as i64);
        for line in &d.line_info {
            self.int(*line);
        }
        self.int(d.locals.len() as i64);
        for local in &d.locals {
            self.lua_string(&local.name).int(local.start_pc).int(local.end_pc);
        }
        self.int(d.upvalue_names.len() as i64);
        for name in &d.upvalue_names {
            self.lua_string(name);
        }
        self
    }
}

/// A chain of `depth` prototypes below a main function, each holding the next.
pub fn nested(depth: usize) -> FunctionPrototype {
    let mut f = FunctionPrototype::default();
    for _ in 0..depth {
        f = FunctionPrototype {
            max_stack_size: 2,
            prototypes: vec![f],
            ..Default::default()
        };
    }
    f
}
