//! Disassembly listing of a decoded chunk.
//!
//! The listing is built once from the prototype tree and can then be printed
//! as text or dumped as YAML.

use std::fmt::Write;

use anyhow::{Context, Result};
use lundump_core::{Chunk, Constant, FunctionPrototype, Header, Number};
use lundump_nls::{Decoder, TextDecoder};
use serde::Serialize;

use crate::opcode::{Instruction, Opcode};

#[derive(Debug, Serialize)]
pub struct HeaderInfo {
    endianness: String,
    int_size: u8,
    size_t_size: u8,
    instruction_size: u8,
    number_size: u8,
    number_format: String,
}

#[derive(Debug, Serialize)]
pub struct Inst {
    pc: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<i64>,
    mnemonic: Opcode,
    a: u8,
    b: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Local {
    name: String,
    start_pc: i64,
    end_pc: i64,
}

#[derive(Debug, Serialize)]
pub struct Function {
    /// Position in the prototype tree, e.g. `main/0/2`.
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    line_defined: i64,
    last_line_defined: i64,
    upvalues: u8,
    params: u8,
    is_vararg: u8,
    max_stack_size: u8,
    insts: Vec<Inst>,
    constants: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    locals: Vec<Local>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    upvalue_names: Vec<String>,
    functions: Vec<Function>,
}

#[derive(Debug, Serialize)]
pub struct Listing {
    header: HeaderInfo,
    main: Function,
}

impl Listing {
    pub fn new(chunk: &Chunk, nls: &Decoder) -> Result<Self> {
        let h = &chunk.header;
        let header = HeaderInfo {
            endianness: h.endianness.to_string(),
            int_size: h.int_size,
            size_t_size: h.size_t_size,
            instruction_size: h.instruction_size,
            number_size: h.number_size,
            number_format: h.number_format.to_string(),
        };
        let main = Function::new(&chunk.main, h, nls, "main".to_string())?;
        Ok(Self { header, main })
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let h = &self.header;
        let _ = writeln!(
            out,
            "; {}, int {} bytes, size_t {} bytes, instruction {} bytes, lua_Number {} bytes ({})",
            h.endianness,
            h.int_size,
            h.size_t_size,
            h.instruction_size,
            h.number_size,
            h.number_format
        );
        self.main.write_text(&mut out, 0);
        out
    }
}

fn render_constant(k: &Constant, header: &Header, nls: &Decoder) -> String {
    match k {
        Constant::Nil => "nil".to_string(),
        Constant::Boolean(0) => "false".to_string(),
        Constant::Boolean(1) => "true".to_string(),
        Constant::Boolean(b) => format!("true ; flag byte {}", b),
        Constant::Number(n) => match n.interpret(header) {
            Ok(Number::Float(f)) => format!("{}", f),
            Ok(Number::Integer(i)) => i.to_string(),
            Err(e) => {
                log::warn!("{}", e);
                format!("0x{:0width$X}", n.bits, width = n.width as usize * 2)
            }
        },
        Constant::String(s) => nls.quote(s.as_bytes()),
    }
}

impl Function {
    fn new(f: &FunctionPrototype, header: &Header, nls: &Decoder, path: String) -> Result<Self> {
        let constants: Vec<String> = f
            .constants
            .iter()
            .map(|k| render_constant(k, header, nls))
            .collect();

        let line_info = f.debug.as_ref().map(|d| d.line_info.as_slice()).unwrap_or(&[]);

        let mut insts = Vec::with_capacity(f.code.len());
        for (pc, word) in f.code.iter().enumerate() {
            let inst = Instruction::decode(*word).with_context(|| format!("{} pc {}", path, pc))?;
            let comment = if inst.opcode.b_is_constant() {
                constants.get(inst.b as usize).cloned()
            } else if inst.opcode == Opcode::Closure {
                Some(format!("{}/{}", path, inst.b))
            } else {
                None
            };
            insts.push(Inst {
                pc,
                line: line_info.get(pc).copied(),
                mnemonic: inst.opcode,
                a: inst.a,
                b: inst.b,
                comment,
            });
        }

        let (locals, upvalue_names) = match &f.debug {
            Some(d) => (
                d.locals
                    .iter()
                    .map(|l| Local {
                        name: nls.decode(l.name.as_bytes()).into_owned(),
                        start_pc: l.start_pc,
                        end_pc: l.end_pc,
                    })
                    .collect(),
                d.upvalue_names
                    .iter()
                    .map(|n| nls.decode(n.as_bytes()).into_owned())
                    .collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        let functions = f
            .prototypes
            .iter()
            .enumerate()
            .map(|(i, p)| Function::new(p, header, nls, format!("{}/{}", path, i)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: (!f.source.is_absent()).then(|| nls.decode(f.source.as_bytes()).into_owned()),
            path,
            line_defined: f.line_defined,
            last_line_defined: f.last_line_defined,
            upvalues: f.upvalue_count,
            params: f.param_count,
            is_vararg: f.is_vararg,
            max_stack_size: f.max_stack_size,
            insts,
            constants,
            locals,
            upvalue_names,
            functions,
        })
    }

    fn write_text(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}function {} <{}:{},{}> ({} instructions)",
            pad,
            self.path,
            self.source.as_deref().unwrap_or("?"),
            self.line_defined,
            self.last_line_defined,
            self.insts.len()
        );
        let _ = writeln!(
            out,
            "{}{} params, {} slots, {} upvalues, vararg flags {}, {} constants, {} functions",
            pad,
            self.params,
            self.max_stack_size,
            self.upvalues,
            self.is_vararg,
            self.constants.len(),
            self.functions.len()
        );

        for inst in &self.insts {
            let line = match inst.line {
                Some(l) => format!("[{}]", l),
                None => "[-]".to_string(),
            };
            let _ = write!(
                out,
                "{}  {:<5} {:<6} {:<10} {:>3} {:>6}",
                pad,
                inst.pc + 1,
                line,
                inst.mnemonic.name(),
                inst.a,
                inst.b
            );
            match &inst.comment {
                Some(c) => {
                    let _ = writeln!(out, "  ; {}", c);
                }
                None => {
                    let _ = writeln!(out);
                }
            }
        }

        let _ = writeln!(out, "{}constants ({}):", pad, self.constants.len());
        for (i, k) in self.constants.iter().enumerate() {
            let _ = writeln!(out, "{}  {:<5} {}", pad, i, k);
        }

        if !self.locals.is_empty() {
            let _ = writeln!(out, "{}locals ({}):", pad, self.locals.len());
            for (i, l) in self.locals.iter().enumerate() {
                // 1-based like the pc column; the values come straight from the chunk
                let _ = writeln!(
                    out,
                    "{}  {:<5} {} {} {}",
                    pad,
                    i,
                    l.name,
                    l.start_pc.saturating_add(1),
                    l.end_pc.saturating_add(1)
                );
            }
        }

        if !self.upvalue_names.is_empty() {
            let _ = writeln!(out, "{}upvalues ({}):", pad, self.upvalue_names.len());
            for (i, name) in self.upvalue_names.iter().enumerate() {
                let _ = writeln!(out, "{}  {:<5} {}", pad, i, name);
            }
        }

        for f in &self.functions {
            f.write_text(out, depth + 1);
        }
    }
}
