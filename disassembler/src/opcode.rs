use anyhow::{bail, Result};
use serde::Serialize;
use strum::{Display, EnumCount, FromRepr, IntoStaticStr};

/// Lua 5.1 opcodes, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumCount, FromRepr, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Opcode {
    Move = 0,
    LoadK,
    LoadBool,
    LoadNil,
    GetUpval,
    GetGlobal,
    GetTable,
    SetGlobal,
    SetUpval,
    SetTable,
    NewTable,
    #[strum(serialize = "SELF")]
    #[serde(rename = "SELF")]
    Self_,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Unm,
    Not,
    Len,
    Concat,
    Jmp,
    Eq,
    Lt,
    Le,
    Test,
    TestSet,
    Call,
    TailCall,
    Return,
    ForLoop,
    ForPrep,
    TForLoop,
    SetList,
    Close,
    Closure,
    VarArg,
}

impl Opcode {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Opcodes whose B field is an index into the constant pool.
    pub fn b_is_constant(self) -> bool {
        matches!(self, Opcode::LoadK | Opcode::GetGlobal | Opcode::SetGlobal)
    }
}

pub const OPCODE_BITS: u32 = 6;
pub const A_BITS: u32 = 8;
pub const B_BITS: u32 = 18;

/// One instruction word split into opcode, A and B.
///
/// ```text
///  31            14 13      6 5     0
/// +----------------+---------+-------+
/// |       B        |    A    |  op   |
/// +----------------+---------+-------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub a: u8,
    pub b: u32,
}

impl Instruction {
    pub fn decode(word: u32) -> Result<Self> {
        let op = (word & ((1 << OPCODE_BITS) - 1)) as u8;
        let a = ((word >> OPCODE_BITS) & ((1 << A_BITS) - 1)) as u8;
        let b = word >> (OPCODE_BITS + A_BITS);

        let Some(opcode) = Opcode::from_repr(op) else {
            bail!("unknown opcode {} in instruction 0x{:08X}", op, word);
        };
        Ok(Self { opcode, a, b })
    }
}
