//! Semantic micro-instructions.
//!
//! Every machine instruction expands into a short sequence of micro-
//! instructions over the platform registers and a set of temporaries. Register
//! operands are signed: non-negative indices are platform registers, negative
//! indices are temporaries, which only live during one machine instruction.
//!
//! `If` is the only instruction with internal control flow. When its condition
//! fails, interpretation goes on `jump` instructions further.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of the word moved by a load or a store.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    /// Floating point or wider integers, not tracked.
    Other,
}

impl DataType {
    /// Size in bytes of tracked types.
    pub fn size(&self) -> Option<usize> {
        match self {
            DataType::Int8 | DataType::Uint8 => Some(1),
            DataType::Int16 | DataType::Uint16 => Some(2),
            DataType::Int32 | DataType::Uint32 => Some(4),
            DataType::Other => None,
        }
    }
}

/// Condition tested by an `If`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Condition {
    Eq,
    Ne,
    Lt,
    Le,
    Ge,
    Gt,
    Ult,
    Ule,
    Uge,
    Ugt,
    Any,
}

/// Operators of the three-register instructions.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum BinOp {
    /// Signed comparison, producing a condition word.
    Cmp,
    /// Unsigned comparison, producing a condition word.
    Cmpu,
    Add,
    Sub,
    Shl,
    /// Logical shift right.
    Shr,
    /// Arithmetic shift right.
    Asr,
    And,
    Or,
    Xor,
    Mul,
    Mulu,
    /// Upper word of the unsigned product.
    Mulh,
    Div,
    Divu,
    Mod,
    Modu,
}

impl BinOp {
    fn name(&self) -> &'static str {
        match self {
            BinOp::Cmp => "cmp",
            BinOp::Cmpu => "cmpu",
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Shl => "shl",
            BinOp::Shr => "shr",
            BinOp::Asr => "asr",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Mul => "mul",
            BinOp::Mulu => "mulu",
            BinOp::Mulh => "mulh",
            BinOp::Div => "div",
            BinOp::Divu => "divu",
            BinOp::Mod => "mod",
            BinOp::Modu => "modu",
        }
    }
}

/// A semantic micro-instruction.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Inst {
    Nop,
    /// Branch to the address held in `target`.
    Branch { target: i16 },
    /// Conditional trap, ends the interpretation of the instruction.
    Trap,
    /// Ends the interpretation of the instruction.
    Cont,
    /// Go on if `cond` holds in `reg`, else skip `jump` instructions.
    If { cond: Condition, reg: i16, jump: u16 },
    /// `dst <- MEM[addr]`
    Load { dst: i16, addr: i16, ty: DataType },
    /// `MEM[addr] <- src`
    Store { src: i16, addr: i16, ty: DataType },
    /// `dst <- T`
    Scratch { dst: i16 },
    /// `dst <- src`
    Set { dst: i16, src: i16 },
    /// `dst <- cst`
    Seti { dst: i16, cst: u32 },
    /// `page(dst) <- cst`
    Setp { dst: i16, cst: u32 },
    /// `dst <- a op b`
    Binary { op: BinOp, dst: i16, a: i16, b: i16 },
}

impl Inst {
    /// Register written by this instruction, if any.
    pub fn destination(&self) -> Option<i16> {
        match *self {
            Inst::Load { dst, .. }
            | Inst::Scratch { dst }
            | Inst::Set { dst, .. }
            | Inst::Seti { dst, .. }
            | Inst::Setp { dst, .. }
            | Inst::Binary { dst, .. } => Some(dst),
            _ => None,
        }
    }
}

pub fn nop() -> Inst {
    Inst::Nop
}

pub fn branch(target: i16) -> Inst {
    Inst::Branch { target }
}

pub fn trap() -> Inst {
    Inst::Trap
}

pub fn cont() -> Inst {
    Inst::Cont
}

pub fn if_(cond: Condition, reg: i16, jump: u16) -> Inst {
    Inst::If { cond, reg, jump }
}

pub fn load(dst: i16, addr: i16, ty: DataType) -> Inst {
    Inst::Load { dst, addr, ty }
}

pub fn store(src: i16, addr: i16, ty: DataType) -> Inst {
    Inst::Store { src, addr, ty }
}

pub fn scratch(dst: i16) -> Inst {
    Inst::Scratch { dst }
}

pub fn set(dst: i16, src: i16) -> Inst {
    Inst::Set { dst, src }
}

pub fn seti(dst: i16, cst: u32) -> Inst {
    Inst::Seti { dst, cst }
}

pub fn setp(dst: i16, cst: u32) -> Inst {
    Inst::Setp { dst, cst }
}

macro_rules! binop {
    ($n: ident, $op: path) => {
        pub fn $n(dst: i16, a: i16, b: i16) -> Inst {
            Inst::Binary { op: $op, dst, a, b }
        }
    };
}

binop!(cmp, BinOp::Cmp);
binop!(cmpu, BinOp::Cmpu);
binop!(add, BinOp::Add);
binop!(sub, BinOp::Sub);
binop!(shl, BinOp::Shl);
binop!(shr, BinOp::Shr);
binop!(asr, BinOp::Asr);
binop!(and, BinOp::And);
binop!(or, BinOp::Or);
binop!(xor, BinOp::Xor);
binop!(mul, BinOp::Mul);
binop!(mulu, BinOp::Mulu);
binop!(mulh, BinOp::Mulh);
binop!(div, BinOp::Div);
binop!(divu, BinOp::Divu);
binop!(rem, BinOp::Mod);
binop!(remu, BinOp::Modu);

struct Reg(i16);

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "t{}", -(self.0 as i32))
        } else {
            write!(f, "r{}", self.0)
        }
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Inst::Nop => write!(f, "nop"),
            Inst::Branch { target } => write!(f, "branch {}", Reg(target)),
            Inst::Trap => write!(f, "trap"),
            Inst::Cont => write!(f, "cont"),
            Inst::If { cond, reg, jump } => write!(f, "if({:?}, {}, {})", cond, Reg(reg), jump),
            Inst::Load { dst, addr, ty } => {
                write!(f, "load({}, {}, {:?})", Reg(dst), Reg(addr), ty)
            }
            Inst::Store { src, addr, ty } => {
                write!(f, "store({}, {}, {:?})", Reg(src), Reg(addr), ty)
            }
            Inst::Scratch { dst } => write!(f, "scratch({})", Reg(dst)),
            Inst::Set { dst, src } => write!(f, "set({}, {})", Reg(dst), Reg(src)),
            Inst::Seti { dst, cst } => write!(f, "seti({}, 0x{:x})", Reg(dst), cst),
            Inst::Setp { dst, cst } => write!(f, "setp({}, 0x{:x})", Reg(dst), cst),
            Inst::Binary { op, dst, a, b } => {
                write!(f, "{}({}, {}, {})", op.name(), Reg(dst), Reg(a), Reg(b))
            }
        }
    }
}
