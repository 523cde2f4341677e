//! Decoded ARM64 instruction primitives shared by the dartlift lifter.
//!
//! The disassembler proper lives outside this workspace. What it hands the
//! lifter is the [`Insn`] record defined here, one per 4-byte machine
//! instruction, in address order. The record is deliberately flat: a
//! mnemonic family plus fixed operand fields, so pattern matches over
//! instruction windows never have to walk an operand tree.

#![warn(missing_docs)]

mod insn;
mod reg;

pub mod op;

pub use insn::{Cond, Extend, Insn, InsnFlags, Op};
pub use reg::{Reg, RegisterId};

/// Machine word of the target.
pub type Word = u64;
