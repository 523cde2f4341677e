//! Storage locators: where a tracked value currently lives.

use core::fmt;

use dartlift_asm::Reg;

/// Identifies the storage site of a tracked value.
///
/// A plain value type: trivially copyable, structurally comparable. The
/// payload is a machine register, a byte offset, or an argument index,
/// depending on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarStorage {
    /// Result of a computed expression, not pinned to one site.
    Expression,
    /// A machine register.
    Register(Reg),
    /// A frame slot, as a byte offset from `fp`.
    Local(i64),
    /// An incoming argument by index.
    Argument(usize),
    /// A static field table slot, as a byte offset.
    Static(i64),
    /// An object pool slot, as a byte offset from `PP`.
    Pool(i64),
    /// A thread structure slot, as a byte offset from `THR`.
    Thread(i64),
    /// Encoded directly in the instruction.
    InInstruction,
    /// A full-width immediate.
    Immediate,
    /// A small immediate, kept inline.
    SmallImm(i64),
    /// The return slot of a call.
    Call,
    /// An object field slot.
    Field,
    /// Not yet assigned.
    Uninit,
}

impl VarStorage {
    /// Whether the value is an instruction immediate.
    pub const fn is_immediate(&self) -> bool {
        matches!(self, Self::Immediate)
    }

    /// Whether the value comes from a site whose content is fixed for the
    /// whole program: an immediate or an object pool slot.
    pub const fn is_predefined_value(&self) -> bool {
        matches!(self, Self::Immediate | Self::Pool(_))
    }

    /// Short stable mnemonic for the storage site.
    pub fn name(&self) -> String {
        match self {
            Self::Expression => "expr".to_string(),
            Self::Register(r) => r.to_string(),
            Self::Local(off) if *off < 0 => format!("fp-{:#x}", -off),
            Self::Local(off) => format!("fp+{off:#x}"),
            Self::Argument(idx) => format!("arg{idx}"),
            Self::Static(off) => format!("static+{off:#x}"),
            Self::Pool(off) => format!("PP+{off:#x}"),
            Self::Thread(off) => format!("THR+{off:#x}"),
            Self::InInstruction => "instr".to_string(),
            Self::Immediate => "imm".to_string(),
            Self::SmallImm(v) => format!("smallimm({v})"),
            Self::Call => "ret".to_string(),
            Self::Field => "field".to_string(),
            Self::Uninit => "uninit".to_string(),
        }
    }
}

impl fmt::Display for VarStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl PartialEq<Reg> for VarStorage {
    fn eq(&self, reg: &Reg) -> bool {
        matches!(self, Self::Register(r) if r == reg)
    }
}
