use crate::reg::Reg;
use crate::Word;

use bitflags::bitflags;

/// Mnemonic family of a decoded instruction.
///
/// Immediate and register operand forms are split the way the encodings
/// split them (`Add` vs. `AddI`, `Ldr` vs. `LdrR`), so window matches never
/// need an operand discriminator. The rendered name is the base mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Op {
    /// Store register pair.
    Stp,
    /// Load register pair.
    Ldp,
    /// Register move.
    Mov,
    /// Move wide with zero.
    Movz,
    /// Move wide keeping other bits.
    Movk,
    /// Move wide negated.
    Movn,
    /// Bitwise or (register form; `orr rd, zr, rs` is a move).
    Orr,
    /// Add, register operand.
    Add,
    /// Add, immediate operand.
    #[strum(serialize = "add")]
    AddI,
    /// Subtract, register operand.
    Sub,
    /// Subtract, immediate operand.
    #[strum(serialize = "sub")]
    SubI,
    /// Compare, register operand.
    Cmp,
    /// Compare, immediate operand.
    #[strum(serialize = "cmp")]
    CmpI,
    /// Logical shift left by immediate.
    Lsl,
    /// Signed bitfield insert in zero.
    Sbfiz,
    /// Signed bitfield extract.
    Sbfx,
    /// Sign-extend word.
    Sxtw,
    /// Move between the general and floating-point register files.
    Fmov,
    /// Load, immediate offset.
    Ldr,
    /// Load, register offset.
    #[strum(serialize = "ldr")]
    LdrR,
    /// Load, unscaled immediate offset.
    Ldur,
    /// Store, immediate offset.
    Str,
    /// Store, register offset.
    #[strum(serialize = "str")]
    StrR,
    /// Store, unscaled immediate offset.
    Stur,
    /// Test bit and branch if zero.
    Tbz,
    /// Test bit and branch if nonzero.
    Tbnz,
    /// Compare and branch if zero.
    Cbz,
    /// Compare and branch if nonzero.
    Cbnz,
    /// Unconditional branch.
    B,
    /// Conditional branch.
    #[strum(serialize = "b")]
    BCond,
    /// Branch with link.
    Bl,
    /// Branch with link to register.
    Blr,
    /// Branch to register.
    Br,
    /// Return.
    Ret,
    /// Anything the decoder delivered that the lifter has no model for.
    Unknown,
}

/// ARM condition codes, as carried by `b.<cond>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum Cond {
    Eq,
    Ne,
    Cs,
    Cc,
    Mi,
    Pl,
    Vs,
    Vc,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
    Al,
}

/// Extension applied to a register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Extend {
    /// No extension.
    None,
    /// Left shift (`lsl #n`).
    Lsl,
    /// Unsigned extend word.
    Uxtw,
    /// Signed extend word.
    Sxtw,
}

bitflags! {
    /// Decode attributes carried alongside the mnemonic.
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct InsnFlags: u16 {
        /// 32-bit (`w`) operand form.
        const W_FORM = 0x0001;
        /// Byte-wide memory access.
        const BYTE = 0x0002;
        /// Half-word memory access.
        const HALF = 0x0004;
        /// Pre-indexed addressing.
        const PRE_INDEX = 0x0008;
        /// Post-indexed addressing.
        const POST_INDEX = 0x0010;
        /// Base register writeback.
        const WRITEBACK = 0x0020;
        /// Sets the condition flags.
        const SETS_FLAGS = 0x0040;
    }
}

/// One decoded instruction, as delivered by the external disassembler.
///
/// Field use per mnemonic follows the assembly operand order: `rt` is the
/// transfer/destination register, `rt2` the second transfer register of a
/// pair, `rn` the base or first source, `rm` the register operand, `imm`
/// the immediate (memory offset, shifted constant, or bitfield lsb), and
/// `target` the branch destination. For `sbfiz`/`sbfx`, `imm` is the lsb
/// and `shift` the field width.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Insn {
    pub(crate) addr: Word,
    pub(crate) op: Op,
    pub(crate) rt: Reg,
    pub(crate) rt2: Reg,
    pub(crate) rn: Reg,
    pub(crate) rm: Reg,
    pub(crate) imm: i64,
    pub(crate) shift: u8,
    pub(crate) ext: Extend,
    pub(crate) cond: Cond,
    pub(crate) target: Word,
    pub(crate) flags: InsnFlags,
}

impl Insn {
    /// Size of an instruction in bytes.
    pub const LEN: usize = 4;

    pub(crate) const fn blank(op: Op) -> Self {
        Self {
            addr: 0,
            op,
            rt: Reg::ZR,
            rt2: Reg::ZR,
            rn: Reg::ZR,
            rm: Reg::ZR,
            imm: 0,
            shift: 0,
            ext: Extend::None,
            cond: Cond::Al,
            target: 0,
            flags: InsnFlags::empty(),
        }
    }

    /// Address of the instruction.
    pub const fn addr(&self) -> Word {
        self.addr
    }

    /// Address of the byte past the instruction.
    pub const fn end_addr(&self) -> Word {
        self.addr + Self::LEN as Word
    }

    /// Mnemonic family.
    pub const fn op(&self) -> Op {
        self.op
    }

    /// Transfer/destination register.
    pub const fn rt(&self) -> Reg {
        self.rt
    }

    /// Second transfer register of a pair.
    pub const fn rt2(&self) -> Reg {
        self.rt2
    }

    /// Base or first source register.
    pub const fn rn(&self) -> Reg {
        self.rn
    }

    /// Register operand.
    pub const fn rm(&self) -> Reg {
        self.rm
    }

    /// Immediate operand.
    pub const fn imm(&self) -> i64 {
        self.imm
    }

    /// Shift amount, or field width for `sbfiz`/`sbfx`.
    pub const fn shift(&self) -> u8 {
        self.shift
    }

    /// Register operand extension.
    pub const fn ext(&self) -> Extend {
        self.ext
    }

    /// Condition code.
    pub const fn cond(&self) -> Cond {
        self.cond
    }

    /// Branch target address.
    pub const fn target(&self) -> Word {
        self.target
    }

    /// Decode attribute flags.
    pub const fn flags(&self) -> InsnFlags {
        self.flags
    }

    /// Whether the instruction uses the 32-bit operand form.
    pub fn is_w(&self) -> bool {
        self.flags.contains(InsnFlags::W_FORM)
    }

    /// Memory access width in bytes.
    pub fn access_size(&self) -> u8 {
        if self.flags.contains(InsnFlags::BYTE) {
            1
        } else if self.flags.contains(InsnFlags::HALF) {
            2
        } else if self.flags.contains(InsnFlags::W_FORM) {
            4
        } else {
            8
        }
    }

    /// Whether this is a load with an immediate offset (`ldr`/`ldur`).
    pub fn is_load_off(&self) -> bool {
        matches!(self.op, Op::Ldr | Op::Ldur)
    }

    /// Whether this is a store with an immediate offset (`str`/`stur`).
    pub fn is_store_off(&self) -> bool {
        matches!(self.op, Op::Str | Op::Stur)
    }

    /// Place the instruction at `addr`.
    pub const fn at(mut self, addr: Word) -> Self {
        self.addr = addr;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op;
    use rstest::rstest;

    #[test]
    fn every_mnemonic_renders() {
        use strum::IntoEnumIterator;
        for op in Op::iter() {
            assert!(!op.to_string().is_empty());
        }
    }

    #[test]
    fn mnemonics_render_without_form_suffixes() {
        assert_eq!(Op::Ldr.to_string(), "ldr");
        assert_eq!(Op::LdrR.to_string(), "ldr");
        assert_eq!(Op::AddI.to_string(), "add");
        assert_eq!(Op::BCond.to_string(), "b");
        assert_eq!(Op::Stp.to_string(), "stp");
    }

    #[rstest]
    #[case(op::ldrb_off(Reg::x(0), Reg::x(1), 0), 1)]
    #[case(op::ldrh_off(Reg::x(0), Reg::x(1), 0), 2)]
    #[case(op::ldr_w_off(Reg::x(0), Reg::x(1), 0), 4)]
    #[case(op::ldr_off(Reg::x(0), Reg::x(1), 0), 8)]
    fn access_size_follows_width_flags(#[case] insn: Insn, #[case] size: u8) {
        assert_eq!(insn.access_size(), size);
    }

    #[test]
    fn placement_sets_the_address_range() {
        let insn = op::ret().at(0x1000);
        assert_eq!(insn.addr(), 0x1000);
        assert_eq!(insn.end_addr(), 0x1004);
    }

    #[test]
    fn indexing_flags() {
        let push = op::str_pre(Reg::x(0), Reg::SP, -16);
        assert!(push.flags().contains(InsnFlags::PRE_INDEX));
        assert!(push.flags().contains(InsnFlags::WRITEBACK));

        let pop = op::ldr_post(Reg::x(0), Reg::SP, 16);
        assert!(pop.flags().contains(InsnFlags::POST_INDEX));
    }
}
