//! Constructor helpers for decoded instructions, one per addressing form
//! the lifter recognizes. The external disassembler produces [`Insn`]
//! records through these; tests use them as their assembly surface.

use crate::insn::{Cond, Extend, Insn, InsnFlags, Op};
use crate::reg::Reg;
use crate::Word;

/// `stp rt, rt2, [rn, #imm]!`
pub const fn stp_pre(rt: Reg, rt2: Reg, rn: Reg, imm: i64) -> Insn {
    let mut i = Insn::blank(Op::Stp);
    i.rt = rt;
    i.rt2 = rt2;
    i.rn = rn;
    i.imm = imm;
    i.flags = InsnFlags::from_bits_truncate(
        InsnFlags::PRE_INDEX.bits() | InsnFlags::WRITEBACK.bits(),
    );
    i
}

/// `stp rt, rt2, [rn, #imm]`
pub const fn stp_off(rt: Reg, rt2: Reg, rn: Reg, imm: i64) -> Insn {
    let mut i = Insn::blank(Op::Stp);
    i.rt = rt;
    i.rt2 = rt2;
    i.rn = rn;
    i.imm = imm;
    i
}

/// `ldp rt, rt2, [rn], #imm`
pub const fn ldp_post(rt: Reg, rt2: Reg, rn: Reg, imm: i64) -> Insn {
    let mut i = Insn::blank(Op::Ldp);
    i.rt = rt;
    i.rt2 = rt2;
    i.rn = rn;
    i.imm = imm;
    i.flags = InsnFlags::from_bits_truncate(
        InsnFlags::POST_INDEX.bits() | InsnFlags::WRITEBACK.bits(),
    );
    i
}

/// `mov rd, rm`
pub const fn mov(rd: Reg, rm: Reg) -> Insn {
    let mut i = Insn::blank(Op::Mov);
    i.rt = rd;
    i.rm = rm;
    i
}

/// `movz rd, #imm, lsl #shift`
pub const fn movz(rd: Reg, imm: i64, shift: u8) -> Insn {
    let mut i = Insn::blank(Op::Movz);
    i.rt = rd;
    i.imm = imm;
    i.shift = shift;
    i
}

/// `movz wd, #imm`
pub const fn movz_w(rd: Reg, imm: i64) -> Insn {
    let mut i = movz(rd, imm, 0);
    i.flags = InsnFlags::W_FORM;
    i
}

/// `movk rd, #imm, lsl #shift`
pub const fn movk(rd: Reg, imm: i64, shift: u8) -> Insn {
    let mut i = Insn::blank(Op::Movk);
    i.rt = rd;
    i.imm = imm;
    i.shift = shift;
    i
}

/// `movn rd, #imm, lsl #shift`
pub const fn movn(rd: Reg, imm: i64, shift: u8) -> Insn {
    let mut i = Insn::blank(Op::Movn);
    i.rt = rd;
    i.imm = imm;
    i.shift = shift;
    i
}

/// `orr rd, rn, rm`
pub const fn orr(rd: Reg, rn: Reg, rm: Reg) -> Insn {
    let mut i = Insn::blank(Op::Orr);
    i.rt = rd;
    i.rn = rn;
    i.rm = rm;
    i
}

/// `add rd, rn, rm`
pub const fn add(rd: Reg, rn: Reg, rm: Reg) -> Insn {
    let mut i = Insn::blank(Op::Add);
    i.rt = rd;
    i.rn = rn;
    i.rm = rm;
    i
}

/// `add rd, rn, rm, <ext> #shift`
pub const fn add_ext(rd: Reg, rn: Reg, rm: Reg, ext: Extend, shift: u8) -> Insn {
    let mut i = add(rd, rn, rm);
    i.ext = ext;
    i.shift = shift;
    i
}

/// `add rd, rn, #imm`
pub const fn add_imm(rd: Reg, rn: Reg, imm: i64) -> Insn {
    let mut i = Insn::blank(Op::AddI);
    i.rt = rd;
    i.rn = rn;
    i.imm = imm;
    i
}

/// `sub rd, rn, #imm`
pub const fn sub_imm(rd: Reg, rn: Reg, imm: i64) -> Insn {
    let mut i = Insn::blank(Op::SubI);
    i.rt = rd;
    i.rn = rn;
    i.imm = imm;
    i
}

/// `cmp rn, rm`
pub const fn cmp(rn: Reg, rm: Reg) -> Insn {
    let mut i = Insn::blank(Op::Cmp);
    i.rn = rn;
    i.rm = rm;
    i.flags = InsnFlags::SETS_FLAGS;
    i
}

/// `cmp rn, #imm`
pub const fn cmp_imm(rn: Reg, imm: i64) -> Insn {
    let mut i = Insn::blank(Op::CmpI);
    i.rn = rn;
    i.imm = imm;
    i.flags = InsnFlags::SETS_FLAGS;
    i
}

/// `lsl rd, rn, #shift`
pub const fn lsl(rd: Reg, rn: Reg, shift: u8) -> Insn {
    let mut i = Insn::blank(Op::Lsl);
    i.rt = rd;
    i.rn = rn;
    i.shift = shift;
    i
}

/// `sbfiz rd, rn, #lsb, #width`
pub const fn sbfiz(rd: Reg, rn: Reg, lsb: i64, width: u8) -> Insn {
    let mut i = Insn::blank(Op::Sbfiz);
    i.rt = rd;
    i.rn = rn;
    i.imm = lsb;
    i.shift = width;
    i
}

/// `sbfx rd, rn, #lsb, #width`
pub const fn sbfx(rd: Reg, rn: Reg, lsb: i64, width: u8) -> Insn {
    let mut i = Insn::blank(Op::Sbfx);
    i.rt = rd;
    i.rn = rn;
    i.imm = lsb;
    i.shift = width;
    i
}

/// `sxtw rd, wn`
pub const fn sxtw(rd: Reg, rn: Reg) -> Insn {
    let mut i = Insn::blank(Op::Sxtw);
    i.rt = rd;
    i.rn = rn;
    i
}

/// `fmov rd, rn`
pub const fn fmov(rd: Reg, rn: Reg) -> Insn {
    let mut i = Insn::blank(Op::Fmov);
    i.rt = rd;
    i.rn = rn;
    i
}

const fn load_store(op: Op, rt: Reg, rn: Reg, imm: i64, flags: InsnFlags) -> Insn {
    let mut i = Insn::blank(op);
    i.rt = rt;
    i.rn = rn;
    i.imm = imm;
    i.flags = flags;
    i
}

/// `ldr rt, [rn, #imm]`
pub const fn ldr_off(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(Op::Ldr, rt, rn, imm, InsnFlags::empty())
}

/// `ldr wt, [rn, #imm]`
pub const fn ldr_w_off(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(Op::Ldr, rt, rn, imm, InsnFlags::W_FORM)
}

/// `ldrh wt, [rn, #imm]`
pub const fn ldrh_off(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(
        Op::Ldr,
        rt,
        rn,
        imm,
        InsnFlags::from_bits_truncate(InsnFlags::HALF.bits() | InsnFlags::W_FORM.bits()),
    )
}

/// `ldrb wt, [rn, #imm]`
pub const fn ldrb_off(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(
        Op::Ldr,
        rt,
        rn,
        imm,
        InsnFlags::from_bits_truncate(InsnFlags::BYTE.bits() | InsnFlags::W_FORM.bits()),
    )
}

/// `ldr rt, [rn, #imm]!`
pub const fn ldr_pre(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(
        Op::Ldr,
        rt,
        rn,
        imm,
        InsnFlags::from_bits_truncate(InsnFlags::PRE_INDEX.bits() | InsnFlags::WRITEBACK.bits()),
    )
}

/// `ldr rt, [rn], #imm`
pub const fn ldr_post(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(
        Op::Ldr,
        rt,
        rn,
        imm,
        InsnFlags::from_bits_truncate(InsnFlags::POST_INDEX.bits() | InsnFlags::WRITEBACK.bits()),
    )
}

/// `ldr rt, [rn, rm, <ext> #shift]`
pub const fn ldr_reg(rt: Reg, rn: Reg, rm: Reg, ext: Extend, shift: u8) -> Insn {
    let mut i = Insn::blank(Op::LdrR);
    i.rt = rt;
    i.rn = rn;
    i.rm = rm;
    i.ext = ext;
    i.shift = shift;
    i
}

/// `ldur rt, [rn, #imm]`
pub const fn ldur_off(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(Op::Ldur, rt, rn, imm, InsnFlags::empty())
}

/// `ldur wt, [rn, #imm]`
pub const fn ldur_w_off(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(Op::Ldur, rt, rn, imm, InsnFlags::W_FORM)
}

/// `str rt, [rn, #imm]`
pub const fn str_off(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(Op::Str, rt, rn, imm, InsnFlags::empty())
}

/// `str wt, [rn, #imm]`
pub const fn str_w_off(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(Op::Str, rt, rn, imm, InsnFlags::W_FORM)
}

/// `str rt, [rn, #imm]!`
pub const fn str_pre(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(
        Op::Str,
        rt,
        rn,
        imm,
        InsnFlags::from_bits_truncate(InsnFlags::PRE_INDEX.bits() | InsnFlags::WRITEBACK.bits()),
    )
}

/// `str rt, [rn, rm, <ext> #shift]`
pub const fn str_reg(rt: Reg, rn: Reg, rm: Reg, ext: Extend, shift: u8) -> Insn {
    let mut i = Insn::blank(Op::StrR);
    i.rt = rt;
    i.rn = rn;
    i.rm = rm;
    i.ext = ext;
    i.shift = shift;
    i
}

/// `stur rt, [rn, #imm]`
pub const fn stur_off(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(Op::Stur, rt, rn, imm, InsnFlags::empty())
}

/// `stur wt, [rn, #imm]`
pub const fn stur_w_off(rt: Reg, rn: Reg, imm: i64) -> Insn {
    load_store(Op::Stur, rt, rn, imm, InsnFlags::W_FORM)
}

/// `tbz rt, #bit, target`
pub const fn tbz(rt: Reg, bit: i64, target: Word) -> Insn {
    let mut i = Insn::blank(Op::Tbz);
    i.rt = rt;
    i.imm = bit;
    i.target = target;
    i
}

/// `tbnz rt, #bit, target`
pub const fn tbnz(rt: Reg, bit: i64, target: Word) -> Insn {
    let mut i = Insn::blank(Op::Tbnz);
    i.rt = rt;
    i.imm = bit;
    i.target = target;
    i
}

/// `cbz rt, target`
pub const fn cbz(rt: Reg, target: Word) -> Insn {
    let mut i = Insn::blank(Op::Cbz);
    i.rt = rt;
    i.target = target;
    i
}

/// `cbnz rt, target`
pub const fn cbnz(rt: Reg, target: Word) -> Insn {
    let mut i = Insn::blank(Op::Cbnz);
    i.rt = rt;
    i.target = target;
    i
}

/// `b target`
pub const fn b(target: Word) -> Insn {
    let mut i = Insn::blank(Op::B);
    i.target = target;
    i
}

/// `b.<cond> target`
pub const fn b_cond(cond: Cond, target: Word) -> Insn {
    let mut i = Insn::blank(Op::BCond);
    i.cond = cond;
    i.target = target;
    i
}

/// `bl target`
pub const fn bl(target: Word) -> Insn {
    let mut i = Insn::blank(Op::Bl);
    i.target = target;
    i
}

/// `blr rn`
pub const fn blr(rn: Reg) -> Insn {
    let mut i = Insn::blank(Op::Blr);
    i.rn = rn;
    i
}

/// `br rn`
pub const fn br(rn: Reg) -> Insn {
    let mut i = Insn::blank(Op::Br);
    i.rn = rn;
    i
}

/// `ret`
pub const fn ret() -> Insn {
    Insn::blank(Op::Ret)
}

/// An instruction the decoder could not classify.
pub const fn unknown() -> Insn {
    Insn::blank(Op::Unknown)
}

/// Place `insns` at consecutive addresses starting from `start`.
pub fn seq(start: Word, insns: Vec<Insn>) -> Vec<Insn> {
    insns
        .into_iter()
        .enumerate()
        .map(|(n, i)| i.at(start + (n * Insn::LEN) as Word))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_places_consecutively() {
        let insns = seq(0x1000, vec![ret(), ret(), ret()]);
        let addrs: Vec<Word> = insns.iter().map(Insn::addr).collect();
        assert_eq!(addrs, vec![0x1000, 0x1004, 0x1008]);
    }
}
