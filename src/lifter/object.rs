//! Class id, boxing, and object field idioms.

use dartlift_asm::{Extend, Insn, InsnFlags, Op, Reg};

use super::{insn_range, Lifter};
use crate::consts::{HEAP_BASE, PP, SMI_TAG_SIZE, THR};
use crate::il::{AddrRange, Il, IlOp};
use crate::storage::VarStorage;
use crate::value::{cid, VarItem, VarValue};

fn unknown_cid<'e>() -> VarValue<'e> {
    VarValue::Cid {
        cid: 0,
        is_smi: false,
    }
}

fn is_class_id_load(insn: &Insn) -> bool {
    insn.op() == Op::Ldr
        && insn.flags().contains(InsnFlags::HALF)
        && insn.imm() == crate::consts::CLASS_ID_OFFSET
}

impl<'e> Lifter<'e> {
    /// The three-instruction "cid of a maybe-smi object" idiom:
    /// a constant load of the tagged smi cid, `tbz obj, #0`, and the
    /// header class id load. Emitted as one composite only when all
    /// three parts match contiguously.
    pub(super) fn try_load_tagged_class_id_may_be_smi(&mut self, w: &[Insn]) -> Option<usize> {
        let [li, tb, lc, ..] = w else { return None };
        if li.op() != Op::Movz
            || li.shift() != 0
            || li.imm() != (cid::SMI.0 as i64) << SMI_TAG_SIZE
        {
            return None;
        }
        if tb.op() != Op::Tbz || tb.imm() != 0 || tb.target() != lc.end_addr() {
            return None;
        }
        if !is_class_id_load(lc) || lc.rt() != li.rt() || lc.rn() != tb.rt() {
            return None;
        }

        let (obj, cid_reg) = (tb.rt(), li.rt());
        let load_tag = Il::new(
            insn_range(li),
            IlOp::LoadValue {
                dst: cid_reg,
                item: VarItem::new(
                    VarStorage::Immediate,
                    VarValue::Cid {
                        cid: cid::SMI.0,
                        is_smi: true,
                    },
                ),
            },
        );
        let branch = Il::new(
            insn_range(tb),
            IlOp::BranchIfSmi {
                obj,
                branch: tb.target(),
            },
        );
        let load_cid = Il::new(
            insn_range(lc),
            IlOp::LoadClassId { obj, cid: cid_reg },
        );

        self.bind(cid_reg, unknown_cid());
        self.emit(Il::new(
            AddrRange::new(li.addr(), lc.end_addr()),
            IlOp::LoadTaggedClassIdMayBeSmi {
                obj,
                cid: cid_reg,
                load_tag: Box::new(load_tag),
                branch: Box::new(branch),
                load_cid: Box::new(load_cid),
            },
        ));
        Some(3)
    }

    /// `ldrh wd, [obj, #1]`
    pub(super) fn try_load_class_id(&mut self, w: &[Insn]) -> Option<usize> {
        let lc = &w[0];
        if !is_class_id_load(lc) || !lc.rn().is_general() {
            return None;
        }

        self.bind(lc.rt(), unknown_cid());
        self.emit_over(
            w,
            1,
            IlOp::LoadClassId {
                obj: lc.rn(),
                cid: lc.rt(),
            },
        );
        Some(1)
    }

    /// `tbz obj, #0, target`
    pub(super) fn try_branch_if_smi(&mut self, w: &[Insn]) -> Option<usize> {
        let tb = &w[0];
        if tb.op() != Op::Tbz || tb.imm() != 0 {
            return None;
        }

        self.emit_over(
            w,
            1,
            IlOp::BranchIfSmi {
                obj: tb.rt(),
                branch: tb.target(),
            },
        );
        Some(1)
    }

    /// `sbfiz rd, rs, #1, #31`: tag a native int into a smi.
    pub(super) fn try_box_int64(&mut self, w: &[Insn]) -> Option<usize> {
        let bx = &w[0];
        if bx.op() != Op::Sbfiz || bx.imm() != 1 || bx.shift() != 31 {
            return None;
        }

        // A known source value survives boxing; the refined id narrows
        // to smi either way.
        let boxed = match self.regs.get(bx.rn()).and_then(|item| item.value()) {
            Some(v) => match v.as_integer() {
                Some((Some(raw), _)) => VarValue::int(raw << SMI_TAG_SIZE, cid::SMI),
                _ => VarValue::int_of(cid::SMI),
            },
            None => VarValue::int_of(cid::SMI),
        };
        self.bind(bx.rt(), boxed);
        self.emit_over(
            w,
            1,
            IlOp::BoxInt64 {
                obj: bx.rt(),
                src: bx.rn(),
            },
        );
        Some(1)
    }

    /// `sbfx rd, rs, #1, #31`: untag a smi into a native int.
    pub(super) fn try_load_int32(&mut self, w: &[Insn]) -> Option<usize> {
        let un = &w[0];
        if un.op() != Op::Sbfx || un.imm() != 1 || un.shift() != 31 {
            return None;
        }

        let native = match self
            .regs
            .get(un.rn())
            .and_then(|item| item.value())
            .and_then(VarValue::int_value)
        {
            Some(v) => VarValue::int(v, crate::value::TypeId::NATIVE_INT),
            None => VarValue::int_of(crate::value::TypeId::NATIVE_INT),
        };
        self.bind(un.rt(), native);
        self.emit_over(
            w,
            1,
            IlOp::LoadInt32 {
                dst: un.rt(),
                src: un.rn(),
            },
        );
        Some(1)
    }

    /// `add rx, heap_base, rx, uxtw`
    pub(super) fn try_decompress_pointer(&mut self, w: &[Insn]) -> Option<usize> {
        let add = &w[0];
        if add.op() != Op::Add
            || add.ext() != Extend::Uxtw
            || add.rn() != HEAP_BASE
            || add.rt() != add.rm()
        {
            return None;
        }

        self.emit_over(
            w,
            1,
            IlOp::DecompressPointer {
                loc: VarStorage::Register(add.rt()),
            },
        );
        Some(1)
    }

    /// Object-relative access outside the header: the untyped field
    /// load/store fallback.
    pub(super) fn try_field_access(&mut self, w: &[Insn]) -> Option<usize> {
        let acc = &w[0];
        if !(acc.is_load_off() || acc.is_store_off())
            || acc.flags().contains(InsnFlags::WRITEBACK)
        {
            return None;
        }
        let obj = acc.rn();
        if !obj.is_general() || obj == Reg::SP || obj == Reg::FP || obj == PP || obj == THR {
            return None;
        }
        if acc.imm() < 8 {
            return None;
        }

        let off = acc.imm();
        if acc.is_load_off() {
            self.bind(
                acc.rt(),
                VarValue::Expression {
                    text: format!("{obj}->field_{off:x}"),
                    cid: cid::ILLEGAL,
                },
            );
            self.emit_over(
                w,
                1,
                IlOp::LoadField {
                    dst: acc.rt(),
                    obj,
                    off,
                },
            );
        } else {
            self.emit_over(
                w,
                1,
                IlOp::StoreField {
                    val: acc.rt(),
                    obj,
                    off,
                },
            );
        }
        Some(1)
    }
}
