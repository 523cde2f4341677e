//! Pool, immediate, and register-move idioms.

use dartlift_asm::{Insn, InsnFlags, Op, Reg};

use super::Lifter;
use crate::consts::{PP, THR};
use crate::il::IlOp;
use crate::storage::VarStorage;
use crate::value::{cid, TypeId, VarItem, VarValue};

impl<'e> Lifter<'e> {
    /// `ldr rx, [PP, #off]`, or `add rx, PP, #off` for pool object
    /// addresses. The pool entry is decoded into the loaded value.
    pub(super) fn try_load_pool(&mut self, w: &[Insn]) -> Option<usize> {
        let ld = &w[0];
        let pool_read = (ld.op() == Op::Ldr && !ld.flags().contains(InsnFlags::WRITEBACK))
            || ld.op() == Op::AddI;
        if !pool_read || ld.rn() != PP {
            return None;
        }

        let off = ld.imm();
        let value = self.env.pool_value(off).unwrap_or_else(|| VarValue::Expression {
            text: format!("PP_{off:#x}"),
            cid: cid::ILLEGAL,
        });
        let item = VarItem::new(VarStorage::Pool(off), value);
        self.bind_item(ld.rt(), item.clone());
        self.emit_over(w, 1, IlOp::LoadValue { dst: ld.rt(), item });
        Some(1)
    }

    /// `str rx, [PP, #off]`
    pub(super) fn try_store_pool(&mut self, w: &[Insn]) -> Option<usize> {
        let st = &w[0];
        if st.op() != Op::Str || st.flags().contains(InsnFlags::WRITEBACK) || st.rn() != PP {
            return None;
        }

        self.emit_over(
            w,
            1,
            IlOp::StoreObjectPool {
                src: st.rt(),
                off: st.imm(),
            },
        );
        Some(1)
    }

    /// `movz rd, #imm` with any number of `movk` refinements, or `movn`.
    pub(super) fn try_load_imm(&mut self, w: &[Insn]) -> Option<usize> {
        let head = &w[0];
        let base = head.imm() << head.shift();
        let mut val = match head.op() {
            Op::Movz => base,
            Op::Movn => !base,
            _ => return None,
        };

        let mut consumed = 1;
        while let Some(next) = w.get(consumed) {
            if next.op() != Op::Movk || next.rt() != head.rt() {
                break;
            }
            val |= next.imm() << next.shift();
            consumed += 1;
        }

        let item = VarItem::new(
            VarStorage::Immediate,
            VarValue::int(val, TypeId::NATIVE_INT),
        );
        self.bind_item(head.rt(), item.clone());
        self.emit_over(
            w,
            consumed,
            IlOp::LoadValue {
                dst: head.rt(),
                item,
            },
        );
        Some(consumed)
    }

    /// `mov rd, rs`, the `orr rd, zr, rs` spelling, or an `fmov` between
    /// the register files.
    pub(super) fn try_move_reg(&mut self, w: &[Insn]) -> Option<usize> {
        let mv = &w[0];
        let (dst, src) = match mv.op() {
            Op::Mov => (mv.rt(), mv.rm()),
            Op::Fmov => (mv.rt(), mv.rn()),
            Op::Orr if mv.rn() == Reg::ZR => (mv.rt(), mv.rm()),
            _ => return None,
        };

        // Ownership of the tracked item follows the value to its new
        // storage.
        match self.regs.get(src).cloned() {
            Some(mut item) => {
                item.storage = VarStorage::Register(dst);
                self.bind_item(dst, item);
            }
            None => self.regs.clear(dst),
        }
        self.emit_over(w, 1, IlOp::MoveReg { dst, src });
        Some(1)
    }

    /// `ldr rd, [THR, #off]` not consumed by a larger idiom: the slot
    /// value named by the thread layout.
    pub(super) fn try_load_thread(&mut self, w: &[Insn]) -> Option<usize> {
        let ld = &w[0];
        if ld.op() != Op::Ldr || ld.flags().contains(InsnFlags::WRITEBACK) || ld.rn() != THR {
            return None;
        }

        let off = ld.imm();
        let text = match self.env.thread.name(off) {
            Some(name) => format!("thr_{name}"),
            None => format!("thr_{off:#x}"),
        };
        let item = VarItem::new(
            VarStorage::Thread(off),
            VarValue::Expression {
                text,
                cid: cid::ILLEGAL,
            },
        );
        self.bind_item(ld.rt(), item.clone());
        self.emit_over(w, 1, IlOp::LoadValue { dst: ld.rt(), item });
        Some(1)
    }
}
