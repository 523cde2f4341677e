//! Static field table idioms.

use dartlift_asm::{Cond, Insn, InsnFlags, Op};

use super::Lifter;
use crate::consts::{PP, THR, THREAD_FIELD_TABLE};
use crate::env::{FunctionKind, PoolEntry};
use crate::il::IlOp;
use crate::storage::VarStorage;
use crate::value::{cid, VarItem, VarValue};

impl<'e> Lifter<'e> {
    fn is_field_table_load(&self, insn: &Insn) -> bool {
        insn.op() == Op::Ldr
            && !insn.flags().contains(InsnFlags::WRITEBACK)
            && insn.rn() == THR
            && self.env.thread.name(insn.imm()) == Some(THREAD_FIELD_TABLE)
    }

    /// The late-static-field fast path: load the slot, compare against
    /// the sentinel, and call the init stub with the field staged from
    /// the pool. Collapsed into a single node.
    pub(super) fn try_init_late_static_field(&mut self, w: &[Insn]) -> Option<usize> {
        let [tbl, slot, sent, cmp, br, fld, call, ..] = w else {
            return None;
        };
        if !self.is_field_table_load(tbl) {
            return None;
        }
        if slot.op() != Op::Ldr
            || slot.flags().contains(InsnFlags::WRITEBACK)
            || slot.rn() != tbl.rt()
        {
            return None;
        }
        if sent.op() != Op::Ldr || sent.rn() != PP
            || !matches!(self.env.pool.at(sent.imm()), Some(PoolEntry::Sentinel))
        {
            return None;
        }
        if cmp.op() != Op::Cmp || cmp.rn() != slot.rt() || cmp.rm() != sent.rt() {
            return None;
        }
        if br.op() != Op::BCond || br.cond() != Cond::Ne || br.target() != call.end_addr() {
            return None;
        }
        if fld.op() != Op::Ldr || fld.rn() != PP {
            return None;
        }
        let PoolEntry::Field(fid) = self.env.pool.at(fld.imm())? else {
            return None;
        };
        if call.op() != Op::Bl {
            return None;
        }
        let stub = self.env.functions.at(call.target())?;
        if stub.kind != FunctionKind::InitLateStaticFieldStub {
            return None;
        }

        let field = self.env.fields.get(*fid)?;
        let dst = slot.rt();
        self.apply_call_effects();
        self.bind(
            dst,
            VarValue::Expression {
                text: format!("static_{}", field.name),
                cid: cid::ILLEGAL,
            },
        );
        self.emit_over(w, 7, IlOp::InitLateStaticField { dst, field });
        Some(7)
    }

    /// Plain static field table access: the table pointer from the
    /// thread structure, then the slot load or store.
    pub(super) fn try_static_field(&mut self, w: &[Insn]) -> Option<usize> {
        let [tbl, acc, ..] = w else { return None };
        if !self.is_field_table_load(tbl) {
            return None;
        }
        if acc.flags().contains(InsnFlags::WRITEBACK) || acc.rn() != tbl.rt() {
            return None;
        }

        let off = acc.imm();
        if acc.is_load_off() {
            self.bind_item(
                acc.rt(),
                VarItem::new(
                    VarStorage::Static(off),
                    VarValue::Expression {
                        text: format!("static_{off:#x}"),
                        cid: cid::ILLEGAL,
                    },
                ),
            );
            self.emit_over(
                w,
                2,
                IlOp::LoadStaticField {
                    dst: acc.rt(),
                    off,
                },
            );
        } else if acc.is_store_off() {
            self.emit_over(
                w,
                2,
                IlOp::StoreStaticField {
                    src: acc.rt(),
                    off,
                },
            );
        } else {
            return None;
        }
        Some(2)
    }
}
