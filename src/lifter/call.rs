//! Call idioms: stubs, leaf runtime entries, dispatch table, direct.

use dartlift_asm::{Insn, InsnFlags, Op, Reg};

use super::Lifter;
use crate::consts::{ARGS_DESC_REG, CLOSURE_ENTRY_OFFSET, DISPATCH_TABLE_REG, GDT_CID_REG, PP, THR};
use crate::env::{FunctionKind, PoolEntry};
use crate::il::{AddrRange, Il, IlKind, IlOp};
use crate::storage::VarStorage;
use crate::value::{VarItem, VarValue};

fn is_pool_load(insn: &Insn) -> bool {
    insn.op() == Op::Ldr && !insn.flags().contains(InsnFlags::WRITEBACK) && insn.rn() == PP
}

impl<'e> Lifter<'e> {
    /// Pool load of the future value type into `x0`, then a call to the
    /// async-init stub.
    pub(super) fn try_init_async(&mut self, w: &[Insn]) -> Option<usize> {
        let [ld, call, ..] = w else { return None };
        if !is_pool_load(ld) || ld.rt() != Reg::x(0) || call.op() != Op::Bl {
            return None;
        }
        let PoolEntry::Type(tid) = self.env.pool.at(ld.imm())? else {
            return None;
        };
        let stub = self.env.functions.at(call.target())?;
        if stub.kind != FunctionKind::InitAsyncStub {
            return None;
        }

        let ret_type = self.env.types.get(*tid)?;
        self.apply_call_effects();
        self.emit_over(w, 2, IlOp::InitAsync { ret_type });
        Some(2)
    }

    /// Pool load of the checked type into the type-test convention
    /// register, then a call to a type-test stub.
    pub(super) fn try_test_type(&mut self, w: &[Insn]) -> Option<usize> {
        let [ld, call, ..] = w else { return None };
        if !is_pool_load(ld) || ld.rt() != Reg::x(8) || call.op() != Op::Bl {
            return None;
        }
        let tid = match self.env.pool.at(ld.imm())? {
            PoolEntry::Type(tid)
            | PoolEntry::FunctionType(tid)
            | PoolEntry::RecordType(tid) => *tid,
            _ => return None,
        };
        let stub = self.env.functions.at(call.target())?;
        if stub.kind != FunctionKind::TypeTestStub {
            return None;
        }

        let type_name = self.env.types.get(tid)?.name.clone();
        self.apply_call_effects();
        self.emit_over(
            w,
            2,
            IlOp::TestType {
                src: Reg::x(0),
                type_name,
            },
        );
        Some(2)
    }

    /// Entry point load from a closure plus `blr`, with the arguments
    /// descriptor already staged in its convention register.
    pub(super) fn try_closure_call(&mut self, w: &[Insn]) -> Option<usize> {
        let [ld, br, ..] = w else { return None };
        if !ld.is_load_off()
            || ld.flags().contains(InsnFlags::WRITEBACK)
            || ld.imm() != CLOSURE_ENTRY_OFFSET
            || !ld.rn().is_general()
            || ld.rn() == THR
            || ld.rn() == PP
        {
            return None;
        }
        if br.op() != Op::Blr || br.rn() != ld.rt() {
            return None;
        }
        let VarStorage::Pool(desc_off) = self.regs.get(ARGS_DESC_REG)?.storage else {
            return None;
        };
        let PoolEntry::ArgsDesc {
            n_args,
            n_type_args,
        } = self.env.pool.at(desc_off)?
        else {
            return None;
        };
        let (n_args, n_type_args) = (*n_args, *n_type_args);

        self.apply_call_effects();
        self.emit_over(
            w,
            2,
            IlOp::ClosureCall {
                n_args,
                n_type_args,
            },
        );
        Some(2)
    }

    /// `bl` to an inline-allocation stub.
    pub(super) fn try_allocate_object(&mut self, w: &[Insn]) -> Option<usize> {
        let call = &w[0];
        if call.op() != Op::Bl {
            return None;
        }
        let stub = self.env.functions.at(call.target())?;
        let FunctionKind::AllocateStub { cid } = stub.kind else {
            return None;
        };
        let cls = self.env.classes.get(cid)?;

        self.apply_call_effects();
        self.bind_item(
            Reg::x(0),
            VarItem::new(VarStorage::Call, VarValue::Instance(cls)),
        );
        self.emit_over(
            w,
            1,
            IlOp::AllocateObject {
                dst: Reg::x(0),
                cls,
            },
        );
        Some(1)
    }

    /// `bl` to a write-barrier helper. The barrier describes the
    /// immediately preceding store when there is one.
    pub(super) fn try_write_barrier(&mut self, w: &[Insn]) -> Option<usize> {
        let call = &w[0];
        if call.op() != Op::Bl {
            return None;
        }
        let stub = self.env.functions.at(call.target())?;
        let FunctionKind::WriteBarrierStub { array } = stub.kind else {
            return None;
        };

        let (obj, val) = match self.out.last().map(Il::op) {
            Some(IlOp::StoreField { val, obj, .. }) => (*obj, *val),
            Some(IlOp::StoreArrayElement { val, arr, .. }) => (*arr, *val),
            _ => (Reg::x(1), Reg::x(0)),
        };
        self.emit_over(
            w,
            1,
            IlOp::WriteBarrier {
                obj,
                val,
                is_array: array,
            },
        );
        Some(1)
    }

    /// `ldr tmp, [THR, #off]` ; `blr tmp`: a leaf runtime call. The
    /// parameter-setup moves emitted just before it fold into the node.
    pub(super) fn try_leaf_runtime_call(&mut self, w: &[Insn]) -> Option<usize> {
        let [ld, br, ..] = w else { return None };
        if ld.op() != Op::Ldr || ld.flags().contains(InsnFlags::WRITEBACK) || ld.rn() != THR {
            return None;
        }
        if br.op() != Op::Blr || br.rn() != ld.rt() {
            return None;
        }

        let thr_off = ld.imm();
        let leaf = self.env.thread.leaf(thr_off);

        let mut moves = Vec::new();
        loop {
            match self.out.pop() {
                Some(il) if il.kind() == IlKind::MoveReg => moves.push(il),
                Some(il) => {
                    self.out.push(il);
                    break;
                }
                None => break,
            }
        }
        moves.reverse();

        let start = moves
            .first()
            .map(|m| m.range().start)
            .unwrap_or_else(|| ld.addr());
        self.apply_call_effects();
        self.emit(Il::new(
            AddrRange::new(start, br.end_addr()),
            IlOp::CallLeafRuntime {
                thr_off,
                leaf,
                moves,
            },
        ));
        Some(2)
    }

    /// Dispatch-table call: selector offset added to the class id,
    /// indexed load from the table, `blr`.
    pub(super) fn try_gdt_call(&mut self, w: &[Insn]) -> Option<usize> {
        // `add lr, cid, #off` ; `ldr lr, [gdt, lr, lsl #3]` ; `blr lr`
        if let [add, ld, br, ..] = w {
            if add.op() == Op::AddI
                && add.rt() == GDT_CID_REG
                && self.is_gdt_index_load(ld)
                && br.op() == Op::Blr
                && br.rn() == GDT_CID_REG
            {
                self.apply_call_effects();
                self.emit_over(w, 3, IlOp::GdtCall { off: add.imm() });
                return Some(3);
            }
        }
        // Offset-free form.
        if let [ld, br, ..] = w {
            if self.is_gdt_index_load(ld) && br.op() == Op::Blr && br.rn() == GDT_CID_REG {
                self.apply_call_effects();
                self.emit_over(w, 2, IlOp::GdtCall { off: 0 });
                return Some(2);
            }
        }
        None
    }

    fn is_gdt_index_load(&self, ld: &Insn) -> bool {
        ld.op() == Op::LdrR
            && ld.rt() == GDT_CID_REG
            && ld.rn() == DISPATCH_TABLE_REG
            && ld.rm() == GDT_CID_REG
            && ld.shift() == 3
    }

    /// `bl addr`: a direct call, resolved against the function database
    /// when possible.
    pub(super) fn try_call(&mut self, w: &[Insn]) -> Option<usize> {
        let call = &w[0];
        if call.op() != Op::Bl {
            return None;
        }

        let addr = call.target();
        let target = self
            .env
            .functions
            .at(addr)
            .or_else(|| self.env.functions.containing(addr));
        self.apply_call_effects();
        self.emit_over(w, 1, IlOp::Call { target, addr });
        Some(1)
    }
}
