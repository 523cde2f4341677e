//! The pattern-recognition engine.
//!
//! The lifter walks a decoded instruction stream once, trying a fixed
//! priority-ordered list of recognizers against the window at the head of
//! the stream. The first recognizer that matches consumes its window,
//! emits one (possibly composite) IL node, and updates the register file.
//! When none match, one `Unknown` node is emitted and the stream advances
//! by a single instruction; a miss is never an error.

mod array;
mod call;
mod frame;
mod load;
mod object;
mod statics;

use std::mem;

use dartlift_asm::{Insn, Reg};
use tracing::{debug, trace};

use crate::consts::NULL_REG;
use crate::env::RuntimeEnv;
use crate::error::LiftError;
use crate::il::{AddrRange, Il, IlKind, IlOp};
use crate::storage::VarStorage;
use crate::value::{cid, VarItem, VarValue};

/// Register file: the most recent assignment into each machine register.
///
/// Private side state of a run; it never appears in the emitted IL.
struct RegFile<'e> {
    slots: [Option<VarItem<'e>>; Reg::COUNT],
}

impl<'e> RegFile<'e> {
    fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    fn get(&self, reg: Reg) -> Option<&VarItem<'e>> {
        self.slots[reg.index()].as_ref()
    }

    fn set(&mut self, reg: Reg, item: VarItem<'e>) {
        if reg != Reg::ZR {
            self.slots[reg.index()] = Some(item);
        }
    }

    fn clear(&mut self, reg: Reg) {
        self.slots[reg.index()] = None;
    }

    fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        // The null cache register is live on entry to every function.
        self.set(
            NULL_REG,
            VarItem::new(VarStorage::Register(NULL_REG), VarValue::Null),
        );
    }
}

/// Lifts one decoded function body at a time against a fixed runtime view.
pub struct Lifter<'e> {
    env: &'e RuntimeEnv,
    regs: RegFile<'e>,
    out: Vec<Il<'e>>,
    frame_entered: bool,
    in_prologue: bool,
}

impl<'e> Lifter<'e> {
    /// A lifter over the populated runtime view.
    pub fn new(env: &'e RuntimeEnv) -> Self {
        Self {
            env,
            regs: RegFile::new(),
            out: Vec::new(),
            frame_entered: false,
            in_prologue: false,
        }
    }

    /// Lift a decoded function body into IL.
    ///
    /// Recognizers run in this priority order; composites whose first
    /// instruction also starts a shorter pattern come before the shorter
    /// one:
    ///
    /// 1. frame: enter, leave, stack allocation, parameter setup,
    ///    stack-overflow check, register save/restore
    /// 2. class ids: the tagged-cid composite, then its standalone parts,
    ///    boxing, unboxing, pointer decompression
    /// 3. stub composites: async init, type test, closure call
    /// 4. pool and immediate loads, register moves
    /// 5. static fields: late init, then plain table access
    /// 6. arrays
    /// 7. calls: allocation stubs, write barriers, leaf runtime, dispatch
    ///    table, direct
    /// 8. return, thread loads, object field access
    pub fn lift(&mut self, insns: &[Insn]) -> Result<Vec<Il<'e>>, LiftError> {
        self.reset();
        validate(insns)?;

        let mut idx = 0;
        while idx < insns.len() {
            let consumed = self.step(&insns[idx..]);
            debug_assert!(consumed >= 1);
            idx += consumed;
        }

        Ok(mem::take(&mut self.out))
    }

    fn reset(&mut self) {
        self.regs.reset();
        self.out.clear();
        self.frame_entered = false;
        self.in_prologue = false;
    }

    fn step(&mut self, w: &[Insn]) -> usize {
        let recognizers: &[fn(&mut Self, &[Insn]) -> Option<usize>] = &[
            Self::try_enter_frame,
            Self::try_leave_frame,
            Self::try_allocate_stack,
            Self::try_setup_parameters,
            Self::try_check_stack_overflow,
            Self::try_save_register,
            Self::try_restore_register,
            Self::try_load_tagged_class_id_may_be_smi,
            Self::try_load_class_id,
            Self::try_branch_if_smi,
            Self::try_box_int64,
            Self::try_load_int32,
            Self::try_decompress_pointer,
            Self::try_init_async,
            Self::try_test_type,
            Self::try_closure_call,
            Self::try_load_pool,
            Self::try_store_pool,
            Self::try_load_imm,
            Self::try_move_reg,
            Self::try_init_late_static_field,
            Self::try_static_field,
            Self::try_array_element,
            Self::try_allocate_object,
            Self::try_write_barrier,
            Self::try_leaf_runtime_call,
            Self::try_gdt_call,
            Self::try_call,
            Self::try_return,
            Self::try_load_thread,
            Self::try_field_access,
        ];

        for recognize in recognizers {
            if let Some(consumed) = recognize(self, w) {
                self.end_prologue_unless_frame_setup();
                return consumed;
            }
        }

        debug!(addr = w[0].addr(), op = %w[0].op(), "no recognizer matched");
        self.emit(Il::new(
            insn_range(&w[0]),
            IlOp::Unknown {
                mnemonic: w[0].op().to_string(),
            },
        ));
        self.in_prologue = false;
        1
    }

    fn end_prologue_unless_frame_setup(&mut self) {
        let still_prologue = matches!(
            self.out.last().map(Il::kind),
            Some(IlKind::EnterFrame | IlKind::AllocateStack | IlKind::CheckStackOverflow)
        );
        if !still_prologue {
            self.in_prologue = false;
        }
    }

    fn emit(&mut self, il: Il<'e>) {
        if let Some(prev) = self.out.last() {
            debug_assert!(
                prev.range().start <= il.range().start,
                "IL emission went backwards"
            );
        }
        trace!(start = il.range().start, node = %il, "emit");
        self.out.push(il);
    }

    fn emit_over(&mut self, w: &[Insn], consumed: usize, op: IlOp<'e>) {
        self.emit(Il::new(window_range(w, consumed), op));
    }

    /// Bind `reg` to a value living in `reg` itself.
    fn bind(&mut self, reg: Reg, value: VarValue<'e>) {
        self.regs
            .set(reg, VarItem::new(VarStorage::Register(reg), value));
    }

    fn bind_item(&mut self, reg: Reg, item: VarItem<'e>) {
        self.regs.set(reg, item);
    }

    /// Drop everything a call clobbers and record the call result in `x0`.
    fn apply_call_effects(&mut self) {
        for n in 0..=17 {
            self.regs.clear(Reg::x(n));
        }
        for n in 0..=31 {
            self.regs.clear(Reg::d(n));
        }
        self.regs.set(
            Reg::x(0),
            VarItem::new(
                VarStorage::Call,
                VarValue::Expression {
                    text: "ret".to_string(),
                    cid: cid::ILLEGAL,
                },
            ),
        );
    }
}

fn validate(insns: &[Insn]) -> Result<(), LiftError> {
    let mut prev_end = None;
    for insn in insns {
        if insn.addr() % Insn::LEN as u64 != 0 {
            return Err(LiftError::UnalignedAddress(insn.addr()));
        }
        if let Some(end) = prev_end {
            if insn.addr() < end {
                return Err(LiftError::NonMonotonicAddress(insn.addr()));
            }
        }
        prev_end = Some(insn.end_addr());
    }
    Ok(())
}

fn insn_range(insn: &Insn) -> AddrRange {
    AddrRange::new(insn.addr(), insn.end_addr())
}

fn window_range(w: &[Insn], consumed: usize) -> AddrRange {
    AddrRange::new(w[0].addr(), w[consumed - 1].end_addr())
}
