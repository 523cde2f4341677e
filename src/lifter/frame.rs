//! Frame setup and teardown idioms.

use dartlift_asm::{Cond, Insn, InsnFlags, Op, Reg};

use super::Lifter;
use crate::consts::THR;
use crate::il::{IlOp, ParamSpill};
use crate::storage::VarStorage;
use crate::value::VarValue;

fn is_fp_lr_pair(a: Reg, b: Reg) -> bool {
    (a == Reg::FP && b == Reg::LR) || (a == Reg::LR && b == Reg::FP)
}

impl<'e> Lifter<'e> {
    /// `stp fp, lr, [sp, #-N]!` ; `mov fp, sp`
    pub(super) fn try_enter_frame(&mut self, w: &[Insn]) -> Option<usize> {
        let [stp, mov, ..] = w else { return None };
        if stp.op() != Op::Stp
            || !stp.flags().contains(InsnFlags::PRE_INDEX)
            || stp.rn() != Reg::SP
            || !is_fp_lr_pair(stp.rt(), stp.rt2())
        {
            return None;
        }
        if mov.op() != Op::Mov || mov.rt() != Reg::FP || mov.rm() != Reg::SP {
            return None;
        }

        self.frame_entered = true;
        self.in_prologue = true;
        self.emit_over(w, 2, IlOp::EnterFrame);
        Some(2)
    }

    /// `mov sp, fp` ; `ldp fp, lr, [sp], #N`
    pub(super) fn try_leave_frame(&mut self, w: &[Insn]) -> Option<usize> {
        let [mov, ldp, ..] = w else { return None };
        if mov.op() != Op::Mov || mov.rt() != Reg::SP || mov.rm() != Reg::FP {
            return None;
        }
        if ldp.op() != Op::Ldp
            || !ldp.flags().contains(InsnFlags::POST_INDEX)
            || ldp.rn() != Reg::SP
            || !is_fp_lr_pair(ldp.rt(), ldp.rt2())
        {
            return None;
        }

        self.frame_entered = false;
        self.emit_over(w, 2, IlOp::LeaveFrame);
        Some(2)
    }

    /// `sub sp, sp, #N` inside an entered frame.
    pub(super) fn try_allocate_stack(&mut self, w: &[Insn]) -> Option<usize> {
        let sub = &w[0];
        if sub.op() != Op::SubI || sub.rt() != Reg::SP || sub.rn() != Reg::SP {
            return None;
        }
        if !self.frame_entered {
            return None;
        }

        self.emit_over(w, 1, IlOp::AllocateStack { size: sub.imm() });
        Some(1)
    }

    /// Prologue spills of incoming argument registers to frame slots.
    pub(super) fn try_setup_parameters(&mut self, w: &[Insn]) -> Option<usize> {
        if !self.in_prologue {
            return None;
        }

        let is_arg_spill = |insn: &Insn| {
            insn.is_store_off()
                && !insn.flags().contains(InsnFlags::WRITEBACK)
                && insn.rn() == Reg::FP
                && insn.imm() < 0
                && insn.rt().is_general()
                && insn.rt().index() <= 7
        };

        let count = w.iter().take_while(|&insn| is_arg_spill(insn)).count();
        if count == 0 {
            return None;
        }

        let params: Vec<ParamSpill> = w[..count]
            .iter()
            .enumerate()
            .map(|(index, insn)| ParamSpill {
                index,
                src: insn.rt(),
                fp_off: insn.imm(),
            })
            .collect();
        for spill in &params {
            self.bind_item(
                spill.src,
                crate::value::VarItem::new(
                    VarStorage::Argument(spill.index),
                    VarValue::Param(spill.index),
                ),
            );
        }

        self.in_prologue = false;
        self.emit_over(w, count, IlOp::SetupParameters { params });
        Some(count)
    }

    /// `ldr tmp, [THR, #stack_limit]` ; `cmp sp, tmp` ; `b.ls overflow`
    pub(super) fn try_check_stack_overflow(&mut self, w: &[Insn]) -> Option<usize> {
        let [ld, cmp, br, ..] = w else { return None };
        if ld.op() != Op::Ldr || ld.rn() != THR || ld.flags().contains(InsnFlags::WRITEBACK) {
            return None;
        }
        if cmp.op() != Op::Cmp || cmp.rn() != Reg::SP || cmp.rm() != ld.rt() {
            return None;
        }
        if br.op() != Op::BCond || br.cond() != Cond::Ls {
            return None;
        }

        self.emit_over(w, 3, IlOp::CheckStackOverflow { branch: br.target() });
        Some(3)
    }

    /// `str rx, [sp, #-N]!`
    pub(super) fn try_save_register(&mut self, w: &[Insn]) -> Option<usize> {
        let push = &w[0];
        if push.op() != Op::Str
            || !push.flags().contains(InsnFlags::PRE_INDEX)
            || push.rn() != Reg::SP
            || push.imm() >= 0
        {
            return None;
        }

        self.emit_over(w, 1, IlOp::SaveRegister { reg: push.rt() });
        Some(1)
    }

    /// `ldr rx, [sp], #N`
    pub(super) fn try_restore_register(&mut self, w: &[Insn]) -> Option<usize> {
        let pop = &w[0];
        if pop.op() != Op::Ldr
            || !pop.flags().contains(InsnFlags::POST_INDEX)
            || pop.rn() != Reg::SP
            || pop.imm() <= 0
        {
            return None;
        }

        self.emit_over(w, 1, IlOp::RestoreRegister { reg: pop.rt() });
        Some(1)
    }

    /// `ret`
    pub(super) fn try_return(&mut self, w: &[Insn]) -> Option<usize> {
        if w[0].op() != Op::Ret {
            return None;
        }

        self.emit_over(w, 1, IlOp::Return);
        Some(1)
    }
}
