//! Array element access idioms.

use dartlift_asm::{Extend, Insn, InsnFlags, Op};

use super::Lifter;
use crate::consts::{ARRAY_DATA_OFFSET, HEAP_TAG, TYPED_DATA_OFFSET};
use crate::il::{ArrayOp, ArrayType, IlOp};
use crate::storage::VarStorage;
use crate::value::{cid, VarValue};

/// Tagged-pointer-adjusted data offsets an element access lands on.
const LIST_DATA: i64 = ARRAY_DATA_OFFSET - HEAP_TAG;
const TYPED_DATA: i64 = TYPED_DATA_OFFSET - HEAP_TAG;

fn flavor(value: Option<&VarValue>, typed_slot: bool) -> ArrayType {
    match value {
        Some(VarValue::Array { .. }) | Some(VarValue::GrowableArray { .. }) => ArrayType::List,
        Some(v) => match cid::typed_data_elem(v.type_id()) {
            Some((_, true)) => ArrayType::TypedSigned,
            Some((_, false)) => ArrayType::TypedUnsigned,
            None if typed_slot => ArrayType::TypedUnknown,
            None => ArrayType::Unknown,
        },
        None if typed_slot => ArrayType::TypedUnknown,
        None => ArrayType::Unknown,
    }
}

impl<'e> Lifter<'e> {
    /// Indexed element access: an address computation folding the index,
    /// then the data-offset load or store. Also matches the
    /// immediate-index form against an array known in the register file.
    pub(super) fn try_array_element(&mut self, w: &[Insn]) -> Option<usize> {
        if let Some(consumed) = self.try_computed_index(w) {
            return Some(consumed);
        }
        self.try_immediate_index(w)
    }

    /// `add tmp, arr, idx, lsl #s` ; `ldur/stur rd, [tmp, #data]`
    fn try_computed_index(&mut self, w: &[Insn]) -> Option<usize> {
        let [add, acc, ..] = w else { return None };
        if add.op() != Op::Add || !matches!(add.ext(), Extend::Lsl | Extend::Uxtw) {
            return None;
        }
        if !(acc.is_load_off() || acc.is_store_off())
            || acc.flags().contains(InsnFlags::WRITEBACK)
            || acc.rn() != add.rt()
        {
            return None;
        }
        if acc.imm() != LIST_DATA && acc.imm() != TYPED_DATA {
            return None;
        }

        let (arr, idx) = (add.rn(), add.rm());
        let typed_slot = acc.imm() == TYPED_DATA;
        let op = ArrayOp {
            size: acc.access_size(),
            is_load: acc.is_load_off(),
            arr_type: flavor(
                self.regs.get(arr).and_then(|item| item.value()),
                typed_slot,
            ),
        };

        if op.is_load {
            self.bind(
                acc.rt(),
                VarValue::Expression {
                    text: format!("{arr}[{idx}]"),
                    cid: cid::ILLEGAL,
                },
            );
            self.emit_over(
                w,
                2,
                IlOp::LoadArrayElement {
                    dst: acc.rt(),
                    arr,
                    idx: VarStorage::Register(idx),
                    op,
                },
            );
        } else {
            self.emit_over(
                w,
                2,
                IlOp::StoreArrayElement {
                    val: acc.rt(),
                    arr,
                    idx: VarStorage::Register(idx),
                    op,
                },
            );
        }
        Some(2)
    }

    /// `ldur/stur rd, [arr, #data + n*size]` against an array the
    /// register file knows about.
    fn try_immediate_index(&mut self, w: &[Insn]) -> Option<usize> {
        let acc = &w[0];
        if !(acc.is_load_off() || acc.is_store_off())
            || acc.flags().contains(InsnFlags::WRITEBACK)
        {
            return None;
        }
        let arr = acc.rn();
        let known_array = matches!(
            self.regs.get(arr).and_then(|item| item.value()),
            Some(VarValue::Array { .. }) | Some(VarValue::GrowableArray { .. })
        );
        if !known_array || acc.imm() < LIST_DATA {
            return None;
        }

        let size = acc.access_size();
        let index = (acc.imm() - LIST_DATA) / size as i64;
        let op = ArrayOp {
            size,
            is_load: acc.is_load_off(),
            arr_type: ArrayType::List,
        };

        if op.is_load {
            self.bind(
                acc.rt(),
                VarValue::Expression {
                    text: format!("{arr}[{index}]"),
                    cid: cid::ILLEGAL,
                },
            );
            self.emit_over(
                w,
                1,
                IlOp::LoadArrayElement {
                    dst: acc.rt(),
                    arr,
                    idx: VarStorage::SmallImm(index),
                    op,
                },
            );
        } else {
            self.emit_over(
                w,
                1,
                IlOp::StoreArrayElement {
                    val: acc.rt(),
                    arr,
                    idx: VarStorage::SmallImm(index),
                    op,
                },
            );
        }
        Some(1)
    }
}
