//! The IL node family the lifter emits.
//!
//! Every node carries the source address range it was lifted from.
//! Composite nodes own their sub-nodes exclusively; nothing hands out a
//! second path to a child. Nodes are immutable once constructed and the
//! rendered form of each node is the golden-output contract.

use core::fmt;

use dartlift_asm::{Reg, Word};
use itertools::Itertools;

use crate::env::{Class, DartType, Field, Function, LeafFunction};
use crate::storage::VarStorage;
use crate::value::VarItem;

/// Byte-exclusive source address range of a lifted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrRange {
    /// First covered address.
    pub start: Word,
    /// Address one past the last covered instruction.
    pub end: Word,
}

impl AddrRange {
    /// A range over `[start, end)`. Must be non-empty and cover whole
    /// instructions.
    pub fn new(start: Word, end: Word) -> Self {
        assert!(start < end, "empty IL address range");
        assert!((end - start) % 4 == 0, "range not a multiple of the instruction width");
        Self { start, end }
    }

    /// Whether `other` lies entirely within this range.
    pub const fn covers(&self, other: &AddrRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}

/// Array flavor of an element access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayType {
    /// An object array.
    List,
    /// Typed data of unknown signedness.
    TypedUnknown,
    /// Signed typed data.
    TypedSigned,
    /// Unsigned typed data.
    TypedUnsigned,
    /// Nothing known about the array.
    Unknown,
}

/// Shape of an array element access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayOp {
    /// Element width in bytes.
    pub size: u8,
    /// Load or store.
    pub is_load: bool,
    /// Array flavor.
    pub arr_type: ArrayType,
}

impl ArrayOp {
    /// `log2` of the element width, or `255` for an unrecognized width.
    pub const fn size_log2(&self) -> u8 {
        match self.size {
            1 => 0,
            2 => 1,
            4 => 2,
            8 => 3,
            _ => 255,
        }
    }
}

impl fmt::Display for ArrayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}_{}", self.arr_type, self.size)
    }
}

/// One incoming-argument spill recorded by a `SetupParameters` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpill {
    /// Argument index.
    pub index: usize,
    /// Register the argument arrived in.
    pub src: Reg,
    /// Frame slot it was spilled to, as a byte offset from `fp`.
    pub fp_off: i64,
}

/// Discriminant of an IL node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[allow(missing_docs)]
pub enum IlKind {
    Unknown,
    EnterFrame,
    LeaveFrame,
    AllocateStack,
    CheckStackOverflow,
    CallLeafRuntime,
    LoadValue,
    StoreObjectPool,
    ClosureCall,
    MoveReg,
    DecompressPointer,
    SaveRegister,
    RestoreRegister,
    SetupParameters,
    InitAsync,
    GdtCall,
    Call,
    Return,
    BranchIfSmi,
    LoadClassId,
    LoadTaggedClassIdMayBeSmi,
    BoxInt64,
    LoadInt32,
    AllocateObject,
    LoadArrayElement,
    StoreArrayElement,
    LoadField,
    StoreField,
    InitLateStaticField,
    LoadStaticField,
    StoreStaticField,
    WriteBarrier,
    TestType,
}

/// Operation payload of an IL node.
#[derive(Debug, PartialEq)]
pub enum IlOp<'e> {
    /// A machine instruction no recognizer matched.
    Unknown {
        /// Mnemonic of the skipped instruction.
        mnemonic: String,
    },
    /// Standard two-instruction prolog.
    EnterFrame,
    /// Standard two-instruction epilog.
    LeaveFrame,
    /// Frame-local stack reservation.
    AllocateStack {
        /// Reserved bytes.
        size: i64,
    },
    /// Stack limit probe against the thread structure.
    CheckStackOverflow {
        /// Address of the overflow-handler branch target.
        branch: Word,
    },
    /// Call through a thread-structure entry to a leaf runtime function,
    /// with its parameter-setup moves folded in.
    CallLeafRuntime {
        /// Thread structure offset naming the callee.
        thr_off: i64,
        /// Leaf function signature, when the thread layout knows it.
        leaf: Option<&'e LeafFunction>,
        /// Parameter-setup moves, in emission order.
        moves: Vec<Il<'e>>,
    },
    /// Materialize a known value into a register.
    LoadValue {
        /// Destination register.
        dst: Reg,
        /// The assignment.
        item: VarItem<'e>,
    },
    /// Write a register into an object pool slot.
    StoreObjectPool {
        /// Source register.
        src: Reg,
        /// Pool byte offset.
        off: i64,
    },
    /// Indirect call through a closure's entry point.
    ClosureCall {
        /// Positional plus named argument count.
        n_args: i32,
        /// Type argument count.
        n_type_args: i32,
    },
    /// Register-to-register copy.
    MoveReg {
        /// Destination register.
        dst: Reg,
        /// Source register.
        src: Reg,
    },
    /// Explicit decompression of a compressed pointer.
    DecompressPointer {
        /// The storage holding the pointer.
        loc: VarStorage,
    },
    /// Push of a register into the frame save area.
    SaveRegister {
        /// Saved register.
        reg: Reg,
    },
    /// Pop of a register from the frame save area.
    RestoreRegister {
        /// Restored register.
        reg: Reg,
    },
    /// Prologue spill of incoming arguments to frame slots.
    SetupParameters {
        /// The spills, in prologue order.
        params: Vec<ParamSpill>,
    },
    /// Async function machinery initialization.
    InitAsync {
        /// Future value type of the function.
        ret_type: &'e DartType,
    },
    /// Dispatch-table call indexed by the receiver's class id.
    GdtCall {
        /// Per-call-site selector offset in bytes.
        off: i64,
    },
    /// Direct call.
    Call {
        /// Callee, when the function database resolves the target.
        target: Option<&'e Function>,
        /// Raw target address.
        addr: Word,
    },
    /// Return to caller.
    Return,
    /// Branch taken when a register holds a small integer.
    BranchIfSmi {
        /// Tested register.
        obj: Reg,
        /// Branch target address.
        branch: Word,
    },
    /// Class id load from an object header.
    LoadClassId {
        /// Object register.
        obj: Reg,
        /// Destination register of the id.
        cid: Reg,
    },
    /// Composite "cid of a maybe-smi object" idiom: a constant load of
    /// the tagged smi id, a smi branch, and a header class id load.
    LoadTaggedClassIdMayBeSmi {
        /// Object register.
        obj: Reg,
        /// Destination register of the id.
        cid: Reg,
        /// The constant load of the tagged smi id.
        load_tag: Box<Il<'e>>,
        /// The smi test.
        branch: Box<Il<'e>>,
        /// The header load.
        load_cid: Box<Il<'e>>,
    },
    /// Box a native integer.
    BoxInt64 {
        /// Destination (boxed) register.
        obj: Reg,
        /// Source (native) register.
        src: Reg,
    },
    /// Unbox/read a 32-bit integer.
    LoadInt32 {
        /// Destination (native) register.
        dst: Reg,
        /// Source (boxed) register.
        src: Reg,
    },
    /// Inline allocation of an instance, slow path elided.
    AllocateObject {
        /// Destination register.
        dst: Reg,
        /// Allocated class.
        cls: &'e Class,
    },
    /// Indexed array element read.
    LoadArrayElement {
        /// Destination register.
        dst: Reg,
        /// Array register.
        arr: Reg,
        /// Element index storage.
        idx: VarStorage,
        /// Access shape.
        op: ArrayOp,
    },
    /// Indexed array element write.
    StoreArrayElement {
        /// Value register.
        val: Reg,
        /// Array register.
        arr: Reg,
        /// Element index storage.
        idx: VarStorage,
        /// Access shape.
        op: ArrayOp,
    },
    /// Untyped object field read.
    LoadField {
        /// Destination register.
        dst: Reg,
        /// Object register.
        obj: Reg,
        /// Byte offset into the object.
        off: i64,
    },
    /// Untyped object field write.
    StoreField {
        /// Value register.
        val: Reg,
        /// Object register.
        obj: Reg,
        /// Byte offset into the object.
        off: i64,
    },
    /// Lazily initialize a late static field.
    InitLateStaticField {
        /// Destination register of the field value.
        dst: Reg,
        /// The field.
        field: &'e Field,
    },
    /// Static field table read.
    LoadStaticField {
        /// Destination register.
        dst: Reg,
        /// Field table byte offset.
        off: i64,
    },
    /// Static field table write.
    StoreStaticField {
        /// Source register.
        src: Reg,
        /// Field table byte offset.
        off: i64,
    },
    /// Generational-GC bookkeeping after a heap store.
    WriteBarrier {
        /// Stored-into object register.
        obj: Reg,
        /// Stored value register.
        val: Reg,
        /// Whether the store was an array element store.
        is_array: bool,
    },
    /// Runtime type check.
    TestType {
        /// Checked register.
        src: Reg,
        /// Rendered type name.
        type_name: String,
    },
}

/// One IL node: an operation plus the source range it was lifted from.
#[derive(Debug, PartialEq)]
pub struct Il<'e> {
    range: AddrRange,
    op: IlOp<'e>,
}

impl<'e> Il<'e> {
    /// A node over `range`. Composite payloads must already contain their
    /// children; their ranges must lie within `range`.
    pub fn new(range: AddrRange, op: IlOp<'e>) -> Self {
        if let IlOp::LoadTaggedClassIdMayBeSmi {
            load_tag,
            branch,
            load_cid,
            ..
        } = &op
        {
            debug_assert!(range.covers(load_tag.range()));
            debug_assert!(range.covers(branch.range()));
            debug_assert!(range.covers(load_cid.range()));
        }
        if let IlOp::CallLeafRuntime { moves, .. } = &op {
            debug_assert!(moves.iter().all(|m| range.covers(m.range())));
        }
        Self { range, op }
    }

    /// Source address range.
    pub const fn range(&self) -> &AddrRange {
        &self.range
    }

    /// Operation payload.
    pub const fn op(&self) -> &IlOp<'e> {
        &self.op
    }

    /// Discriminant of the operation.
    pub fn kind(&self) -> IlKind {
        match &self.op {
            IlOp::Unknown { .. } => IlKind::Unknown,
            IlOp::EnterFrame => IlKind::EnterFrame,
            IlOp::LeaveFrame => IlKind::LeaveFrame,
            IlOp::AllocateStack { .. } => IlKind::AllocateStack,
            IlOp::CheckStackOverflow { .. } => IlKind::CheckStackOverflow,
            IlOp::CallLeafRuntime { .. } => IlKind::CallLeafRuntime,
            IlOp::LoadValue { .. } => IlKind::LoadValue,
            IlOp::StoreObjectPool { .. } => IlKind::StoreObjectPool,
            IlOp::ClosureCall { .. } => IlKind::ClosureCall,
            IlOp::MoveReg { .. } => IlKind::MoveReg,
            IlOp::DecompressPointer { .. } => IlKind::DecompressPointer,
            IlOp::SaveRegister { .. } => IlKind::SaveRegister,
            IlOp::RestoreRegister { .. } => IlKind::RestoreRegister,
            IlOp::SetupParameters { .. } => IlKind::SetupParameters,
            IlOp::InitAsync { .. } => IlKind::InitAsync,
            IlOp::GdtCall { .. } => IlKind::GdtCall,
            IlOp::Call { .. } => IlKind::Call,
            IlOp::Return => IlKind::Return,
            IlOp::BranchIfSmi { .. } => IlKind::BranchIfSmi,
            IlOp::LoadClassId { .. } => IlKind::LoadClassId,
            IlOp::LoadTaggedClassIdMayBeSmi { .. } => IlKind::LoadTaggedClassIdMayBeSmi,
            IlOp::BoxInt64 { .. } => IlKind::BoxInt64,
            IlOp::LoadInt32 { .. } => IlKind::LoadInt32,
            IlOp::AllocateObject { .. } => IlKind::AllocateObject,
            IlOp::LoadArrayElement { .. } => IlKind::LoadArrayElement,
            IlOp::StoreArrayElement { .. } => IlKind::StoreArrayElement,
            IlOp::LoadField { .. } => IlKind::LoadField,
            IlOp::StoreField { .. } => IlKind::StoreField,
            IlOp::InitLateStaticField { .. } => IlKind::InitLateStaticField,
            IlOp::LoadStaticField { .. } => IlKind::LoadStaticField,
            IlOp::StoreStaticField { .. } => IlKind::StoreStaticField,
            IlOp::WriteBarrier { .. } => IlKind::WriteBarrier,
            IlOp::TestType { .. } => IlKind::TestType,
        }
    }
}

impl fmt::Display for Il<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            IlOp::Unknown { mnemonic } => write!(f, "unknown: {mnemonic}"),
            IlOp::EnterFrame => f.write_str("EnterFrame"),
            IlOp::LeaveFrame => f.write_str("LeaveFrame"),
            IlOp::AllocateStack { size } => write!(f, "AllocateStack({size})"),
            IlOp::CheckStackOverflow { branch } => {
                write!(f, "CheckStackOverflow({branch:#x})")
            }
            IlOp::CallLeafRuntime {
                thr_off,
                leaf,
                moves: _,
            } => match leaf {
                Some(lf) => write!(
                    f,
                    "CallRuntime_{}({}) -> {}",
                    lf.name,
                    lf.params.iter().join(", "),
                    lf.ret
                ),
                None => write!(f, "CallRuntime_thr_{thr_off:#x}() -> ?"),
            },
            IlOp::LoadValue { dst, item } => write!(f, "{dst} = {item}"),
            IlOp::StoreObjectPool { src, off } => write!(f, "PP+{off:#x} = {src}"),
            IlOp::ClosureCall {
                n_args,
                n_type_args,
            } => write!(f, "r0 = ClosureCall(args: {n_args}, typeArgs: {n_type_args})"),
            IlOp::MoveReg { dst, src } => write!(f, "{dst} = {src}"),
            IlOp::DecompressPointer { loc } => write!(f, "DecompressPointer({loc})"),
            IlOp::SaveRegister { reg } => write!(f, "SaveRegister({reg})"),
            IlOp::RestoreRegister { reg } => write!(f, "RestoreRegister({reg})"),
            IlOp::SetupParameters { params } => {
                let rendered = params
                    .iter()
                    .map(|p| {
                        if p.fp_off < 0 {
                            format!("arg{} -> fp-{:#x}", p.index, -p.fp_off)
                        } else {
                            format!("arg{} -> fp+{:#x}", p.index, p.fp_off)
                        }
                    })
                    .join(", ");
                write!(f, "SetupParameters({rendered})")
            }
            IlOp::InitAsync { ret_type } => write!(f, "InitAsync({})", ret_type.name),
            IlOp::GdtCall { off } => write!(f, "r0 = GDT[cid + {off:#x}]()"),
            IlOp::Call { target, addr } => match target {
                Some(func) => write!(f, "r0 = {}()", func.name),
                None => write!(f, "r0 = call {addr:#x}"),
            },
            IlOp::Return => f.write_str("ret"),
            IlOp::BranchIfSmi { obj, branch } => {
                write!(f, "BranchIfSmi({obj}, {branch:#x})")
            }
            IlOp::LoadClassId { obj, cid } => {
                write!(f, "{} = LoadClassId({obj})", cid.w_name())
            }
            IlOp::LoadTaggedClassIdMayBeSmi { obj, cid, .. } => {
                write!(f, "{} = LoadTaggedClassIdMayBeSmi({obj})", cid.w_name())
            }
            IlOp::BoxInt64 { obj, src } => write!(f, "{obj} = BoxInt64({src})"),
            IlOp::LoadInt32 { dst, src } => write!(f, "{dst} = LoadInt32({src})"),
            IlOp::AllocateObject { dst, cls } => {
                write!(f, "{dst} = inline_Allocate{}()", cls.name)
            }
            IlOp::LoadArrayElement { dst, arr, idx, op } => {
                write!(f, "ArrayLoad: {dst} = {arr}[{idx}]  ; {op}")
            }
            IlOp::StoreArrayElement { val, arr, idx, op } => {
                write!(f, "ArrayStore: {arr}[{idx}] = {val}  ; {op}")
            }
            IlOp::LoadField { dst, obj, off } => {
                write!(f, "LoadField: {dst} = {obj}->field_{off:x}")
            }
            IlOp::StoreField { val, obj, off } => {
                write!(f, "StoreField: {obj}->field_{off:x} = {val}")
            }
            IlOp::InitLateStaticField { dst, field } => {
                write!(f, "{dst} = InitLateStaticField({})", field.name)
            }
            IlOp::LoadStaticField { dst, off } => {
                write!(f, "LoadStaticField: {dst} = static[{off:#x}]")
            }
            IlOp::StoreStaticField { src, off } => {
                write!(f, "StoreStaticField: static[{off:#x}] = {src}")
            }
            IlOp::WriteBarrier {
                obj,
                val,
                is_array: true,
            } => write!(f, "ArrayWriteBarrier({obj}, {val})"),
            IlOp::WriteBarrier {
                obj,
                val,
                is_array: false,
            } => write!(f, "WriteBarrier({obj}, {val})"),
            IlOp::TestType { src, type_name } => {
                write!(f, "{src} = {src} as {type_name}")
            }
        }
    }
}
