//! Typed IL lifter for Dart AOT ARM64 machine code.
//!
//! Given the decoded instruction stream of one compiled function plus a
//! read-only view of the runtime image (object pool, thread layout, and
//! the class/field/function/type databases), the lifter collapses
//! runtime idioms into a typed IL sequence annotated with symbolic
//! values. Control-flow reconstruction and pretty-printing live in
//! downstream crates; the rendered form of each IL node here is their
//! input contract.

#![warn(missing_docs)]
#![deny(unused_must_use)]

pub mod consts;
pub mod env;
pub mod error;
pub mod il;
pub mod lifter;
pub mod storage;
pub mod value;

pub mod prelude {
    //! Re-exports of the public surface.

    pub use dartlift_asm::{op, Cond, Extend, Insn, InsnFlags, Op, Reg, RegisterId, Word};

    pub use crate::consts::*;
    pub use crate::env::{
        Class, DartType, Field, Function, FunctionKind, LeafFunction, ObjectPool, PoolEntry,
        PoolEntryKind, RuntimeEnv, ThreadField, ThreadLayout,
    };
    pub use crate::error::{EnvError, LiftError};
    pub use crate::il::{AddrRange, ArrayOp, ArrayType, Il, IlKind, IlOp, ParamSpill};
    pub use crate::lifter::Lifter;
    pub use crate::storage::VarStorage;
    pub use crate::value::{cid, TypeId, VarItem, VarValue};
}
