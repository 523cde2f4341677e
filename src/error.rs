//! Lifter and runtime-view error implementation.

use dartlift_asm::Word;
use thiserror::Error;

/// Errors raised while validating an instruction stream before lifting.
///
/// Recognizer misses inside a run are not errors; they surface as
/// `Unknown` IL nodes instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LiftError {
    /// An instruction address is not 4-aligned.
    #[error("unaligned instruction address: {0:#x}")]
    UnalignedAddress(Word),
    /// The stream is not in strictly increasing address order.
    #[error("non-monotonic instruction address: {0:#x}")]
    NonMonotonicAddress(Word),
}

/// Errors raised while populating the runtime view.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// Pool offsets are word slots and must be 8-aligned and non-negative.
    #[error("invalid object pool offset: {0:#x}")]
    InvalidPoolOffset(i64),
    /// Thread offsets are word slots and must be 8-aligned and non-negative.
    #[error("invalid thread structure offset: {0:#x}")]
    InvalidThreadOffset(i64),
    /// A class with this id is already registered.
    #[error("duplicate class id: {0}")]
    DuplicateClass(i32),
    /// A function at this address is already registered.
    #[error("duplicate function address: {0:#x}")]
    DuplicateFunction(Word),
}
