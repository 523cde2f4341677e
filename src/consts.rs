//! Dart AOT ARM64 register conventions and object-layout parameters.

use dartlift_asm::Reg;

/* FIXED REGISTER ASSIGNMENTS */

/// Thread structure pointer.
pub const THR: Reg = Reg::x(26);

/// Object pool pointer.
pub const PP: Reg = Reg::x(27);

/// Compressed-pointer heap base.
pub const HEAP_BASE: Reg = Reg::x(28);

/// Cached null object.
pub const NULL_REG: Reg = Reg::x(22);

/// Global dispatch table base.
pub const DISPATCH_TABLE_REG: Reg = Reg::x(21);

/// Class id operand of a dispatch-table call.
pub const GDT_CID_REG: Reg = Reg::LR;

/// Arguments-descriptor register of the calling convention.
pub const ARGS_DESC_REG: Reg = Reg::x(4);

/// Scratch register.
pub const TMP: Reg = Reg::x(16);

/// Second scratch register.
pub const TMP2: Reg = Reg::x(17);

/* OBJECT LAYOUT */

/// Bits of the small-integer tag; a smi is the value left-shifted by this.
pub const SMI_TAG_SIZE: u32 = 1;

/// Tag bit set in every heap object pointer.
pub const HEAP_TAG: i64 = 1;

/// Byte offset of the class id within a tagged object pointer
/// (half-word load).
pub const CLASS_ID_OFFSET: i64 = 1;

/// Untagged byte offset of an array's length slot.
pub const ARRAY_LENGTH_OFFSET: i64 = 0x8;

/// Untagged byte offset of an array's first element.
pub const ARRAY_DATA_OFFSET: i64 = 0x10;

/// Untagged byte offset of a typed-data view's first element.
pub const TYPED_DATA_OFFSET: i64 = 0x18;

/// Untagged byte offset of a closure's entry point.
pub const CLOSURE_ENTRY_OFFSET: i64 = 0x38;

/* THREAD STRUCTURE */

/// Name of the thread slot holding the static field table.
pub const THREAD_FIELD_TABLE: &str = "field_table_values";
