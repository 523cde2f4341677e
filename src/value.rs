//! The symbolic value lattice tracked across a lifted function.

use core::fmt;

use crate::env::{Class, DartType, Field, Function};
use crate::storage::VarStorage;

/// A runtime type identifier.
///
/// Non-negative values are class ids assigned by the managed runtime and
/// are stable for the lifetime of a lifter run. Negative values are the
/// synthetic kinds of this crate, used for values no runtime class
/// describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub i32);

impl TypeId {
    /// A free-form expression.
    pub const EXPRESSION: TypeId = TypeId(-1000);
    /// A class id in its smi-tagged form.
    pub const TAGGED_CID: TypeId = TypeId(-1001);
    /// An untagged native integer.
    pub const NATIVE_INT: TypeId = TypeId(-1002);
    /// An untagged native double.
    pub const NATIVE_DOUBLE: TypeId = TypeId(-1003);
    /// A function parameter placeholder.
    pub const PARAMETER: TypeId = TypeId(-1004);
    /// An arguments descriptor.
    pub const ARGS_DESC: TypeId = TypeId(-1005);
    /// The current named-parameter counter of a prologue.
    pub const CURR_NUM_NAME_PARAM: TypeId = TypeId(-1006);

    /// Whether this is one of the synthetic kinds.
    pub const fn is_custom(self) -> bool {
        self.0 < 0
    }

    /// Whether this is a runtime class id.
    pub const fn is_class(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EXPRESSION => f.write_str("Expression"),
            Self::TAGGED_CID => f.write_str("TaggedCid"),
            Self::NATIVE_INT => f.write_str("NativeInt"),
            Self::NATIVE_DOUBLE => f.write_str("NativeDouble"),
            Self::PARAMETER => f.write_str("Parameter"),
            Self::ARGS_DESC => f.write_str("ArgsDesc"),
            Self::CURR_NUM_NAME_PARAM => f.write_str("CurrNumNameParam"),
            t => match cid::name(t) {
                Some(name) => f.write_str(name),
                None => write!(f, "cid_{}", t.0),
            },
        }
    }
}

/// Well-known runtime class ids.
///
/// The databases may register further ids; these are the ones the lifter
/// itself gives meaning to.
pub mod cid {
    use super::TypeId;

    /// Placeholder for an unresolved class.
    pub const ILLEGAL: TypeId = TypeId(0);
    /// Object.
    pub const OBJECT: TypeId = TypeId(1);
    /// Class.
    pub const CLASS: TypeId = TypeId(2);
    /// Function.
    pub const FUNCTION: TypeId = TypeId(3);
    /// Field.
    pub const FIELD: TypeId = TypeId(4);
    /// Type arguments vector.
    pub const TYPE_ARGUMENTS: TypeId = TypeId(5);
    /// Type.
    pub const TYPE: TypeId = TypeId(6);
    /// Function type.
    pub const FUNCTION_TYPE: TypeId = TypeId(7);
    /// Type parameter.
    pub const TYPE_PARAMETER: TypeId = TypeId(8);
    /// Record type.
    pub const RECORD_TYPE: TypeId = TypeId(9);
    /// Uninitialized-slot sentinel.
    pub const SENTINEL: TypeId = TypeId(10);
    /// Unlinked call site.
    pub const UNLINKED_CALL: TypeId = TypeId(11);
    /// Subtype test cache.
    pub const SUBTYPE_TEST_CACHE: TypeId = TypeId(12);
    /// Null.
    pub const NULL: TypeId = TypeId(13);
    /// Boolean.
    pub const BOOL: TypeId = TypeId(14);
    /// Abstract integer.
    pub const INT: TypeId = TypeId(15);
    /// Small (tagged) integer.
    pub const SMI: TypeId = TypeId(16);
    /// Boxed 64-bit integer.
    pub const MINT: TypeId = TypeId(17);
    /// Double.
    pub const DOUBLE: TypeId = TypeId(18);
    /// String.
    pub const STRING: TypeId = TypeId(19);
    /// Fixed-length array.
    pub const ARRAY: TypeId = TypeId(20);
    /// Immutable fixed-length array.
    pub const IMMUTABLE_ARRAY: TypeId = TypeId(21);
    /// Growable array.
    pub const GROWABLE_ARRAY: TypeId = TypeId(22);
    /// Closure.
    pub const CLOSURE: TypeId = TypeId(23);
    /// Record.
    pub const RECORD: TypeId = TypeId(24);

    /// Typed-data arrays.
    pub const TYPED_INT8: TypeId = TypeId(30);
    /// See [`TYPED_INT8`].
    pub const TYPED_UINT8: TypeId = TypeId(31);
    /// See [`TYPED_INT8`].
    pub const TYPED_INT16: TypeId = TypeId(32);
    /// See [`TYPED_INT8`].
    pub const TYPED_UINT16: TypeId = TypeId(33);
    /// See [`TYPED_INT8`].
    pub const TYPED_INT32: TypeId = TypeId(34);
    /// See [`TYPED_INT8`].
    pub const TYPED_UINT32: TypeId = TypeId(35);
    /// See [`TYPED_INT8`].
    pub const TYPED_INT64: TypeId = TypeId(36);
    /// See [`TYPED_INT8`].
    pub const TYPED_UINT64: TypeId = TypeId(37);
    /// See [`TYPED_INT8`].
    pub const TYPED_FLOAT32: TypeId = TypeId(38);
    /// See [`TYPED_INT8`].
    pub const TYPED_FLOAT64: TypeId = TypeId(39);

    /// Element width and signedness of a typed-data class, if `t` is one.
    pub fn typed_data_elem(t: TypeId) -> Option<(u8, bool)> {
        match t {
            TYPED_INT8 => Some((1, true)),
            TYPED_UINT8 => Some((1, false)),
            TYPED_INT16 => Some((2, true)),
            TYPED_UINT16 => Some((2, false)),
            TYPED_INT32 | TYPED_FLOAT32 => Some((4, true)),
            TYPED_UINT32 => Some((4, false)),
            TYPED_INT64 | TYPED_FLOAT64 => Some((8, true)),
            TYPED_UINT64 => Some((8, false)),
            _ => None,
        }
    }

    pub(crate) fn name(t: TypeId) -> Option<&'static str> {
        Some(match t {
            NULL => "Null",
            BOOL => "bool",
            INT => "int",
            SMI => "_Smi",
            MINT => "_Mint",
            DOUBLE => "double",
            STRING => "String",
            ARRAY => "_List",
            IMMUTABLE_ARRAY => "_ImmutableList",
            GROWABLE_ARRAY => "_GrowableList",
            OBJECT => "Object",
            CLOSURE => "_Closure",
            RECORD => "Record",
            _ => return None,
        })
    }
}

/// What a register or memory slot is known to hold at a program point.
///
/// References into the class/field/function/type databases are non-owning
/// borrows valid for the lifter run.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue<'e> {
    /// The null object.
    Null,
    /// A boolean constant.
    Boolean(bool),
    /// An integer; `val` carries the raw (possibly smi-tagged) bits when
    /// known, `int_cid` the refined integer class.
    Integer {
        /// Raw bits, `None` when only the type is known.
        val: Option<i64>,
        /// Refined integer class id.
        int_cid: TypeId,
    },
    /// A double; `dbl_cid` distinguishes boxed from native doubles.
    Double {
        /// Value, `None` when only the type is known.
        val: Option<f64>,
        /// Refined double class id.
        dbl_cid: TypeId,
    },
    /// A string constant.
    Str(String),
    /// Compiled code of a function.
    FunctionCode(&'e Function),
    /// A field descriptor.
    Field(&'e Field),
    /// A free-form expression with an attached refined class id.
    Expression {
        /// Rendered expression text.
        text: String,
        /// Refined class id, [`cid::ILLEGAL`] until known.
        cid: TypeId,
    },
    /// A fixed-length array; `len` is `-1` when unknown.
    Array {
        /// Element class id, [`cid::ILLEGAL`] when untyped.
        elem: TypeId,
        /// Element count, `-1` when unknown.
        len: i64,
    },
    /// A growable array of a known element class.
    GrowableArray {
        /// Element class id.
        elem: TypeId,
    },
    /// An unlinked call site.
    UnlinkedCall {
        /// Call selector.
        selector: &'e str,
    },
    /// An instance of a known class.
    Instance(&'e Class),
    /// A type.
    Type(&'e DartType),
    /// A record type.
    RecordType(&'e DartType),
    /// A type parameter.
    TypeParameter(&'e DartType),
    /// A function type.
    FunctionType(&'e DartType),
    /// A type arguments vector.
    TypeArguments(&'e DartType),
    /// The uninitialized-object marker.
    Sentinel,
    /// A subtype test cache.
    SubtypeTestCache,
    /// A class id itself; `is_smi` marks the smi-tagged form.
    Cid {
        /// The class id, `0` when unknown.
        cid: i32,
        /// Whether the id is held in its smi-tagged form.
        is_smi: bool,
    },
    /// A function parameter placeholder.
    Param(usize),
}

impl<'e> VarValue<'e> {
    /// An integer with known raw bits.
    pub fn int(raw: i64, int_cid: TypeId) -> Self {
        Self::Integer {
            val: Some(raw),
            int_cid,
        }
    }

    /// An integer of known class but unknown value.
    pub fn int_of(int_cid: TypeId) -> Self {
        Self::Integer { val: None, int_cid }
    }

    /// The statically-declared type id of the variant.
    pub fn raw_type_id(&self) -> TypeId {
        match self {
            Self::Null => cid::NULL,
            Self::Boolean(_) => cid::BOOL,
            Self::Integer { .. } => cid::INT,
            Self::Double { .. } => cid::DOUBLE,
            Self::Str(_) => cid::STRING,
            Self::FunctionCode(_) => cid::FUNCTION,
            Self::Field(_) => cid::FIELD,
            Self::Expression { .. } => TypeId::EXPRESSION,
            Self::Array { .. } => cid::ARRAY,
            Self::GrowableArray { .. } => cid::GROWABLE_ARRAY,
            Self::UnlinkedCall { .. } => cid::UNLINKED_CALL,
            Self::Instance(_) => cid::OBJECT,
            Self::Type(_) => cid::TYPE,
            Self::RecordType(_) => cid::RECORD_TYPE,
            Self::TypeParameter(_) => cid::TYPE_PARAMETER,
            Self::FunctionType(_) => cid::FUNCTION_TYPE,
            Self::TypeArguments(_) => cid::TYPE_ARGUMENTS,
            Self::Sentinel => cid::SENTINEL,
            Self::SubtypeTestCache => cid::SUBTYPE_TEST_CACHE,
            Self::Cid { .. } => cid::CLASS,
            Self::Param(_) => TypeId::PARAMETER,
        }
    }

    /// The most-refined type id: an instance reports its class, an
    /// expression its attached id. Everything else reports the raw id.
    pub fn type_id(&self) -> TypeId {
        match self {
            Self::Instance(cls) => TypeId(cls.id),
            Self::Expression { cid, .. } => *cid,
            _ => self.raw_type_id(),
        }
    }

    /// Whether the concrete value, not just the type, is known.
    pub fn has_value(&self) -> bool {
        match self {
            Self::Null | Self::Boolean(_) | Self::Str(_) | Self::Sentinel => true,
            Self::Integer { val, .. } => val.is_some(),
            Self::Double { val, .. } => val.is_some(),
            Self::FunctionCode(_)
            | Self::Field(_)
            | Self::UnlinkedCall { .. }
            | Self::Type(_)
            | Self::RecordType(_)
            | Self::TypeParameter(_)
            | Self::FunctionType(_)
            | Self::TypeArguments(_) => true,
            Self::Array { len, .. } => *len >= 0,
            Self::Cid { cid, .. } => *cid != 0,
            Self::Expression { .. }
            | Self::GrowableArray { .. }
            | Self::Instance(_)
            | Self::SubtypeTestCache
            | Self::Param(_) => false,
        }
    }

    /// The logical integer value: smi-tagged bits are unshifted, other
    /// integer classes are returned unchanged. `None` when not an integer
    /// or the value is unknown.
    pub fn int_value(&self) -> Option<i64> {
        match self {
            Self::Integer {
                val: Some(v),
                int_cid,
            } if *int_cid == cid::SMI => Some(v >> crate::consts::SMI_TAG_SIZE),
            Self::Integer { val, .. } => *val,
            _ => None,
        }
    }

    /// Binder for the integer variant: `(raw bits, refined class id)`.
    pub fn as_integer(&self) -> Option<(Option<i64>, TypeId)> {
        match self {
            Self::Integer { val, int_cid } => Some((*val, *int_cid)),
            _ => None,
        }
    }

    /// Binder for the parameter variant.
    pub fn as_param(&self) -> Option<usize> {
        match self {
            Self::Param(idx) => Some(*idx),
            _ => None,
        }
    }

    /// Narrow an integer's refined class id. No-op on other variants.
    pub fn set_int_type(&mut self, t: TypeId) {
        if let Self::Integer { int_cid, .. } = self {
            *int_cid = t;
        }
    }

    /// Narrow the refined id to smi iff it is still the broad integer id.
    pub fn set_smi_if_int(&mut self) {
        if let Self::Integer { int_cid, .. } = self {
            if *int_cid == cid::INT {
                *int_cid = cid::SMI;
            }
        }
    }

    /// Attach a refined class id to an expression. No-op on other variants.
    pub fn set_expr_type(&mut self, t: TypeId) {
        if let Self::Expression { cid, .. } = self {
            *cid = t;
        }
    }
}

impl fmt::Display for VarValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer { val: Some(_), .. } => {
                write!(f, "{}", self.int_value().unwrap_or_default())
            }
            Self::Integer { val: None, int_cid } => match *int_cid {
                cid::SMI => f.write_str("smi"),
                cid::MINT => f.write_str("mint"),
                _ => f.write_str("int"),
            },
            Self::Double { val: Some(v), .. } => write!(f, "{v}"),
            Self::Double { val: None, .. } => f.write_str("double"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::FunctionCode(func) => write!(f, "Function_{}", func.name),
            Self::Field(field) => write!(f, "Field_{}", field.name),
            Self::Expression { text, .. } => f.write_str(text),
            Self::Array { elem, len } => {
                if *elem == cid::ILLEGAL && *len < 0 {
                    f.write_str("Array")
                } else if *len < 0 {
                    write!(f, "Array<{elem}>")
                } else {
                    write!(f, "Array<{elem}>[{len}]")
                }
            }
            Self::GrowableArray { elem } => write!(f, "GrowableArray<{elem}>"),
            Self::UnlinkedCall { selector } => write!(f, "UnlinkedCall_{selector}"),
            Self::Instance(cls) => write!(f, "Instance_{}", cls.name),
            Self::Type(t)
            | Self::RecordType(t)
            | Self::TypeParameter(t)
            | Self::FunctionType(t)
            | Self::TypeArguments(t) => f.write_str(&t.name),
            Self::Sentinel => f.write_str("Sentinel"),
            Self::SubtypeTestCache => f.write_str("SubtypeTestCache"),
            Self::Cid { cid: 0, .. } => f.write_str("cid_unknown"),
            Self::Cid { cid, is_smi: true } => write!(f, "TaggedCid_{cid}"),
            Self::Cid { cid, is_smi: false } => write!(f, "cid_{cid}"),
            Self::Param(idx) => write!(f, "arg{idx}"),
        }
    }
}

/// A typed assignment: where a value lives paired with what it is.
///
/// The value is owned by its item; handing an item to an IL node moves
/// that ownership along.
#[derive(Debug, Clone, PartialEq)]
pub struct VarItem<'e> {
    /// The storage site.
    pub storage: VarStorage,
    /// The assigned value, if one was ever produced.
    pub value: Option<VarValue<'e>>,
}

impl<'e> VarItem<'e> {
    /// An assignment of `value` at `storage`.
    pub fn new(storage: VarStorage, value: VarValue<'e>) -> Self {
        Self {
            storage,
            value: Some(value),
        }
    }

    /// The assigned value.
    pub fn value(&self) -> Option<&VarValue<'e>> {
        self.value.as_ref()
    }

    /// The storage site's mnemonic.
    pub fn name(&self) -> String {
        self.storage.name()
    }
}

impl fmt::Display for VarItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => v.fmt(f),
            None => f.write_str("BUG_NO_ASSIGN_VALUE"),
        }
    }
}
