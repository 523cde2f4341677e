//! Read-only view of the runtime image: object pool, thread layout, and
//! the class/field/function/type databases.
//!
//! Everything here is populated by the binary-loading collaborators before
//! lifting starts and only borrowed immutably by the lifter. The lifter
//! never hands out references into its own state, so the borrows stay
//! bounded by the run.

use std::collections::{BTreeMap, HashMap};

use dartlift_asm::Word;

use crate::error::EnvError;
use crate::value::{cid, TypeId, VarValue};

/// A runtime class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    /// Class id.
    pub id: i32,
    /// Source name.
    pub name: String,
    /// Instance size in bytes.
    pub instance_size: i64,
}

/// A field descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Source name.
    pub name: String,
    /// Owning class id.
    pub owner: i32,
    /// Whether the field lives in the static field table.
    pub is_static: bool,
    /// Byte offset: into the instance, or into the static field table.
    pub offset: i64,
}

/// Role of a compiled function in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Ordinary compiled function.
    Func,
    /// Inline-allocation stub for a class.
    AllocateStub {
        /// Allocated class id.
        cid: i32,
    },
    /// Write barrier helper.
    WriteBarrierStub {
        /// Whether this is the array element flavor.
        array: bool,
    },
    /// Type test helper.
    TypeTestStub,
    /// Async machinery initialization stub.
    InitAsyncStub,
    /// Late static field initialization stub.
    InitLateStaticFieldStub,
}

/// A compiled function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Source name, or the stub's symbolic name.
    pub name: String,
    /// Entry address.
    pub addr: Word,
    /// Code size in bytes.
    pub size: Word,
    /// Role in the image.
    pub kind: FunctionKind,
}

impl Function {
    /// An ordinary function.
    pub fn new(name: impl Into<String>, addr: Word, size: Word) -> Self {
        Self {
            name: name.into(),
            addr,
            size,
            kind: FunctionKind::Func,
        }
    }

    /// A runtime stub.
    pub fn stub(name: impl Into<String>, addr: Word, kind: FunctionKind) -> Self {
        Self {
            name: name.into(),
            addr,
            size: 0,
            kind,
        }
    }
}

/// An interned type rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DartType {
    /// Rendered name, e.g. `String` or `Future<int>`.
    pub name: String,
}

/// Signature of a leaf runtime function reachable through the thread
/// structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafFunction {
    /// Symbol name.
    pub name: String,
    /// Rendered return type.
    pub ret: String,
    /// Rendered parameter types.
    pub params: Vec<String>,
}

/// One named slot of the thread structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadField {
    /// Slot name.
    pub name: String,
    /// Leaf function signature, for cached entry points.
    pub leaf: Option<LeafFunction>,
}

/// Discriminant of a pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[allow(missing_docs)]
pub enum PoolEntryKind {
    Null,
    Bool,
    Int,
    Double,
    Str,
    Function,
    Field,
    Class,
    Type,
    FunctionType,
    TypeParameter,
    RecordType,
    TypeArguments,
    UnlinkedCall,
    ArgsDesc,
    Sentinel,
    SubtypeTestCache,
    Array,
    GrowableArray,
    Imm,
}

/// A decoded object pool entry.
///
/// Entries referencing database objects carry keys, not borrows, so the
/// pool can be populated independently of the databases; resolution
/// happens when the lifter turns an entry into a [`VarValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEntry {
    /// The null object.
    Null,
    /// A boolean constant.
    Bool(bool),
    /// An integer constant; `raw` carries the tagged bits for smis.
    Int {
        /// Raw slot bits.
        raw: i64,
        /// Refined integer class id.
        cid: TypeId,
    },
    /// A double constant.
    Double(f64),
    /// A string constant.
    Str(String),
    /// Compiled code, keyed by entry address.
    Function(Word),
    /// A field descriptor, keyed by field database id.
    Field(u32),
    /// A class object, keyed by class id.
    Class(i32),
    /// A type, keyed by type database id.
    Type(u32),
    /// A function type, keyed by type database id.
    FunctionType(u32),
    /// A type parameter, keyed by type database id.
    TypeParameter(u32),
    /// A record type, keyed by type database id.
    RecordType(u32),
    /// A type arguments vector, keyed by type database id.
    TypeArguments(u32),
    /// An unlinked call site.
    UnlinkedCall {
        /// Call selector.
        selector: String,
    },
    /// An arguments descriptor.
    ArgsDesc {
        /// Positional plus named argument count.
        n_args: i32,
        /// Type argument count.
        n_type_args: i32,
    },
    /// The uninitialized-slot sentinel.
    Sentinel,
    /// A subtype test cache.
    SubtypeTestCache,
    /// A constant array.
    Array {
        /// Element class id.
        elem: TypeId,
        /// Element count, `-1` when unknown.
        len: i64,
    },
    /// A growable array prototype.
    GrowableArray {
        /// Element class id.
        elem: TypeId,
    },
    /// A raw immediate slot.
    Imm(Word),
}

impl PoolEntry {
    /// A smi-tagged integer entry holding logical value `v`.
    pub fn smi(v: i64) -> Self {
        Self::Int {
            raw: v << crate::consts::SMI_TAG_SIZE,
            cid: cid::SMI,
        }
    }

    /// A boxed 64-bit integer entry.
    pub fn mint(v: i64) -> Self {
        Self::Int {
            raw: v,
            cid: cid::MINT,
        }
    }

    /// Discriminant of the entry.
    pub fn kind(&self) -> PoolEntryKind {
        match self {
            Self::Null => PoolEntryKind::Null,
            Self::Bool(_) => PoolEntryKind::Bool,
            Self::Int { .. } => PoolEntryKind::Int,
            Self::Double(_) => PoolEntryKind::Double,
            Self::Str(_) => PoolEntryKind::Str,
            Self::Function(_) => PoolEntryKind::Function,
            Self::Field(_) => PoolEntryKind::Field,
            Self::Class(_) => PoolEntryKind::Class,
            Self::Type(_) => PoolEntryKind::Type,
            Self::FunctionType(_) => PoolEntryKind::FunctionType,
            Self::TypeParameter(_) => PoolEntryKind::TypeParameter,
            Self::RecordType(_) => PoolEntryKind::RecordType,
            Self::TypeArguments(_) => PoolEntryKind::TypeArguments,
            Self::UnlinkedCall { .. } => PoolEntryKind::UnlinkedCall,
            Self::ArgsDesc { .. } => PoolEntryKind::ArgsDesc,
            Self::Sentinel => PoolEntryKind::Sentinel,
            Self::SubtypeTestCache => PoolEntryKind::SubtypeTestCache,
            Self::Array { .. } => PoolEntryKind::Array,
            Self::GrowableArray { .. } => PoolEntryKind::GrowableArray,
            Self::Imm(_) => PoolEntryKind::Imm,
        }
    }
}

/// The object pool, addressed by byte offset from `PP`.
#[derive(Debug, Clone, Default)]
pub struct ObjectPool {
    slots: BTreeMap<i64, PoolEntry>,
}

impl ObjectPool {
    /// Register the entry at `off`. Offsets are word slots: 8-aligned,
    /// non-negative.
    pub fn insert(&mut self, off: i64, entry: PoolEntry) -> Result<(), EnvError> {
        if off < 0 || off % 8 != 0 {
            return Err(EnvError::InvalidPoolOffset(off));
        }
        self.slots.insert(off, entry);
        Ok(())
    }

    /// The entry at `off`, if the pool walker produced one.
    pub fn at(&self, off: i64) -> Option<&PoolEntry> {
        self.slots.get(&off)
    }
}

/// The thread structure layout, addressed by byte offset from `THR`.
#[derive(Debug, Clone, Default)]
pub struct ThreadLayout {
    slots: BTreeMap<i64, ThreadField>,
}

impl ThreadLayout {
    /// Register a named slot.
    pub fn insert_field(&mut self, off: i64, name: impl Into<String>) -> Result<(), EnvError> {
        self.insert(
            off,
            ThreadField {
                name: name.into(),
                leaf: None,
            },
        )
    }

    /// Register a cached leaf function entry point.
    pub fn insert_leaf(&mut self, off: i64, leaf: LeafFunction) -> Result<(), EnvError> {
        self.insert(
            off,
            ThreadField {
                name: leaf.name.clone(),
                leaf: Some(leaf),
            },
        )
    }

    fn insert(&mut self, off: i64, field: ThreadField) -> Result<(), EnvError> {
        if off < 0 || off % 8 != 0 {
            return Err(EnvError::InvalidThreadOffset(off));
        }
        self.slots.insert(off, field);
        Ok(())
    }

    /// The slot at `off`.
    pub fn field(&self, off: i64) -> Option<&ThreadField> {
        self.slots.get(&off)
    }

    /// The slot name at `off`.
    pub fn name(&self, off: i64) -> Option<&str> {
        self.field(off).map(|f| f.name.as_str())
    }

    /// The leaf function signature at `off`, for cached entry points.
    pub fn leaf(&self, off: i64) -> Option<&LeafFunction> {
        self.field(off).and_then(|f| f.leaf.as_ref())
    }

    /// Largest registered offset.
    pub fn max_offset(&self) -> Option<i64> {
        self.slots.keys().next_back().copied()
    }
}

/// Classes by id.
#[derive(Debug, Clone, Default)]
pub struct ClassDb {
    map: HashMap<i32, Class>,
}

impl ClassDb {
    /// Register a class.
    pub fn insert(&mut self, class: Class) -> Result<(), EnvError> {
        if self.map.contains_key(&class.id) {
            return Err(EnvError::DuplicateClass(class.id));
        }
        self.map.insert(class.id, class);
        Ok(())
    }

    /// The class with `id`.
    pub fn get(&self, id: i32) -> Option<&Class> {
        self.map.get(&id)
    }
}

/// Fields by database id.
#[derive(Debug, Clone, Default)]
pub struct FieldDb {
    entries: Vec<Field>,
}

impl FieldDb {
    /// Register a field, returning its database id.
    pub fn insert(&mut self, field: Field) -> u32 {
        self.entries.push(field);
        (self.entries.len() - 1) as u32
    }

    /// The field with database id `id`.
    pub fn get(&self, id: u32) -> Option<&Field> {
        self.entries.get(id as usize)
    }
}

/// Compiled functions by entry address.
#[derive(Debug, Clone, Default)]
pub struct FunctionDb {
    map: BTreeMap<Word, Function>,
}

impl FunctionDb {
    /// Register a function.
    pub fn insert(&mut self, func: Function) -> Result<(), EnvError> {
        if self.map.contains_key(&func.addr) {
            return Err(EnvError::DuplicateFunction(func.addr));
        }
        self.map.insert(func.addr, func);
        Ok(())
    }

    /// The function entered exactly at `addr`.
    pub fn at(&self, addr: Word) -> Option<&Function> {
        self.map.get(&addr)
    }

    /// The function whose code covers `addr`.
    pub fn containing(&self, addr: Word) -> Option<&Function> {
        self.map
            .range(..=addr)
            .next_back()
            .map(|(_, f)| f)
            .filter(|f| addr < f.addr + f.size.max(4))
    }
}

/// Interned types by database id.
#[derive(Debug, Clone, Default)]
pub struct TypeDb {
    entries: Vec<DartType>,
}

impl TypeDb {
    /// Intern a rendered type, returning its database id.
    pub fn intern(&mut self, name: impl Into<String>) -> u32 {
        self.entries.push(DartType { name: name.into() });
        (self.entries.len() - 1) as u32
    }

    /// The type with database id `id`.
    pub fn get(&self, id: u32) -> Option<&DartType> {
        self.entries.get(id as usize)
    }
}

/// The complete runtime view a lifter run borrows.
#[derive(Debug, Clone, Default)]
pub struct RuntimeEnv {
    /// The object pool.
    pub pool: ObjectPool,
    /// The thread structure layout.
    pub thread: ThreadLayout,
    /// Classes.
    pub classes: ClassDb,
    /// Fields.
    pub fields: FieldDb,
    /// Compiled functions and stubs.
    pub functions: FunctionDb,
    /// Interned types.
    pub types: TypeDb,
}

impl RuntimeEnv {
    /// Resolve the pool entry at `off` into a symbolic value.
    ///
    /// `None` when the pool has no entry there. Entries whose database key
    /// does not resolve degrade to an expression placeholder typed
    /// [`cid::ILLEGAL`]; later recognizers may refine it.
    pub fn pool_value(&self, off: i64) -> Option<VarValue<'_>> {
        let entry = self.pool.at(off)?;
        let placeholder = || VarValue::Expression {
            text: format!("PP_{off:#x}"),
            cid: cid::ILLEGAL,
        };
        Some(match entry {
            PoolEntry::Null => VarValue::Null,
            PoolEntry::Bool(b) => VarValue::Boolean(*b),
            PoolEntry::Int { raw, cid } => VarValue::int(*raw, *cid),
            PoolEntry::Double(v) => VarValue::Double {
                val: Some(*v),
                dbl_cid: cid::DOUBLE,
            },
            PoolEntry::Str(s) => VarValue::Str(s.clone()),
            PoolEntry::Function(addr) => match self.functions.at(*addr) {
                Some(func) => VarValue::FunctionCode(func),
                None => placeholder(),
            },
            PoolEntry::Field(id) => match self.fields.get(*id) {
                Some(field) => VarValue::Field(field),
                None => placeholder(),
            },
            PoolEntry::Class(id) => VarValue::Cid {
                cid: *id,
                is_smi: false,
            },
            PoolEntry::Type(id) => match self.types.get(*id) {
                Some(t) => VarValue::Type(t),
                None => placeholder(),
            },
            PoolEntry::FunctionType(id) => match self.types.get(*id) {
                Some(t) => VarValue::FunctionType(t),
                None => placeholder(),
            },
            PoolEntry::TypeParameter(id) => match self.types.get(*id) {
                Some(t) => VarValue::TypeParameter(t),
                None => placeholder(),
            },
            PoolEntry::RecordType(id) => match self.types.get(*id) {
                Some(t) => VarValue::RecordType(t),
                None => placeholder(),
            },
            PoolEntry::TypeArguments(id) => match self.types.get(*id) {
                Some(t) => VarValue::TypeArguments(t),
                None => placeholder(),
            },
            PoolEntry::UnlinkedCall { selector } => VarValue::UnlinkedCall {
                selector: selector.as_str(),
            },
            PoolEntry::ArgsDesc {
                n_args,
                n_type_args,
            } => VarValue::Expression {
                text: format!("ArgsDesc(args: {n_args}, typeArgs: {n_type_args})"),
                cid: TypeId::ARGS_DESC,
            },
            PoolEntry::Sentinel => VarValue::Sentinel,
            PoolEntry::SubtypeTestCache => VarValue::SubtypeTestCache,
            PoolEntry::Array { elem, len } => VarValue::Array {
                elem: *elem,
                len: *len,
            },
            PoolEntry::GrowableArray { elem } => VarValue::GrowableArray { elem: *elem },
            PoolEntry::Imm(w) => VarValue::int(*w as i64, TypeId::NATIVE_INT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn pool_offsets_are_word_slots() {
        let mut pool = ObjectPool::default();
        assert_eq!(
            pool.insert(0x1c, PoolEntry::Null),
            Err(EnvError::InvalidPoolOffset(0x1c))
        );
        assert_eq!(
            pool.insert(-8, PoolEntry::Null),
            Err(EnvError::InvalidPoolOffset(-8))
        );
        assert!(pool.insert(0x28, PoolEntry::smi(42)).is_ok());
        assert!(pool.at(0x28).is_some());
        assert!(pool.at(0x30).is_none());
    }

    #[test]
    fn duplicate_class_ids_are_rejected() {
        let mut db = ClassDb::default();
        let point = Class {
            id: 100,
            name: "Point".to_string(),
            instance_size: 16,
        };
        assert!(db.insert(point.clone()).is_ok());
        assert_eq!(db.insert(point), Err(EnvError::DuplicateClass(100)));
    }

    #[test]
    fn function_range_lookup() {
        let mut db = FunctionDb::default();
        db.insert(Function::new("main", 0x1000, 0x40)).unwrap();
        assert_eq!(db.at(0x1000).unwrap().name, "main");
        assert!(db.at(0x1004).is_none());
        assert_eq!(db.containing(0x1004).unwrap().name, "main");
        assert!(db.containing(0x1040).is_none());
    }

    #[test]
    fn thread_layout_tracks_the_largest_offset() {
        let mut thread = ThreadLayout::default();
        assert_eq!(thread.max_offset(), None);
        thread.insert_field(0x38, "stack_limit").unwrap();
        thread.insert_field(0x68, "isolate").unwrap();
        assert_eq!(thread.max_offset(), Some(0x68));
        assert_eq!(thread.name(0x38), Some("stack_limit"));
        assert!(thread.leaf(0x38).is_none());
    }

    #[test]
    fn every_pool_entry_kind_resolves_to_a_value() {
        let mut env = RuntimeEnv::default();
        env.functions.insert(Function::new("f", 0x2000, 4)).unwrap();
        let fid = env.fields.insert(Field {
            name: "x".to_string(),
            owner: 100,
            is_static: false,
            offset: 0x10,
        });
        let tid = env.types.intern("String");

        let entries = vec![
            PoolEntry::Null,
            PoolEntry::Bool(true),
            PoolEntry::smi(1),
            PoolEntry::Double(0.5),
            PoolEntry::Str("s".to_string()),
            PoolEntry::Function(0x2000),
            PoolEntry::Field(fid),
            PoolEntry::Class(100),
            PoolEntry::Type(tid),
            PoolEntry::FunctionType(tid),
            PoolEntry::TypeParameter(tid),
            PoolEntry::RecordType(tid),
            PoolEntry::TypeArguments(tid),
            PoolEntry::UnlinkedCall {
                selector: "foo".to_string(),
            },
            PoolEntry::ArgsDesc {
                n_args: 2,
                n_type_args: 0,
            },
            PoolEntry::Sentinel,
            PoolEntry::SubtypeTestCache,
            PoolEntry::Array {
                elem: cid::INT,
                len: 3,
            },
            PoolEntry::GrowableArray { elem: cid::INT },
            PoolEntry::Imm(7),
        ];
        let kinds: Vec<PoolEntryKind> = entries.iter().map(PoolEntry::kind).collect();
        for kind in PoolEntryKind::iter() {
            assert!(kinds.contains(&kind), "no sample entry for {kind:?}");
        }

        for (n, entry) in entries.into_iter().enumerate() {
            let off = (n as i64) * 8;
            env.pool.insert(off, entry).unwrap();
        }
        for n in 0..kinds.len() {
            let value = env.pool_value((n as i64) * 8).expect("entry resolves");
            // The rendered form is the golden-output contract; it must
            // never fault.
            let _ = value.to_string();
        }
    }

    #[test]
    fn unresolvable_keys_degrade_to_placeholders() {
        let mut env = RuntimeEnv::default();
        env.pool.insert(0x8, PoolEntry::Function(0xdead)).unwrap();
        let value = env.pool_value(0x8).unwrap();
        assert_eq!(value.type_id(), cid::ILLEGAL);
        assert_eq!(value.to_string(), "PP_0x8");
    }
}
