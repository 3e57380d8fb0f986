//! Output declaration model.
//!
//! Built by the transformer from the source AST, restructured by the
//! reshaper, and consumed once by the emitter.
//!
//! ```text
//! GeneratedUnit
//!   ├── Use*                     (hoisted by the reshaper)
//!   ├── Scope (wrapper)          (removed by the reshaper)
//!   │     ├── Use*
//!   │     └── Container
//!   └── Container
//!         └── Decl*              (source order)
//! ```

use std::fmt;

use crate::ast::{Aggregate, Origin};

/// Declaration kinds rules are partitioned by.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum DeclKind {
    Function,
    Struct,
    Enum,
    Constant,
    TypeAlias,
}

impl DeclKind {
    pub const ALL: [DeclKind; 5] = [
        DeclKind::Function,
        DeclKind::Struct,
        DeclKind::Enum,
        DeclKind::Constant,
        DeclKind::TypeAlias,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Function => "function",
            DeclKind::Struct => "struct",
            DeclKind::Enum => "enum",
            DeclKind::Constant => "constant",
            DeclKind::TypeAlias => "typealias",
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Which way a string value crosses the boundary.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MarshalDirection {
    /// Host to native (parameters).
    ToNative,
    /// Native to host (return values).
    FromNative,
}

impl fmt::Display for MarshalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalDirection::ToNative => f.write_str("to-native"),
            MarshalDirection::FromNative => f.write_str("from-native"),
        }
    }
}

/// Who owns the native memory behind a marshalled value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Ownership {
    /// The caller allocates a buffer that lives exactly for one call.
    CallerOwnsTransient,
    /// Native code owns the memory; the host only reads it.
    CalleeOwns,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct MarshalStrategy {
    pub direction: MarshalDirection,
    pub ownership: Ownership,
}

/// The two string codecs. Each is bound to exactly one strategy.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Codec {
    /// Host string → transient null-terminated buffer, released after the call.
    Utf8ToNative,
    /// Native null-terminated bytes → host string, never released by the host.
    Utf8FromNative,
}

impl Codec {
    pub const fn strategy(self) -> MarshalStrategy {
        match self {
            Codec::Utf8ToNative => MarshalStrategy {
                direction: MarshalDirection::ToNative,
                ownership: Ownership::CallerOwnsTransient,
            },
            Codec::Utf8FromNative => MarshalStrategy {
                direction: MarshalDirection::FromNative,
                ownership: Ownership::CalleeOwns,
            },
        }
    }

    /// Name of the runtime type implementing this codec.
    pub const fn runtime_name(self) -> &'static str {
        match self {
            Codec::Utf8ToNative => "Utf8ToNative",
            Codec::Utf8FromNative => "Utf8FromNative",
        }
    }
}

/// Data-flow direction of a parameter, field or return slot.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SlotDirection {
    In,
    Out,
    Return,
}

/// Host primitive types.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Prim {
    CChar,
    CSChar,
    CUChar,
    CShort,
    CUShort,
    CInt,
    CUInt,
    CLong,
    CULong,
    CLongLong,
    CULongLong,
    CFloat,
    CDouble,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Usize,
    Isize,
}

impl Prim {
    pub fn rust_name(self) -> &'static str {
        match self {
            Prim::CChar => "c_char",
            Prim::CSChar => "c_schar",
            Prim::CUChar => "c_uchar",
            Prim::CShort => "c_short",
            Prim::CUShort => "c_ushort",
            Prim::CInt => "c_int",
            Prim::CUInt => "c_uint",
            Prim::CLong => "c_long",
            Prim::CULong => "c_ulong",
            Prim::CLongLong => "c_longlong",
            Prim::CULongLong => "c_ulonglong",
            Prim::CFloat => "c_float",
            Prim::CDouble => "c_double",
            Prim::Bool => "bool",
            Prim::I8 => "i8",
            Prim::I16 => "i16",
            Prim::I32 => "i32",
            Prim::I64 => "i64",
            Prim::U8 => "u8",
            Prim::U16 => "u16",
            Prim::U32 => "u32",
            Prim::U64 => "u64",
            Prim::Usize => "usize",
            Prim::Isize => "isize",
        }
    }

    /// Whether this primitive lives in `core::ffi` and needs an import.
    pub fn is_ffi_alias(self) -> bool {
        self.rust_name().starts_with("c_")
    }

    pub fn is_float(self) -> bool {
        matches!(self, Prim::CFloat | Prim::CDouble)
    }
}

/// A host-side type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum HostType {
    /// `()`; only valid as a return type.
    Unit,
    Prim(Prim),
    /// `c_void`; only valid behind a pointer.
    CVoid,
    /// A declared struct, enum or alias, passed through by name.
    Named(String),
    Ptr {
        pointee: Box<HostType>,
        mutable: bool,
    },
    Array {
        elem: Box<HostType>,
        len: u64,
    },
    FnPtr {
        params: Vec<HostType>,
        ret: Box<HostType>,
        variadic: bool,
    },
    /// A host string; `&str` for constants.
    Str,
}

impl HostType {
    pub fn ptr(pointee: HostType, mutable: bool) -> HostType {
        HostType::Ptr {
            pointee: Box::new(pointee),
            mutable,
        }
    }

    /// Visit this type and every nested type.
    pub fn walk(&self, visit: &mut impl FnMut(&HostType)) {
        visit(self);
        match self {
            HostType::Ptr { pointee, .. } => pointee.walk(visit),
            HostType::Array { elem, .. } => elem.walk(visit),
            HostType::FnPtr { params, ret, .. } => {
                for param in params {
                    param.walk(visit);
                }
                ret.walk(visit);
            }
            HostType::Unit
            | HostType::Prim(_)
            | HostType::CVoid
            | HostType::Named(_)
            | HostType::Str => {}
        }
    }
}

/// A parameter, field or return value together with its marshalling hint.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Slot {
    pub name: String,
    /// The native (ABI) type.
    pub ty: HostType,
    pub direction: SlotDirection,
    /// Codec applied at the call boundary, if any.
    pub codec: Option<Codec>,
}

impl Slot {
    pub fn new(name: impl Into<String>, ty: HostType, direction: SlotDirection) -> Self {
        Slot {
            name: name.into(),
            ty,
            direction,
            codec: None,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FunctionSig {
    /// The native symbol.
    pub link_name: String,
    pub params: Vec<Slot>,
    pub ret: Slot,
    pub variadic: bool,
}

impl FunctionSig {
    /// Whether any slot carries a codec and the function needs a shim.
    pub fn is_marshalled(&self) -> bool {
        self.ret.codec.is_some() || self.params.iter().any(|p| p.codec.is_some())
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldDef {
    pub name: String,
    pub ty: HostType,
}

/// How far a value-equality struct can go.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ValueEquality {
    /// `PartialEq` only; some field is (or contains) a float.
    Partial,
    /// `PartialEq`, `Eq` and `Hash`.
    Full,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StructShape {
    pub aggregate: Aggregate,
    /// `None` for opaque types.
    pub fields: Option<Vec<FieldDef>>,
    /// Set when instances compare by field content.
    pub value_equality: Option<ValueEquality>,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct EnumShape {
    /// Underlying integer type.
    pub repr: HostType,
    pub variants: Vec<EnumVariant>,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConstValue {
    Int(i128),
    Str(String),
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ConstShape {
    pub ty: HostType,
    pub value: ConstValue,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum DeclBody {
    Function(FunctionSig),
    Struct(StructShape),
    Enum(EnumShape),
    Constant(ConstShape),
    /// `pub type Name = T;`
    Alias(HostType),
}

/// One output declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Decl {
    pub name: String,
    pub kind: DeclKind,
    pub visibility: Visibility,
    pub body: DeclBody,
    pub doc: Option<String>,
    pub origin: Option<Origin>,
}

impl Decl {
    pub fn new(name: impl Into<String>, kind: DeclKind, body: DeclBody) -> Self {
        Decl {
            name: name.into(),
            kind,
            visibility: Visibility::Public,
            body,
            doc: None,
            origin: None,
        }
    }

    /// Every slot of this declaration that carries a codec.
    pub fn marshal_hints(&self) -> impl Iterator<Item = (&Slot, Codec)> {
        let slots: Vec<&Slot> = match &self.body {
            DeclBody::Function(sig) => sig.params.iter().chain(Some(&sig.ret)).collect(),
            _ => Vec::new(),
        };
        slots
            .into_iter()
            .filter_map(|slot| slot.codec.map(|codec| (slot, codec)))
    }
}

/// An import-like entry, e.g. `core::ffi::c_int`.
#[derive(Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct UseDecl {
    pub path: String,
}

impl UseDecl {
    pub fn new(path: impl Into<String>) -> Self {
        UseDecl { path: path.into() }
    }
}

/// The synthetic scope the transformer wraps everything in.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct WrapperScope {
    pub name: String,
    pub members: Vec<UnitMember>,
}

/// The aggregate holding every surviving declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Container {
    /// Native library the declarations link against.
    pub library: String,
    pub decls: Vec<Decl>,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnitMember {
    Use(UseDecl),
    Scope(WrapperScope),
    Container(Container),
}

/// The single generated source unit.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct GeneratedUnit {
    /// Output path relative to the destination root.
    pub file_name: String,
    pub members: Vec<UnitMember>,
}

impl GeneratedUnit {
    /// The top-level container, once the unit has been reshaped.
    pub fn container(&self) -> Option<&Container> {
        self.members.iter().find_map(|m| match m {
            UnitMember::Container(c) => Some(c),
            _ => None,
        })
    }

    /// Top-level imports.
    pub fn uses(&self) -> impl Iterator<Item = &UseDecl> {
        self.members.iter().filter_map(|m| match m {
            UnitMember::Use(u) => Some(u),
            _ => None,
        })
    }
}
