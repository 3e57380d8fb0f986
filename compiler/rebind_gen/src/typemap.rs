//! Default type mapping from C to host types.
//!
//! | C | Host |
//! |---|---|
//! | `int`, `unsigned long`, ... | `core::ffi::c_int`, `c_ulong`, ... |
//! | `int32_t`, `uint64_t`, ... | `i32`, `u64`, ... |
//! | `size_t` / `ssize_t` | `usize` / `isize` |
//! | `T*` / `const T*` | `*mut T` / `*const T` |
//! | `void*` | `*mut c_void` |
//! | `T[N]` | `[T; N]` |
//! | `R (*)(A...)` | `Option<unsafe extern "C" fn(A...) -> R>` |
//! | typedef, struct, union, enum names | passed through by name |
//!
//! `long double` has no host equivalent and maps to a same-sized byte
//! array.

use rebind_ir::model::{HostType, Prim};
use rebind_ir::{CType, IntKind};
use tracing::debug;

pub fn prim_for(kind: IntKind) -> Prim {
    match kind {
        IntKind::Char => Prim::CChar,
        IntKind::SChar => Prim::CSChar,
        IntKind::UChar => Prim::CUChar,
        IntKind::Short => Prim::CShort,
        IntKind::UShort => Prim::CUShort,
        IntKind::Int => Prim::CInt,
        IntKind::UInt => Prim::CUInt,
        IntKind::Long => Prim::CLong,
        IntKind::ULong => Prim::CULong,
        IntKind::LongLong => Prim::CLongLong,
        IntKind::ULongLong => Prim::CULongLong,
        IntKind::I8 => Prim::I8,
        IntKind::I16 => Prim::I16,
        IntKind::I32 => Prim::I32,
        IntKind::I64 => Prim::I64,
        IntKind::U8 => Prim::U8,
        IntKind::U16 => Prim::U16,
        IntKind::U32 => Prim::U32,
        IntKind::U64 => Prim::U64,
        IntKind::Size | IntKind::UIntPtr => Prim::Usize,
        IntKind::SSize | IntKind::IntPtr => Prim::Isize,
    }
}

/// Map a C type by the default table.
pub fn map_type(ty: &CType) -> HostType {
    match ty {
        CType::Void => HostType::Unit,
        CType::Bool => HostType::Prim(Prim::Bool),
        CType::Int(kind) => HostType::Prim(prim_for(*kind)),
        CType::Float => HostType::Prim(Prim::CFloat),
        CType::Double => HostType::Prim(Prim::CDouble),
        CType::LongDouble => {
            debug!("`long double` has no host type; mapping to [u8; 16]");
            HostType::Array {
                elem: Box::new(HostType::Prim(Prim::U8)),
                len: 16,
            }
        }
        CType::Named(name) | CType::Struct(name) | CType::Union(name) | CType::Enum(name) => {
            HostType::Named(name.clone())
        }
        CType::Pointer { pointee, is_const } => HostType::ptr(map_pointee(pointee), !is_const),
        CType::Array { elem, len } => {
            let len = len.unwrap_or_else(|| {
                debug!("flexible array member mapped to a zero-length array");
                0
            });
            HostType::Array {
                elem: Box::new(map_type(elem)),
                len,
            }
        }
        CType::FunctionPointer {
            ret,
            params,
            variadic,
        } => HostType::FnPtr {
            params: params.iter().map(map_param).collect(),
            ret: Box::new(map_type(ret)),
            variadic: *variadic,
        },
    }
}

/// Parameters of function pointer types: arrays decay, `void` is invalid.
fn map_param(ty: &CType) -> HostType {
    match ty {
        CType::Array { elem, .. } => HostType::ptr(map_pointee(elem), true),
        CType::Void => {
            debug!("`void` parameter in function pointer type mapped to `*mut c_void`");
            HostType::ptr(HostType::CVoid, true)
        }
        other => map_type(other),
    }
}

fn map_pointee(ty: &CType) -> HostType {
    match ty {
        CType::Void => HostType::CVoid,
        other => map_type(other),
    }
}

/// `const char*`: the only type the string codecs apply to by default.
pub fn is_string_like(ty: &HostType) -> bool {
    matches!(
        ty,
        HostType::Ptr { pointee, mutable: false } if **pointee == HostType::Prim(Prim::CChar)
    )
}

/// Any single-level `char` pointer, const or not.
pub fn is_char_pointer(ty: &HostType) -> bool {
    matches!(ty, HostType::Ptr { pointee, .. } if **pointee == HostType::Prim(Prim::CChar))
}
