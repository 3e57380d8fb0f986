//! The C type model.
//!
//! Types are kept exactly as declared in the header (no inference, no
//! canonicalization beyond resolving keyword spellings like `unsigned long
//! int` to a single [`IntKind`]). Typedef names stay symbolic as
//! [`CType::Named`]; the generator passes them through by name.

use std::fmt;

/// Integer kinds distinguished by the type mapping table.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum IntKind {
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Size,
    SSize,
    IntPtr,
    UIntPtr,
}

impl IntKind {
    /// The canonical C spelling.
    pub fn c_spelling(self) -> &'static str {
        match self {
            IntKind::Char => "char",
            IntKind::SChar => "signed char",
            IntKind::UChar => "unsigned char",
            IntKind::Short => "short",
            IntKind::UShort => "unsigned short",
            IntKind::Int => "int",
            IntKind::UInt => "unsigned int",
            IntKind::Long => "long",
            IntKind::ULong => "unsigned long",
            IntKind::LongLong => "long long",
            IntKind::ULongLong => "unsigned long long",
            IntKind::I8 => "int8_t",
            IntKind::I16 => "int16_t",
            IntKind::I32 => "int32_t",
            IntKind::I64 => "int64_t",
            IntKind::U8 => "uint8_t",
            IntKind::U16 => "uint16_t",
            IntKind::U32 => "uint32_t",
            IntKind::U64 => "uint64_t",
            IntKind::Size => "size_t",
            IntKind::SSize => "ssize_t",
            IntKind::IntPtr => "intptr_t",
            IntKind::UIntPtr => "uintptr_t",
        }
    }

    /// Resolve a `<stdint.h>`/`<stddef.h>` typedef name.
    pub fn from_typedef_name(name: &str) -> Option<IntKind> {
        let kind = match name {
            "int8_t" => IntKind::I8,
            "int16_t" => IntKind::I16,
            "int32_t" => IntKind::I32,
            "int64_t" => IntKind::I64,
            "uint8_t" => IntKind::U8,
            "uint16_t" => IntKind::U16,
            "uint32_t" => IntKind::U32,
            "uint64_t" => IntKind::U64,
            "size_t" => IntKind::Size,
            "ssize_t" | "ptrdiff_t" => IntKind::SSize,
            "intptr_t" => IntKind::IntPtr,
            "uintptr_t" => IntKind::UIntPtr,
            _ => return None,
        };
        Some(kind)
    }

    /// Inclusive value range on an LP64 target.
    ///
    /// Used to reject macro values that cannot be represented in a retyped
    /// constant. `char` is treated as signed.
    pub fn range(self) -> (i128, i128) {
        match self {
            IntKind::Char | IntKind::SChar | IntKind::I8 => (i8::MIN.into(), i8::MAX.into()),
            IntKind::UChar | IntKind::U8 => (0, u8::MAX.into()),
            IntKind::Short | IntKind::I16 => (i16::MIN.into(), i16::MAX.into()),
            IntKind::UShort | IntKind::U16 => (0, u16::MAX.into()),
            IntKind::Int | IntKind::I32 => (i32::MIN.into(), i32::MAX.into()),
            IntKind::UInt | IntKind::U32 => (0, u32::MAX.into()),
            IntKind::Long | IntKind::LongLong | IntKind::I64 | IntKind::SSize | IntKind::IntPtr => {
                (i64::MIN.into(), i64::MAX.into())
            }
            IntKind::ULong
            | IntKind::ULongLong
            | IntKind::U64
            | IntKind::Size
            | IntKind::UIntPtr => (0, u64::MAX.into()),
        }
    }
}

/// A C type as written in a declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum CType {
    Void,
    Bool,
    Int(IntKind),
    Float,
    Double,
    /// `long double`; no portable host equivalent.
    LongDouble,
    /// A typedef name (or any identifier used as a type).
    Named(String),
    Struct(String),
    Union(String),
    Enum(String),
    Pointer {
        pointee: Box<CType>,
        /// Whether the pointee is `const`-qualified.
        is_const: bool,
    },
    Array {
        elem: Box<CType>,
        len: Option<u64>,
    },
    FunctionPointer {
        ret: Box<CType>,
        params: Vec<CType>,
        variadic: bool,
    },
}

impl CType {
    /// Build a pointer to `pointee`.
    pub fn pointer_to(pointee: CType, is_const: bool) -> CType {
        CType::Pointer {
            pointee: Box::new(pointee),
            is_const,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, CType::Void)
    }

    /// If this is a single-level pointer to `char`, return whether the
    /// pointee is `const`.
    pub fn char_pointer_constness(&self) -> Option<bool> {
        match self {
            CType::Pointer { pointee, is_const } if **pointee == CType::Int(IntKind::Char) => {
                Some(*is_const)
            }
            _ => None,
        }
    }

    /// Whether this is a pointer whose pointee is writable.
    pub fn is_mut_pointer(&self) -> bool {
        matches!(self, CType::Pointer { is_const: false, .. })
    }

    fn fmt_prefix(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CType::Void => write!(f, "void"),
            CType::Bool => write!(f, "bool"),
            CType::Int(kind) => write!(f, "{}", kind.c_spelling()),
            CType::Float => write!(f, "float"),
            CType::Double => write!(f, "double"),
            CType::LongDouble => write!(f, "long double"),
            CType::Named(name) => write!(f, "{name}"),
            CType::Struct(name) => write!(f, "struct {name}"),
            CType::Union(name) => write!(f, "union {name}"),
            CType::Enum(name) => write!(f, "enum {name}"),
            CType::Pointer { pointee, is_const } => {
                if *is_const {
                    write!(f, "const ")?;
                }
                pointee.fmt_prefix(f)?;
                write!(f, "*")
            }
            CType::Array { elem, len } => {
                elem.fmt_prefix(f)?;
                match len {
                    Some(n) => write!(f, "[{n}]"),
                    None => write!(f, "[]"),
                }
            }
            CType::FunctionPointer {
                ret,
                params,
                variadic,
            } => {
                ret.fmt_prefix(f)?;
                write!(f, " (*)(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    param.fmt_prefix(f)?;
                }
                if *variadic {
                    if !params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prefix(f)
    }
}

#[cfg(test)]
mod tests;
