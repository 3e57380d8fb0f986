//! Source declaration AST.
//!
//! This is what the header front end hands to the generator: a flat,
//! fully materialized list of top-level declarations in source order.
//! Nothing downstream mutates these values.

use crate::{CType, FileId, Span};

/// Where a declaration came from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Origin {
    pub file: FileId,
    pub span: Span,
}

impl Origin {
    pub const fn new(file: FileId, span: Span) -> Self {
        Origin { file, span }
    }
}

/// A top-level declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Item {
    Function(FunctionDecl),
    Struct(StructDecl),
    Enum(EnumDecl),
    Typedef(TypedefDecl),
    Macro(MacroDecl),
}

impl Item {
    /// The declared symbol name.
    pub fn name(&self) -> &str {
        match self {
            Item::Function(f) => &f.name,
            Item::Struct(s) => &s.name,
            Item::Enum(e) => &e.name,
            Item::Typedef(t) => &t.name,
            Item::Macro(m) => &m.name,
        }
    }

    pub fn origin(&self) -> Origin {
        match self {
            Item::Function(f) => f.origin,
            Item::Struct(s) => s.origin,
            Item::Enum(e) => e.origin,
            Item::Typedef(t) => t.origin,
            Item::Macro(m) => m.origin,
        }
    }
}

/// A function prototype.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FunctionDecl {
    pub name: String,
    pub ret: CType,
    pub params: Vec<Param>,
    pub variadic: bool,
    /// Leading `/* */` or `//` comment text, if any.
    pub doc: Option<String>,
    pub origin: Origin,
}

/// A function parameter. Unnamed parameters get `None`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Param {
    pub name: Option<String>,
    pub ty: CType,
}

/// Struct or union.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Aggregate {
    Struct,
    Union,
}

/// A struct or union declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StructDecl {
    /// The tag name. Anonymous aggregates are named after their typedef.
    pub name: String,
    pub aggregate: Aggregate,
    /// `None` for a forward declaration (opaque type).
    pub fields: Option<Vec<Field>>,
    pub origin: Origin,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Field {
    pub name: String,
    pub ty: CType,
}

/// An enum declaration with evaluated enumerator values.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct EnumDecl {
    pub name: String,
    pub items: Vec<EnumItem>,
    pub origin: Origin,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct EnumItem {
    pub name: String,
    pub value: i64,
}

/// `typedef <ty> <name>;`
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypedefDecl {
    pub name: String,
    pub ty: CType,
    pub origin: Origin,
}

/// An object-like `#define`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MacroDecl {
    pub name: String,
    /// The replacement list as written (whitespace-normalized).
    pub body: String,
    pub value: MacroValue,
    pub origin: Origin,
}

/// The evaluated value of a macro body.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum MacroValue {
    /// Integer constant expression (literal suffixes stripped).
    Int(i128),
    /// String literal, adjacent literals concatenated, escapes resolved.
    Str(String),
    /// Anything else: empty bodies, keywords, unevaluable expressions.
    Other,
}
