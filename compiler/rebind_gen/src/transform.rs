//! Declaration Transformer
//!
//! Walks the header declarations in order, consults the rule registry for
//! each one and builds the output model. Every surviving declaration lands
//! in a single [`Container`] wrapped in a synthetic [`WrapperScope`]
//! together with the imports the declarations need; the reshaper flattens
//! that afterwards.
//!
//! Nothing here mutates the [`HeaderSet`]. Problems become diagnostics and
//! the offending declaration is dropped; the walk always finishes.

use std::collections::BTreeSet;

use rebind_diagnostic::{Diagnostic, ErrorCode};
use rebind_header::HeaderSet;
use rebind_ir::ast::{
    EnumDecl, FunctionDecl, Item, MacroDecl, MacroValue, Origin, StructDecl, TypedefDecl,
};
use rebind_ir::model::{
    ConstShape, ConstValue, Container, Decl, DeclBody, DeclKind, EnumShape, EnumVariant,
    FieldDef, FunctionSig, GeneratedUnit, HostType, Prim, Slot, SlotDirection, StructShape,
    UnitMember, UseDecl, WrapperScope,
};
use rebind_ir::{CType, IntKind};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::marshal::{self, OverrideConflict};
use crate::registry::{Action, RuleRegistry};
use crate::typemap::{map_type, prim_for};

/// Names for the generated unit.
#[derive(Clone, Debug)]
pub struct TransformOptions {
    /// Name of the wrapper scope.
    pub module: String,
    /// Native library the declarations link against.
    pub library: String,
    pub file_name: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            module: "nng".to_string(),
            library: "nng".to_string(),
            file_name: "nng_generated.rs".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Transformed {
    pub unit: GeneratedUnit,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build the output model for `headers` under `registry`.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(items = headers.items.len(), rules = registry.len())
)]
pub fn transform(
    headers: &HeaderSet,
    registry: &RuleRegistry,
    options: &TransformOptions,
) -> Transformed {
    let mut cx = Transformer {
        headers,
        registry,
        decls: Vec::new(),
        diagnostics: Vec::new(),
        discarded: 0,
    };
    for item in &headers.items {
        cx.item(item);
    }
    for (message, origin) in opaque_by_value(&cx.decls) {
        cx.error_at(ErrorCode::E2004, message, origin);
    }
    debug!(
        decls = cx.decls.len(),
        discarded = cx.discarded,
        diagnostics = cx.diagnostics.len(),
        "transformed"
    );

    let mut members: Vec<UnitMember> = required_uses(&cx.decls)
        .into_iter()
        .map(UnitMember::Use)
        .collect();
    members.push(UnitMember::Container(Container {
        library: options.library.clone(),
        decls: cx.decls,
    }));

    Transformed {
        unit: GeneratedUnit {
            file_name: options.file_name.clone(),
            members: vec![UnitMember::Scope(WrapperScope {
                name: options.module.clone(),
                members,
            })],
        },
        diagnostics: cx.diagnostics,
    }
}

/// The rule kind an item is resolved under.
fn kind_of(item: &Item) -> DeclKind {
    match item {
        Item::Function(_) => DeclKind::Function,
        Item::Struct(_) => DeclKind::Struct,
        Item::Enum(_) => DeclKind::Enum,
        Item::Typedef(_) => DeclKind::TypeAlias,
        Item::Macro(_) => DeclKind::Constant,
    }
}

/// A constant value before it is checked against its type.
#[derive(Copy, Clone)]
enum Literal<'a> {
    Int(i128),
    Str(&'a str),
    Other(&'a str),
}

struct Transformer<'a> {
    headers: &'a HeaderSet,
    registry: &'a RuleRegistry,
    decls: Vec<Decl>,
    diagnostics: Vec<Diagnostic>,
    discarded: usize,
}

impl Transformer<'_> {
    fn item(&mut self, item: &Item) {
        // Anonymous enums contribute their enumerators as constants.
        if let Item::Enum(decl) = item {
            if decl.name.is_empty() {
                self.anonymous_enum(decl);
                return;
            }
        }

        let registry = self.registry;
        let kind = kind_of(item);
        let name = item.name();
        let action = registry.resolve(kind, name);
        if matches!(action, Some(Action::Discard)) {
            trace!(%kind, name, "discarded by rule");
            self.discarded += 1;
            return;
        }
        let retype = match action {
            Some(Action::RetypeAs(ty)) => Some(ty),
            _ => None,
        };

        let decl = match item {
            Item::Function(f) => self.function(f, action),
            Item::Struct(s) => self.structure(s, retype),
            Item::Enum(e) => self.enumeration(e, retype),
            Item::Typedef(t) => self.typedef(t, retype),
            Item::Macro(m) => self.constant_macro(m, retype),
        };
        if let Some(decl) = decl {
            self.decls.push(decl);
        }
    }

    fn function(&mut self, f: &FunctionDecl, action: Option<&Action>) -> Option<Decl> {
        let params = f
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let name = p.name.clone().unwrap_or_else(|| format!("arg{i}"));
                let direction = if p.ty.is_mut_pointer() {
                    SlotDirection::Out
                } else {
                    SlotDirection::In
                };
                Slot::new(name, map_type(&p.ty), direction)
            })
            .collect();
        let ret_ty = match action {
            Some(Action::RetypeAs(ty)) => {
                trace!(name = %f.name, to = %ty, "return type retyped");
                map_type(ty)
            }
            _ => map_type(&f.ret),
        };
        let mut sig = FunctionSig {
            link_name: f.name.clone(),
            params,
            ret: Slot::new("return", ret_ty, SlotDirection::Return),
            variadic: f.variadic,
        };
        marshal::assign_defaults(&mut sig);

        if let Some(Action::OverrideMarshal { slot, direction }) = action {
            if let Err(conflict) = marshal::apply_override(&mut sig, slot, *direction) {
                let message = match conflict {
                    OverrideConflict::NoSuchSlot => {
                        format!("function `{}` has no {slot} to marshal", f.name)
                    }
                    OverrideConflict::NotAString => {
                        format!("{slot} of `{}` is not a `char` pointer", f.name)
                    }
                    OverrideConflict::Direction { requested, actual } => format!(
                        "cannot marshal {slot} of `{}` {requested}: values there flow {actual}",
                        f.name
                    ),
                };
                self.error(ErrorCode::E2002, message, f.origin);
                return None;
            }
        }

        let mut decl = located(&f.name, DeclKind::Function, DeclBody::Function(sig), f.origin);
        decl.doc.clone_from(&f.doc);
        Some(decl)
    }

    fn structure(&mut self, s: &StructDecl, retype: Option<&CType>) -> Option<Decl> {
        if let Some(target) = retype {
            let ty = self.alias_target(&s.name, target, s.origin)?;
            return Some(located(&s.name, DeclKind::Struct, DeclBody::Alias(ty), s.origin));
        }
        let fields = s.fields.as_ref().map(|fields| {
            fields
                .iter()
                .map(|field| FieldDef {
                    name: field.name.clone(),
                    ty: map_type(&field.ty),
                })
                .collect()
        });
        let shape = StructShape {
            aggregate: s.aggregate,
            fields,
            value_equality: None,
        };
        Some(located(&s.name, DeclKind::Struct, DeclBody::Struct(shape), s.origin))
    }

    fn enumeration(&mut self, e: &EnumDecl, retype: Option<&CType>) -> Option<Decl> {
        let repr = match retype {
            Some(CType::Int(kind)) => {
                let (min, max) = kind.range();
                if let Some(item) = e
                    .items
                    .iter()
                    .find(|item| !(min..=max).contains(&i128::from(item.value)))
                {
                    let message = format!(
                        "enumerator `{}` = {} does not fit `{}`",
                        item.name,
                        item.value,
                        kind.c_spelling()
                    );
                    self.error(ErrorCode::E2003, message, e.origin);
                    return None;
                }
                HostType::Prim(prim_for(*kind))
            }
            Some(other) => {
                let message = format!(
                    "cannot use `{other}` as the underlying type of enum `{}`",
                    e.name
                );
                self.error(ErrorCode::E2001, message, e.origin);
                return None;
            }
            None => default_repr(e.items.iter().map(|item| item.value)),
        };
        let variants = e
            .items
            .iter()
            .map(|item| EnumVariant {
                name: item.name.clone(),
                value: item.value,
            })
            .collect();
        let shape = EnumShape { repr, variants };
        Some(located(&e.name, DeclKind::Enum, DeclBody::Enum(shape), e.origin))
    }

    fn anonymous_enum(&mut self, e: &EnumDecl) {
        let registry = self.registry;
        for item in &e.items {
            match registry.resolve(DeclKind::Constant, &item.name) {
                Some(Action::Discard) => {
                    trace!(name = %item.name, "enumerator discarded by rule");
                    self.discarded += 1;
                }
                Some(Action::RetypeAs(target)) => {
                    let literal = Literal::Int(item.value.into());
                    if let Some(decl) = self.constant(&item.name, literal, target, e.origin) {
                        self.decls.push(decl);
                    }
                }
                _ => {
                    let shape = ConstShape {
                        ty: HostType::Prim(Prim::CInt),
                        value: ConstValue::Int(item.value.into()),
                    };
                    self.decls.push(located(
                        &item.name,
                        DeclKind::Constant,
                        DeclBody::Constant(shape),
                        e.origin,
                    ));
                }
            }
        }
    }

    fn typedef(&mut self, t: &TypedefDecl, retype: Option<&CType>) -> Option<Decl> {
        if let Some(target) = retype {
            let ty = self.alias_target(&t.name, target, t.origin)?;
            return Some(located(&t.name, DeclKind::TypeAlias, DeclBody::Alias(ty), t.origin));
        }
        match &t.ty {
            CType::Struct(tag) | CType::Union(tag) | CType::Enum(tag) if *tag == t.name => {
                trace!(name = %t.name, "typedef collapsed into its tag");
                None
            }
            ty => Some(located(
                &t.name,
                DeclKind::TypeAlias,
                DeclBody::Alias(map_type(ty)),
                t.origin,
            )),
        }
    }

    /// Object-like macros only become constants through a retype rule.
    fn constant_macro(&mut self, m: &MacroDecl, retype: Option<&CType>) -> Option<Decl> {
        let Some(target) = retype else {
            trace!(name = %m.name, "macro without a retype rule dropped");
            return None;
        };
        let literal = match &m.value {
            MacroValue::Int(value) => Literal::Int(*value),
            MacroValue::Str(value) => Literal::Str(value),
            MacroValue::Other => Literal::Other(&m.body),
        };
        self.constant(&m.name, literal, target, m.origin)
    }

    fn constant(
        &mut self,
        name: &str,
        literal: Literal<'_>,
        target: &CType,
        origin: Origin,
    ) -> Option<Decl> {
        let shape = match (target, literal) {
            (CType::Int(kind), Literal::Int(value))
                if (kind.range().0..=kind.range().1).contains(&value) =>
            {
                ConstShape {
                    ty: HostType::Prim(prim_for(*kind)),
                    value: ConstValue::Int(value),
                }
            }
            (ty, Literal::Str(value)) if ty.char_pointer_constness().is_some() => ConstShape {
                ty: HostType::Str,
                value: ConstValue::Str(value.to_string()),
            },
            _ if is_constant_type(target) => {
                let shown = match literal {
                    Literal::Int(value) => value.to_string(),
                    Literal::Str(value) => format!("{value:?}"),
                    Literal::Other("") => "(empty)".to_string(),
                    Literal::Other(body) => format!("`{body}`"),
                };
                let message = format!("value {shown} of `{name}` does not fit `{target}`");
                self.error(ErrorCode::E2003, message, origin);
                return None;
            }
            _ => {
                let message = format!("constant `{name}` cannot be retyped as `{target}`");
                self.error(ErrorCode::E2001, message, origin);
                return None;
            }
        };
        Some(located(name, DeclKind::Constant, DeclBody::Constant(shape), origin))
    }

    fn alias_target(&mut self, name: &str, target: &CType, origin: Origin) -> Option<HostType> {
        if target.is_void() {
            let message = format!("`{name}` cannot be retyped as `void`");
            self.error(ErrorCode::E2001, message, origin);
            return None;
        }
        Some(map_type(target))
    }

    fn error(&mut self, code: ErrorCode, message: String, origin: Origin) {
        self.error_at(code, message, Some(origin));
    }

    fn error_at(&mut self, code: ErrorCode, message: String, origin: Option<Origin>) {
        let mut diag = Diagnostic::error(code).with_message(message);
        if let Some(location) = origin.and_then(|origin| self.headers.locate(origin)) {
            diag = diag.with_location(location);
        }
        self.diagnostics.push(diag);
    }
}

/// Fields, parameters and returns whose type is an opaque struct (or an
/// alias of one) held by value. The host type would be zero-sized.
fn opaque_by_value(decls: &[Decl]) -> Vec<(String, Option<Origin>)> {
    let mut opaque: FxHashSet<&str> = decls
        .iter()
        .filter_map(|decl| match &decl.body {
            DeclBody::Struct(shape) if shape.fields.is_none() => Some(decl.name.as_str()),
            _ => None,
        })
        .collect();
    loop {
        let before = opaque.len();
        for decl in decls {
            if let DeclBody::Alias(HostType::Named(target)) = &decl.body {
                if opaque.contains(target.as_str()) {
                    opaque.insert(decl.name.as_str());
                }
            }
        }
        if opaque.len() == before {
            break;
        }
    }

    let held = |ty: &HostType| -> Option<String> {
        let mut ty = ty;
        while let HostType::Array { elem, .. } = ty {
            ty = elem;
        }
        match ty {
            HostType::Named(name) if opaque.contains(name.as_str()) => Some(name.clone()),
            _ => None,
        }
    };

    let mut found = Vec::new();
    for decl in decls {
        let uses: Vec<(&str, &HostType)> = match &decl.body {
            DeclBody::Function(sig) => sig
                .params
                .iter()
                .chain(Some(&sig.ret))
                .map(|slot| (slot.name.as_str(), &slot.ty))
                .collect(),
            DeclBody::Struct(shape) => shape
                .fields
                .iter()
                .flatten()
                .map(|field| (field.name.as_str(), &field.ty))
                .collect(),
            DeclBody::Enum(_) | DeclBody::Constant(_) | DeclBody::Alias(_) => Vec::new(),
        };
        for (slot, ty) in uses {
            if let Some(name) = held(ty) {
                found.push((
                    format!(
                        "`{}` holds opaque type `{name}` by value in `{slot}`",
                        decl.name
                    ),
                    decl.origin,
                ));
            }
        }
    }
    found
}

fn located(name: &str, kind: DeclKind, body: DeclBody, origin: Origin) -> Decl {
    let mut decl = Decl::new(name, kind, body);
    decl.origin = Some(origin);
    decl
}

/// Integer and `char` pointer targets are the types a constant can have.
fn is_constant_type(ty: &CType) -> bool {
    matches!(ty, CType::Int(_)) || ty.char_pointer_constness().is_some()
}

/// `c_int` when every value fits, widening only when needed.
fn default_repr(values: impl Iterator<Item = i64> + Clone) -> HostType {
    let fits = |kind: IntKind| {
        let (min, max) = kind.range();
        values.clone().all(|v| (min..=max).contains(&i128::from(v)))
    };
    let prim = if fits(IntKind::Int) {
        Prim::CInt
    } else if fits(IntKind::UInt) {
        Prim::CUInt
    } else {
        Prim::I64
    };
    HostType::Prim(prim)
}

/// Imports the declarations refer to, sorted and deduplicated.
fn required_uses(decls: &[Decl]) -> Vec<UseDecl> {
    let mut paths = BTreeSet::new();
    let mut visit = |ty: &HostType| match ty {
        HostType::Prim(prim) if prim.is_ffi_alias() => {
            paths.insert(format!("core::ffi::{}", prim.rust_name()));
        }
        HostType::CVoid => {
            paths.insert("core::ffi::c_void".to_string());
        }
        _ => {}
    };
    let mut codecs = BTreeSet::new();
    for decl in decls {
        match &decl.body {
            DeclBody::Function(sig) => {
                for slot in sig.params.iter().chain(Some(&sig.ret)) {
                    slot.ty.walk(&mut visit);
                }
            }
            DeclBody::Struct(shape) => {
                for field in shape.fields.iter().flatten() {
                    field.ty.walk(&mut visit);
                }
            }
            DeclBody::Enum(shape) => shape.repr.walk(&mut visit),
            DeclBody::Constant(shape) => shape.ty.walk(&mut visit),
            DeclBody::Alias(ty) => ty.walk(&mut visit),
        }
        for (_, codec) in decl.marshal_hints() {
            codecs.insert(format!("rebind_rt::{}", codec.runtime_name()));
        }
    }
    paths.into_iter().chain(codecs).map(UseDecl::new).collect()
}
