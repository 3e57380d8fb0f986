//! Rust rendering of the generated unit.
//!
//! Output is a pure function of the unit: same unit, same bytes. Layout:
//!
//! ```text
//! header comment and lint allowances
//! use ...;                      (hoisted imports, in unit order)
//! #[link(name = "...")]         (linkage anchor)
//! declarations                  (container order)
//! ```
//!
//! A function with marshalled slots is emitted twice: a private raw
//! declaration bound to the native symbol through `#[link_name]`, and a
//! public `unsafe fn` shim with the native name that applies the codecs.

use rebind_ir::ast::Aggregate;
use rebind_ir::model::{
    Codec, ConstShape, ConstValue, Container, Decl, DeclBody, EnumShape, FunctionSig,
    GeneratedUnit, HostType, StructShape, UnitMember, ValueEquality, Visibility,
};
use tracing::debug;

use crate::writer::SourceWriter;

const HEADER: &str = "// @generated by rebind from C headers. Do not edit by hand.";

const LINT_ALLOWANCES: &str = "#![allow(\n    \
    non_camel_case_types,\n    \
    non_snake_case,\n    \
    non_upper_case_globals,\n    \
    dead_code,\n    \
    clippy::missing_safety_doc\n\
)]";

/// Prefix for the private raw declaration behind a shim.
const RAW_PREFIX: &str = "__rebind_raw_";

/// Render a reshaped unit as Rust source.
#[tracing::instrument(level = "debug", skip_all, fields(file = %unit.file_name))]
pub fn render(unit: &GeneratedUnit) -> String {
    let mut w = SourceWriter::new();
    w.writeln(HEADER);
    w.newline();
    for line in LINT_ALLOWANCES.lines() {
        w.writeln(line);
    }
    w.newline();

    let uses: Vec<_> = unit.uses().collect();
    for u in &uses {
        w.writeln(&format!("use {};", u.path));
    }
    if !uses.is_empty() {
        w.newline();
    }

    let mut shims = 0usize;
    for member in &unit.members {
        if let UnitMember::Container(container) = member {
            shims += render_container(&mut w, container);
        }
    }

    let text = w.finish();
    debug!(bytes = text.len(), shims, "rendered");
    text
}

fn render_container(w: &mut SourceWriter, container: &Container) -> usize {
    w.writeln(&format!("#[link(name = {:?})]", container.library));
    w.writeln("unsafe extern \"C\" {}");

    let mut shims = 0;
    for decl in &container.decls {
        w.newline();
        match &decl.body {
            DeclBody::Function(sig) => {
                if render_function(w, decl, sig) {
                    shims += 1;
                }
            }
            DeclBody::Struct(shape) => render_struct(w, decl, shape),
            DeclBody::Enum(shape) => render_enum(w, decl, shape),
            DeclBody::Constant(shape) => render_constant(w, decl, shape),
            DeclBody::Alias(ty) => {
                w.doc(decl.doc.as_deref());
                w.writeln(&format!(
                    "{}type {} = {};",
                    vis(decl),
                    ident(&decl.name),
                    ty_str(ty)
                ));
            }
        }
    }
    shims
}

fn vis(decl: &Decl) -> &'static str {
    match decl.visibility {
        Visibility::Public => "pub ",
        Visibility::Private => "",
    }
}

/// Returns whether a shim was emitted.
fn render_function(w: &mut SourceWriter, decl: &Decl, sig: &FunctionSig) -> bool {
    // Variadic shims cannot be written in stable Rust; the raw
    // declaration is exposed instead.
    let shim = sig.is_marshalled() && !sig.variadic;
    if sig.is_marshalled() && sig.variadic {
        debug!(name = %decl.name, "variadic function emitted without a shim");
    }

    let params: Vec<String> = sig
        .params
        .iter()
        .map(|p| format!("{}: {}", ident(&p.name), ty_str(&p.ty)))
        .chain(sig.variadic.then(|| "...".to_string()))
        .collect();
    let ret = ret_suffix(&sig.ret.ty);

    w.writeln("unsafe extern \"C\" {");
    w.indent();
    if shim {
        w.writeln(&format!("#[link_name = {:?}]", sig.link_name));
        w.writeln(&format!(
            "fn {RAW_PREFIX}{}({}){ret};",
            decl.name,
            params.join(", ")
        ));
    } else {
        w.doc(decl.doc.as_deref());
        if sig.link_name != decl.name {
            w.writeln(&format!("#[link_name = {:?}]", sig.link_name));
        }
        w.writeln(&format!(
            "{}fn {}({}){ret};",
            vis(decl),
            ident(&decl.name),
            params.join(", ")
        ));
    }
    w.dedent();
    w.writeln("}");

    if shim {
        w.newline();
        render_shim(w, decl, sig);
    }
    shim
}

fn render_shim(w: &mut SourceWriter, decl: &Decl, sig: &FunctionSig) {
    let params: Vec<String> = sig
        .params
        .iter()
        .map(|p| {
            let ty = match p.codec {
                Some(Codec::Utf8ToNative) => "&str".to_string(),
                _ => ty_str(&p.ty),
            };
            format!("{}: {ty}", ident(&p.name))
        })
        .collect();
    let ret = match sig.ret.codec {
        Some(Codec::Utf8FromNative) => " -> String".to_string(),
        _ => ret_suffix(&sig.ret.ty),
    };

    w.doc(decl.doc.as_deref());
    w.writeln(&format!(
        "{}unsafe fn {}({}){ret} {{",
        vis(decl),
        ident(&decl.name),
        params.join(", ")
    ));
    w.indent();

    let mut args = Vec::with_capacity(sig.params.len());
    for p in &sig.params {
        let name = ident(&p.name);
        if p.codec == Some(Codec::Utf8ToNative) {
            w.writeln(&format!(
                "let {name} = {}::encode({name});",
                Codec::Utf8ToNative.runtime_name()
            ));
            let mutable = matches!(p.ty, HostType::Ptr { mutable: true, .. });
            args.push(if mutable {
                format!("{name}.as_ptr().cast_mut()")
            } else {
                format!("{name}.as_ptr()")
            });
        } else {
            args.push(name);
        }
    }

    let call = format!("{RAW_PREFIX}{}({})", decl.name, args.join(", "));
    let call = match sig.ret.codec {
        Some(Codec::Utf8FromNative) => {
            let read = match sig.ret.ty {
                HostType::Ptr { mutable: true, .. } => format!("{call}.cast_const()"),
                _ => call,
            };
            format!("{}::decode({read})", Codec::Utf8FromNative.runtime_name())
        }
        _ => call,
    };
    w.writeln(&format!("unsafe {{ {call} }}"));
    w.dedent();
    w.writeln("}");
}

fn ret_suffix(ty: &HostType) -> String {
    match ty {
        HostType::Unit => String::new(),
        other => format!(" -> {}", ty_str(other)),
    }
}

fn render_struct(w: &mut SourceWriter, decl: &Decl, shape: &StructShape) {
    let name = ident(&decl.name);
    w.doc(decl.doc.as_deref());
    w.writeln("#[repr(C)]");
    let Some(fields) = &shape.fields else {
        w.writeln(&format!("{}struct {name} {{", vis(decl)));
        w.indent();
        w.writeln("_private: [u8; 0],");
        w.dedent();
        w.writeln("}");
        return;
    };

    let keyword = match shape.aggregate {
        Aggregate::Struct => "struct",
        Aggregate::Union => "union",
    };
    let derives = match (shape.aggregate, shape.value_equality) {
        (Aggregate::Struct, Some(ValueEquality::Full)) => {
            "Debug, Clone, Copy, PartialEq, Eq, Hash"
        }
        (Aggregate::Struct, Some(ValueEquality::Partial)) => "Debug, Clone, Copy, PartialEq",
        _ => "Clone, Copy",
    };
    w.writeln(&format!("#[derive({derives})]"));
    w.writeln(&format!("{}{keyword} {name} {{", vis(decl)));
    w.indent();
    for field in fields {
        w.writeln(&format!("pub {}: {},", ident(&field.name), ty_str(&field.ty)));
    }
    w.dedent();
    w.writeln("}");
}

fn render_enum(w: &mut SourceWriter, decl: &Decl, shape: &EnumShape) {
    let name = ident(&decl.name);
    w.doc(decl.doc.as_deref());
    w.writeln("#[repr(transparent)]");
    w.writeln("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]");
    w.writeln(&format!(
        "{}struct {name}(pub {});",
        vis(decl),
        ty_str(&shape.repr)
    ));
    if shape.variants.is_empty() {
        return;
    }
    w.newline();
    w.writeln(&format!("impl {name} {{"));
    w.indent();
    for variant in &shape.variants {
        w.writeln(&format!(
            "pub const {}: {name} = {name}({});",
            ident(&variant.name),
            variant.value
        ));
    }
    w.dedent();
    w.writeln("}");
}

fn render_constant(w: &mut SourceWriter, decl: &Decl, shape: &ConstShape) {
    let value = match &shape.value {
        ConstValue::Int(v) => v.to_string(),
        ConstValue::Str(s) => format!("{s:?}"),
    };
    w.doc(decl.doc.as_deref());
    w.writeln(&format!(
        "{}const {}: {} = {value};",
        vis(decl),
        ident(&decl.name),
        ty_str(&shape.ty)
    ));
}

/// Rust spelling of a host type.
pub fn ty_str(ty: &HostType) -> String {
    match ty {
        HostType::Unit => "()".to_string(),
        HostType::Prim(prim) => prim.rust_name().to_string(),
        HostType::CVoid => "c_void".to_string(),
        HostType::Named(name) => ident(name),
        HostType::Ptr { pointee, mutable } => {
            let qualifier = if *mutable { "mut" } else { "const" };
            format!("*{qualifier} {}", ty_str(pointee))
        }
        HostType::Array { elem, len } => format!("[{}; {len}]", ty_str(elem)),
        HostType::FnPtr {
            params,
            ret,
            variadic,
        } => {
            let mut args: Vec<String> = params.iter().map(ty_str).collect();
            if *variadic {
                args.push("...".to_string());
            }
            format!(
                "Option<unsafe extern \"C\" fn({}){}>",
                args.join(", "),
                ret_suffix(ret)
            )
        }
        HostType::Str => "&str".to_string(),
    }
}

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe",
    "unsized", "use", "virtual", "where", "while", "yield",
];

/// Escape a C identifier that is reserved in Rust.
///
/// Keywords become raw identifiers; the few that cannot be raw get a
/// trailing underscore.
pub fn ident(name: &str) -> String {
    match name {
        "self" | "Self" | "super" | "crate" | "_" => format!("{name}_"),
        kw if KEYWORDS.contains(&kw) => format!("r#{kw}"),
        other => other.to_string(),
    }
}
