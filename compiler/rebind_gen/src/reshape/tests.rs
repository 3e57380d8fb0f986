use pretty_assertions::assert_eq;

use super::*;
use rebind_ir::model::{
    DeclKind, EnumShape, FunctionSig, Prim, Slot, SlotDirection, StructShape, WrapperScope,
};

fn field(name: &str, ty: HostType) -> FieldDef {
    FieldDef {
        name: name.to_string(),
        ty,
    }
}

fn named(name: &str) -> HostType {
    HostType::Named(name.to_string())
}

fn strukt(name: &str, fields: Vec<FieldDef>) -> Decl {
    aggregate(name, Aggregate::Struct, Some(fields))
}

fn aggregate(name: &str, aggregate: Aggregate, fields: Option<Vec<FieldDef>>) -> Decl {
    Decl::new(
        name,
        DeclKind::Struct,
        DeclBody::Struct(StructShape {
            aggregate,
            fields,
            value_equality: None,
        }),
    )
}

fn function(name: &str) -> Decl {
    Decl::new(
        name,
        DeclKind::Function,
        DeclBody::Function(FunctionSig {
            link_name: name.to_string(),
            params: vec![],
            ret: Slot::new("return", HostType::Unit, SlotDirection::Return),
            variadic: false,
        }),
    )
}

fn wrapped(members: Vec<UnitMember>) -> GeneratedUnit {
    GeneratedUnit {
        file_name: "nng_generated.rs".to_string(),
        members: vec![UnitMember::Scope(WrapperScope {
            name: "nng".to_string(),
            members,
        })],
    }
}

fn container(decls: Vec<Decl>) -> UnitMember {
    UnitMember::Container(Container {
        library: "nng".to_string(),
        decls,
    })
}

fn use_(path: &str) -> UnitMember {
    UnitMember::Use(UseDecl::new(path))
}

fn equality(unit: &GeneratedUnit, name: &str) -> Option<ValueEquality> {
    let decl = unit
        .container()
        .unwrap()
        .decls
        .iter()
        .find(|d| d.name == name)
        .unwrap();
    match &decl.body {
        DeclBody::Struct(shape) => shape.value_equality,
        other => panic!("{other:?}"),
    }
}

#[test]
fn test_hoists_uses_and_drops_scope() {
    let unit = wrapped(vec![
        use_("core::ffi::c_int"),
        container(vec![function("nng_close"), function("nng_dial")]),
        use_("core::ffi::c_char"),
        use_("core::ffi::c_int"),
    ]);
    let out = reshape(unit, "_s").unwrap();
    assert!(out.warnings.is_empty());
    assert_eq!(out.unit.file_name, "nng_generated.rs");
    assert_eq!(out.unit.members.len(), 3);
    let uses: Vec<&str> = out.unit.uses().map(|u| u.path.as_str()).collect();
    assert_eq!(uses, vec!["core::ffi::c_int", "core::ffi::c_char"]);
    assert!(matches!(out.unit.members[2], UnitMember::Container(_)));
    let names: Vec<&str> = out
        .unit
        .container()
        .unwrap()
        .decls
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, vec!["nng_close", "nng_dial"]);
}

#[test]
fn test_empty_container_is_fine() {
    let out = reshape(wrapped(vec![container(vec![])]), "_s").unwrap();
    assert_eq!(out.unit.members.len(), 1);
    assert!(out.unit.container().unwrap().decls.is_empty());
}

#[test]
fn test_shape_violations() {
    let missing_scope = GeneratedUnit {
        file_name: "x.rs".into(),
        members: vec![container(vec![])],
    };
    assert_eq!(
        reshape(missing_scope, "_s").unwrap_err(),
        ReshapeError::ScopeCount(0)
    );

    assert_eq!(
        reshape(wrapped(vec![use_("a")]), "_s").unwrap_err(),
        ReshapeError::ContainerCount(0)
    );
    assert_eq!(
        reshape(wrapped(vec![container(vec![]), container(vec![])]), "_s").unwrap_err(),
        ReshapeError::ContainerCount(2)
    );

    let nested = wrapped(vec![UnitMember::Scope(WrapperScope {
        name: "inner".into(),
        members: vec![],
    })]);
    let err = reshape(nested, "_s").unwrap_err();
    let diag = err.into_diagnostic();
    assert_eq!(diag.code, ErrorCode::E9001);
    assert!(diag.is_error());
    assert_eq!(
        diag.message,
        "wrapper scope `nng` contains nested scope `inner`"
    );
}

#[test]
fn test_value_equality_by_suffix_only() {
    let unit = wrapped(vec![container(vec![
        strukt("nng_socket_s", vec![field("id", HostType::Prim(Prim::U32))]),
        strukt("nng_socket", vec![field("id", HostType::Prim(Prim::U32))]),
        aggregate("nng_ctx_s", Aggregate::Struct, None),
    ])]);
    let out = reshape(unit, "_s").unwrap();
    assert!(out.warnings.is_empty());
    assert_eq!(equality(&out.unit, "nng_socket_s"), Some(ValueEquality::Full));
    assert_eq!(equality(&out.unit, "nng_socket"), None);
    assert_eq!(equality(&out.unit, "nng_ctx_s"), None);
}

#[test]
fn test_floats_limit_to_partial_eq() {
    let unit = wrapped(vec![container(vec![
        strukt("point_s", vec![field("x", HostType::Prim(Prim::CDouble))]),
        strukt("segment_s", vec![field("from", named("point_s"))]),
        strukt(
            "buffer_s",
            vec![
                field(
                    "data",
                    HostType::Array {
                        elem: Box::new(HostType::Prim(Prim::U8)),
                        len: 8,
                    },
                ),
                field("next", HostType::ptr(named("point_s"), true)),
            ],
        ),
    ])]);
    let out = reshape(unit, "_s").unwrap();
    assert_eq!(equality(&out.unit, "point_s"), Some(ValueEquality::Partial));
    assert_eq!(equality(&out.unit, "segment_s"), Some(ValueEquality::Partial));
    // Pointers compare by address and never carry the float.
    assert_eq!(equality(&out.unit, "buffer_s"), Some(ValueEquality::Full));
}

#[test]
fn test_non_comparable_fields_demote_transitively() {
    let ev = Decl::new(
        "nng_pipe_ev",
        DeclKind::Enum,
        DeclBody::Enum(EnumShape {
            repr: HostType::Prim(Prim::CInt),
            variants: vec![],
        }),
    );
    let unit = wrapped(vec![container(vec![
        aggregate(
            "nng_sockaddr",
            Aggregate::Union,
            Some(vec![field("s_family", HostType::Prim(Prim::U16))]),
        ),
        Decl::new(
            "nng_sockaddr_alias",
            DeclKind::TypeAlias,
            DeclBody::Alias(named("nng_sockaddr")),
        ),
        ev,
        strukt("holder_s", vec![field("addr", named("nng_sockaddr_alias"))]),
        strukt("outer_s", vec![field("inner", named("holder_s"))]),
        strukt("event_s", vec![field("ev", named("nng_pipe_ev"))]),
    ])]);
    let out = reshape(unit, "_s").unwrap();
    assert_eq!(equality(&out.unit, "holder_s"), None);
    assert_eq!(equality(&out.unit, "outer_s"), None);
    assert_eq!(equality(&out.unit, "event_s"), Some(ValueEquality::Full));

    let messages: Vec<&str> = out.warnings.iter().map(|w| w.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "`holder_s` cannot compare by value: field `addr` is not comparable",
            "`outer_s` cannot compare by value: field `inner` is not comparable",
        ]
    );
    assert!(out
        .warnings
        .iter()
        .all(|w| w.code == ErrorCode::W1001 && !w.is_error()));
}

#[test]
fn test_mutually_referencing_candidates_stay_promoted() {
    let unit = wrapped(vec![container(vec![
        strukt("a_s", vec![field("b", HostType::ptr(named("b_s"), false))]),
        strukt("b_s", vec![field("a", named("a_s"))]),
    ])]);
    let out = reshape(unit, "_s").unwrap();
    assert_eq!(equality(&out.unit, "a_s"), Some(ValueEquality::Full));
    assert_eq!(equality(&out.unit, "b_s"), Some(ValueEquality::Full));
}
