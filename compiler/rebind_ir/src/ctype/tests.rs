use pretty_assertions::assert_eq;

use super::*;

#[test]
fn display_const_char_pointer() {
    let ty = CType::pointer_to(CType::Int(IntKind::Char), true);
    assert_eq!(ty.to_string(), "const char*");
}

#[test]
fn display_function_pointer() {
    let ty = CType::FunctionPointer {
        ret: Box::new(CType::Void),
        params: vec![CType::pointer_to(CType::Void, false)],
        variadic: false,
    };
    assert_eq!(ty.to_string(), "void (*)(void*)");
}

#[test]
fn display_array_of_named() {
    let ty = CType::Array {
        elem: Box::new(CType::Named("nng_sockaddr".into())),
        len: Some(4),
    };
    assert_eq!(ty.to_string(), "nng_sockaddr[4]");
}

#[test]
fn char_pointer_constness() {
    let c = CType::pointer_to(CType::Int(IntKind::Char), true);
    let m = CType::pointer_to(CType::Int(IntKind::Char), false);
    let u = CType::pointer_to(CType::Int(IntKind::UChar), true);
    let pp = CType::pointer_to(m.clone(), false);

    assert_eq!(c.char_pointer_constness(), Some(true));
    assert_eq!(m.char_pointer_constness(), Some(false));
    assert_eq!(u.char_pointer_constness(), None);
    assert_eq!(pp.char_pointer_constness(), None);
}

#[test]
fn typedef_names_resolve_to_fixed_width() {
    assert_eq!(IntKind::from_typedef_name("uint32_t"), Some(IntKind::U32));
    assert_eq!(IntKind::from_typedef_name("size_t"), Some(IntKind::Size));
    assert_eq!(IntKind::from_typedef_name("nng_duration"), None);
}

#[test]
fn int_ranges() {
    assert_eq!(IntKind::Int.range(), (-2_147_483_648, 2_147_483_647));
    assert_eq!(IntKind::U8.range(), (0, 255));
    assert_eq!(IntKind::Size.range().1, i128::from(u64::MAX));
}
