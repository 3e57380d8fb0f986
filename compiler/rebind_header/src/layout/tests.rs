use pretty_assertions::assert_eq;

use super::*;

const INT: CType = CType::Int(IntKind::Int);
const UINT: CType = CType::Int(IntKind::UInt);
const UCHAR: CType = CType::Int(IntKind::UChar);
const CHAR: CType = CType::Int(IntKind::Char);

fn field(name: &str, ty: CType) -> Member {
    Member {
        name: Some(name.to_string()),
        ty,
        bits: None,
    }
}

fn bits(name: Option<&str>, ty: CType, width: u64) -> Member {
    Member {
        name: name.map(str::to_string),
        ty,
        bits: Some(width),
    }
}

fn outline(fields: &[Field]) -> Vec<(&str, &CType)> {
    fields.iter().map(|f| (f.name.as_str(), &f.ty)).collect()
}

#[test]
fn test_struct_layout_pads_members() {
    let layouts = Layouts::default();
    let fields = vec![
        Field {
            name: "a".into(),
            ty: CHAR,
        },
        Field {
            name: "b".into(),
            ty: INT,
        },
        Field {
            name: "c".into(),
            ty: CHAR,
        },
    ];
    assert_eq!(
        layouts.aggregate(Aggregate::Struct, &fields),
        Some(Layout { size: 12, align: 4 })
    );
    assert_eq!(
        layouts.aggregate(Aggregate::Union, &fields),
        Some(Layout { size: 4, align: 4 })
    );
}

#[test]
fn test_recorded_types_resolve() {
    let mut layouts = Layouts::default();
    assert_eq!(layouts.of(&CType::Struct("nng_sockaddr_in".into())), None);
    layouts.record(
        CType::Struct("nng_sockaddr_in".into()),
        Layout { size: 8, align: 4 },
    );
    layouts.record_enum("nng_pipe_ev", [0, 1, 2]);
    layouts.record_enum("wide", [0, 1 << 40]);
    let array = CType::Array {
        elem: Box::new(CType::Struct("nng_sockaddr_in".into())),
        len: Some(3),
    };
    assert_eq!(layouts.of(&array), Some(Layout { size: 24, align: 4 }));
    assert_eq!(
        layouts.of(&CType::Enum("nng_pipe_ev".into())),
        Some(Layout { size: 4, align: 4 })
    );
    assert_eq!(
        layouts.of(&CType::Enum("wide".into())),
        Some(Layout { size: 8, align: 8 })
    );
}

#[test]
fn test_bitfield_run_becomes_one_storage_unit() {
    let layouts = Layouts::default();
    let fields = layouts
        .lower_bitfields(
            Aggregate::Struct,
            vec![
                bits(Some("a"), UINT, 1),
                bits(Some("b"), UINT, 3),
                field("c", INT),
            ],
        )
        .unwrap();
    assert_eq!(
        outline(&fields),
        vec![("_bitfield_1", &byte_storage(1)), ("c", &INT)]
    );
    assert_eq!(
        layouts.aggregate(Aggregate::Struct, &fields),
        Some(Layout { size: 8, align: 4 })
    );
}

#[test]
fn test_bitfield_packs_after_char_and_keeps_alignment() {
    // x at 0, a in byte 1, c at byte 2; the struct is int aligned.
    let layouts = Layouts::default();
    let fields = layouts
        .lower_bitfields(
            Aggregate::Struct,
            vec![field("x", CHAR), bits(Some("a"), UINT, 3), field("c", CHAR)],
        )
        .unwrap();
    assert_eq!(
        outline(&fields),
        vec![
            ("_bitfield_align", &align_marker(4)),
            ("x", &CHAR),
            ("_bitfield_1", &byte_storage(1)),
            ("c", &CHAR),
        ]
    );
    assert_eq!(
        layouts.aggregate(Aggregate::Struct, &fields),
        Some(Layout { size: 4, align: 4 })
    );
}

#[test]
fn test_bitfield_that_straddles_moves_to_next_unit() {
    let layouts = Layouts::default();
    let fields = layouts
        .lower_bitfields(
            Aggregate::Struct,
            vec![bits(Some("a"), UCHAR, 5), bits(Some("b"), UCHAR, 5)],
        )
        .unwrap();
    assert_eq!(outline(&fields), vec![("_bitfield_1", &byte_storage(2))]);
}

#[test]
fn test_zero_width_bitfield_closes_unit() {
    let layouts = Layouts::default();
    let fields = layouts
        .lower_bitfields(
            Aggregate::Struct,
            vec![
                bits(Some("a"), UINT, 3),
                bits(None, UINT, 0),
                field("c", CHAR),
            ],
        )
        .unwrap();
    assert_eq!(
        outline(&fields),
        vec![
            ("_bitfield_align", &align_marker(4)),
            ("_bitfield_1", &byte_storage(4)),
            ("c", &CHAR),
        ]
    );
    assert_eq!(
        layouts.aggregate(Aggregate::Struct, &fields),
        Some(Layout { size: 8, align: 4 })
    );
}

#[test]
fn test_union_bitfields_overlap() {
    let layouts = Layouts::default();
    let fields = layouts
        .lower_bitfields(
            Aggregate::Union,
            vec![bits(Some("flags"), UINT, 12), field("raw", CHAR)],
        )
        .unwrap();
    assert_eq!(
        outline(&fields),
        vec![
            ("_bitfield_align", &align_marker(4)),
            ("_bitfield_1", &byte_storage(2)),
            ("raw", &CHAR),
        ]
    );
    assert_eq!(
        layouts.aggregate(Aggregate::Union, &fields),
        Some(Layout { size: 4, align: 4 })
    );
}

#[test]
fn test_unknown_member_layout_gives_up() {
    let layouts = Layouts::default();
    let lowered = layouts.lower_bitfields(
        Aggregate::Struct,
        vec![
            field("peer", CType::Struct("nng_peer".into())),
            bits(Some("a"), UINT, 1),
        ],
    );
    assert_eq!(lowered, None);

    let too_wide = layouts.lower_bitfields(Aggregate::Struct, vec![bits(Some("a"), UCHAR, 9)]);
    assert_eq!(too_wide, None);
}
