use pretty_assertions::assert_eq;

use super::*;

fn run(pp: &mut Preprocessor, source: &str) -> Preprocessed {
    let lexed = lex(source);
    assert!(lexed.errors.is_empty());
    pp.process(FileId(0), source, &lexed.tokens)
}

fn text(out: &Preprocessed) -> String {
    out.tokens
        .iter()
        .map(|t| t.kind.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn test_object_like_expansion() {
    let mut pp = Preprocessor::new();
    let out = run(
        &mut pp,
        "#define NNG_DECL extern\nNNG_DECL int nng_close(nng_socket);\n",
    );
    assert_eq!(text(&out), "extern int nng_close ( nng_socket ) ;");
    assert!(out.diagnostics.is_empty());
}

#[test]
fn test_nested_expansion_takes_invocation_span() {
    let mut pp = Preprocessor::new();
    let source = "#define A B\n#define B 7\nint x[A];\n";
    let out = run(&mut pp, source);
    assert_eq!(text(&out), "int x [ 7 ] ;");
    let seven = &out.tokens[3];
    assert_eq!(&source[seven.span.to_range()], "A");
}

#[test]
fn test_self_referential_macro_stops() {
    let mut pp = Preprocessor::new();
    let out = run(&mut pp, "#define LOOP LOOP + 1\nLOOP\n");
    assert_eq!(text(&out), "LOOP + 1");
}

#[test]
fn test_function_like_macro_not_expanded() {
    let mut pp = Preprocessor::new();
    let out = run(&mut pp, "#define F(x) (x)\n#define G (y)\nF(1) G\n");
    assert_eq!(text(&out), "F ( 1 ) ( y )");
    // Only the object-like macro becomes a declaration.
    let names: Vec<&str> = out.macros.iter().map(|(_, m)| m.name.as_str()).collect();
    assert_eq!(names, vec!["G"]);
}

#[test]
fn test_ifdef_follows_defines() {
    let mut pp = Preprocessor::new();
    pp.define("NNG_ELIDE_DEPRECATED", None);
    let out = run(
        &mut pp,
        "#ifndef NNG_ELIDE_DEPRECATED\nint old;\n#else\nint new_api;\n#endif\n",
    );
    assert_eq!(text(&out), "int new_api ;");
}

#[test]
fn test_if_defined_and_elif() {
    let mut pp = Preprocessor::new();
    pp.define("NNG_SHARED_LIB", None);
    let source = "\
#if defined(_WIN32) && !defined(NNG_STATIC_LIB)
#define NNG_DECL __declspec(dllimport)
#elif defined NNG_SHARED_LIB
#define NNG_DECL extern
#else
#define NNG_DECL static
#endif
NNG_DECL void nng_fini(void);
";
    let out = run(&mut pp, source);
    assert_eq!(text(&out), "extern void nng_fini ( void ) ;");
}

#[test]
fn test_if_arithmetic_and_unknown_identifiers() {
    let mut pp = Preprocessor::new();
    let out = run(
        &mut pp,
        "#define NNG_MAJOR_VERSION 1\n#if NNG_MAJOR_VERSION >= 2 || UNKNOWN\nint v2;\n#endif\nint v1;\n",
    );
    assert_eq!(text(&out), "int v1 ;");
}

#[test]
fn test_nested_inactive_groups_stay_inactive() {
    let mut pp = Preprocessor::new();
    let out = run(
        &mut pp,
        "#ifdef NOPE\n#ifdef ALSO_NOPE\n#else\nint a;\n#endif\n#error hidden\n#endif\nint b;\n",
    );
    assert_eq!(text(&out), "int b ;");
    assert!(out.diagnostics.is_empty());
}

#[test]
fn test_undef() {
    let mut pp = Preprocessor::new();
    let out = run(&mut pp, "#define X 1\n#undef X\n#ifdef X\nint x;\n#endif\n");
    assert_eq!(text(&out), "");
    assert!(!pp.is_defined("X"));
}

#[test]
fn test_unbalanced_conditionals() {
    let mut pp = Preprocessor::new();
    let out = run(&mut pp, "#endif\n#ifdef A\n#else\n#else\n");
    let codes: Vec<ErrorCode> = out.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(
        codes,
        vec![ErrorCode::E1002, ErrorCode::E1002, ErrorCode::E1002]
    );
    assert_eq!(out.diagnostics[0].message, "#endif without #if");
    assert_eq!(out.diagnostics[1].message, "duplicate #else");
    assert_eq!(
        out.diagnostics[2].message,
        "unterminated conditional directive"
    );
}

#[test]
fn test_error_directive() {
    let mut pp = Preprocessor::new();
    let out = run(&mut pp, "#ifndef NNG_SHARED_LIB\n#error  need   shared lib\n#endif\n");
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].code, ErrorCode::E1003);
    assert_eq!(out.diagnostics[0].message, "#error need shared lib");
}

#[test]
fn test_invalid_condition_is_false() {
    let mut pp = Preprocessor::new();
    let out = run(&mut pp, "#if 1 +\nint a;\n#endif\n");
    assert_eq!(text(&out), "");
    assert_eq!(out.diagnostics[0].code, ErrorCode::E1001);
}

#[test]
fn test_macro_values() {
    let mut pp = Preprocessor::new();
    let out = run(
        &mut pp,
        "#define NNG_MAXADDRLEN (128)\n\
         #define NNG_DURATION_INFINITE (-1)\n\
         #define NNG_OPT_SOCKNAME \"socket\" \"-name\"\n\
         #define NNG_TWICE (NNG_MAXADDRLEN * 2)\n\
         #define NNG_NNG_H\n",
    );
    let values: Vec<(&str, &MacroValue)> = out
        .macros
        .iter()
        .map(|(_, m)| (m.name.as_str(), &m.value))
        .collect();
    assert_eq!(
        values,
        vec![
            ("NNG_MAXADDRLEN", &MacroValue::Int(128)),
            ("NNG_DURATION_INFINITE", &MacroValue::Int(-1)),
            ("NNG_OPT_SOCKNAME", &MacroValue::Str("socket-name".into())),
            ("NNG_TWICE", &MacroValue::Int(256)),
            ("NNG_NNG_H", &MacroValue::Other),
        ]
    );
    assert_eq!(out.macros[3].1.body, "(NNG_MAXADDRLEN * 2)");
}

#[test]
fn test_macro_values_resolve_forward_references() {
    let mut pp = Preprocessor::new();
    let out = run(
        &mut pp,
        "#define NNG_OPT_A NNG_OPT_B\n\
         #define NNG_FLAG_ALL (NNG_FLAG_ALLOC | NNG_FLAG_NONBLOCK)\n\
         #define NNG_OPT_B \"b\"\n\
         #define NNG_FLAG_ALLOC 1\n\
         #define NNG_FLAG_NONBLOCK 2\n",
    );
    let values: Vec<&MacroValue> = out.macros.iter().map(|(_, m)| &m.value).collect();
    assert_eq!(
        values,
        vec![
            &MacroValue::Str("b".into()),
            &MacroValue::Int(3),
            &MacroValue::Str("b".into()),
            &MacroValue::Int(1),
            &MacroValue::Int(2),
        ]
    );
}

#[test]
fn test_macro_value_uses_table_at_call_time() {
    let mut pp = Preprocessor::new();
    let out = run(&mut pp, "#define NNG_LIMIT NNG_MAX\n");
    let decl = &out.macros[0].1;
    assert_eq!(decl.value, MacroValue::Other);

    pp.define("NNG_MAX", Some("64"));
    assert_eq!(pp.macro_value(decl), MacroValue::Int(64));
}

#[test]
fn test_macro_positions_interleave_with_tokens() {
    let mut pp = Preprocessor::new();
    let out = run(&mut pp, "int a;\n#define B 2\nint c;\n");
    assert_eq!(out.macros.len(), 1);
    assert_eq!(out.macros[0].0, 3);
}

#[test]
fn test_doc_comments_attach_to_next_code_line() {
    let mut pp = Preprocessor::new();
    let out = run(
        &mut pp,
        "// Closes the socket.\n// Idempotent.\nint nng_close(int);\n\
         // orphan\n\nint nng_fini(void); // trailing\nint x;\n",
    );
    assert_eq!(
        out.docs.get(&0).map(String::as_str),
        Some("Closes the socket.\nIdempotent.")
    );
    // `nng_fini` starts at token 6; the orphan comment was separated by a blank line.
    assert_eq!(out.docs.get(&6), None);
    assert_eq!(out.docs.get(&12), None);
}
