use pretty_assertions::assert_eq;

use super::*;

fn kinds(source: &str) -> Vec<TokenKind> {
    let out = lex(source);
    assert!(out.errors.is_empty(), "unexpected errors: {:?}", out.errors);
    out.tokens.into_iter().map(|t| t.kind).collect()
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Ident(name.to_string())
}

#[test]
fn test_lex_prototype() {
    assert_eq!(
        kinds("int nng_close(nng_socket);"),
        vec![
            ident("int"),
            ident("nng_close"),
            TokenKind::Punct(Punct::LParen),
            ident("nng_socket"),
            TokenKind::Punct(Punct::RParen),
            TokenKind::Punct(Punct::Semi),
        ]
    );
}

#[test]
fn test_lex_directive_keeps_newlines() {
    assert_eq!(
        kinds("#define NNG_MAXADDRLEN (128)\n"),
        vec![
            TokenKind::Hash,
            ident("define"),
            ident("NNG_MAXADDRLEN"),
            TokenKind::Punct(Punct::LParen),
            TokenKind::Int(128),
            TokenKind::Punct(Punct::RParen),
            TokenKind::Newline,
        ]
    );
}

#[test]
fn test_lex_line_continuation_is_dropped() {
    assert_eq!(
        kinds("#define A \\\n  1"),
        vec![TokenKind::Hash, ident("define"), ident("A"), TokenKind::Int(1)]
    );
}

#[test]
fn test_lex_integer_forms() {
    assert_eq!(
        kinds("0x1Fu 010 42UL 0"),
        vec![
            TokenKind::Int(31),
            TokenKind::Int(8),
            TokenKind::Int(42),
            TokenKind::Int(0),
        ]
    );
}

#[test]
fn test_lex_string_escapes() {
    assert_eq!(
        kinds(r#""tcp\tnodelay\x41\101""#),
        vec![TokenKind::Str("tcp\tnodelayAA".to_string())]
    );
}

#[test]
fn test_lex_char_literal() {
    assert_eq!(
        kinds(r"'\n' 'a'"),
        vec![TokenKind::Char(10), TokenKind::Char(97)]
    );
}

#[test]
fn test_lex_comments() {
    assert_eq!(
        kinds("/**\n * Close a socket.\n */\n// trailing"),
        vec![
            TokenKind::Comment("Close a socket.".to_string()),
            TokenKind::Newline,
            TokenKind::Comment("trailing".to_string()),
        ]
    );
}

#[test]
fn test_lex_block_comments_inline() {
    assert_eq!(
        kinds("/* x */ int a; /* a * b **/\n/** doc */"),
        vec![
            TokenKind::Comment("x".to_string()),
            ident("int"),
            ident("a"),
            TokenKind::Punct(Punct::Semi),
            TokenKind::Comment("a * b *".to_string()),
            TokenKind::Newline,
            TokenKind::Comment("doc".to_string()),
        ]
    );
}

#[test]
fn test_lex_unterminated_block_comment() {
    let out = lex("int a; /* open\n int b;");
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].code, ErrorCode::E0001);
    assert_eq!(out.errors[0].primary_span(), Some(Span::new(7, 22)));
    assert_eq!(out.tokens.len(), 3);
}

#[test]
fn test_lex_ellipsis_and_operators() {
    assert_eq!(
        kinds("(...) << >= ++"),
        vec![
            TokenKind::Punct(Punct::LParen),
            TokenKind::Punct(Punct::Ellipsis),
            TokenKind::Punct(Punct::RParen),
            TokenKind::Punct(Punct::Shl),
            TokenKind::Punct(Punct::Ge),
            TokenKind::Other("++".to_string()),
        ]
    );
}

#[test]
fn test_lex_unterminated_string() {
    let out = lex("const char *s = \"abc\n");
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].code, ErrorCode::E0001);
}

#[test]
fn test_lex_invalid_character() {
    let out = lex("int @x;");
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].code, ErrorCode::E0002);
    assert_eq!(out.errors[0].primary_span(), Some(Span::new(4, 5)));
    // Lexing continues past the bad character.
    assert_eq!(out.tokens.len(), 3);
}

#[test]
fn test_lex_fragment() {
    let tokens = lex_fragment("const char *").map(|ts| ts.len());
    assert_eq!(tokens, Some(3));
    assert_eq!(lex_fragment("\"open"), None);
}

#[test]
fn test_token_display() {
    assert_eq!(TokenKind::Punct(Punct::Shr).to_string(), ">>");
    assert_eq!(TokenKind::Str("a\"b".into()).to_string(), r#""a\"b""#);
    assert_eq!(ident("nng_dial").to_string(), "nng_dial");
}
