//! C lexer built on logos.
//!
//! Produces a flat token list that keeps newlines (directives are
//! line-oriented) and comments (the parser attaches a leading comment to
//! the declaration that follows it). Line continuations are dropped.

use std::fmt;

use logos::Logos;
use rebind_diagnostic::{Diagnostic, ErrorCode};
use rebind_ir::Span;

/// Raw token from logos.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f\v]+")]
enum RawToken {
    #[regex(r"\\\r?\n")]
    LineContinuation,

    #[token("\n")]
    Newline,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    /// Produced by `block_comment` when no `*/` follows.
    UnterminatedComment,

    #[regex(r"0[xX][0-9a-fA-F]+[uUlL]*")]
    HexInt,

    #[regex(r"[0-9]+[uUlL]*")]
    DecInt,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?[fFlL]?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[fFlL]?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[fFlL]?")]
    Float,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[regex(r#""([^"\\\n]|\\.)*"#)]
    UnterminatedStr,

    #[regex(r"'([^'\\\n]|\\.)+'")]
    Char,

    #[regex(r"'([^'\\\n]|\\.)*")]
    UnterminatedChar,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[token("...")]
    Ellipsis,
    #[token("->")]
    Arrow,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("##")]
    HashHash,
    #[token("#")]
    Hash,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token("*")]
    Star,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("=")]
    Eq,
    #[token(".")]
    Dot,

    // Assignment and increment operators never matter in declarations.
    #[regex(r"\+=|-=|\*=|/=|%=|&=|\|=|\^=|<<=|>>=|\+\+|--")]
    OtherOp,
}

/// Consume through the closing `*/`, or to end of input.
fn block_comment(lex: &mut logos::Lexer<'_, RawToken>) -> RawToken {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            RawToken::BlockComment
        }
        None => {
            lex.bump(lex.remainder().len());
            RawToken::UnterminatedComment
        }
    }
}

/// Punctuators that appear in declarations and constant expressions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Punct {
    Ellipsis,
    Arrow,
    Shl,
    Shr,
    Le,
    Ge,
    EqEq,
    Ne,
    AndAnd,
    OrOr,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Star,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Plus,
    Minus,
    Slash,
    Percent,
    Lt,
    Gt,
    Question,
    Colon,
    Eq,
    Dot,
}

impl Punct {
    pub fn as_str(self) -> &'static str {
        match self {
            Punct::Ellipsis => "...",
            Punct::Arrow => "->",
            Punct::Shl => "<<",
            Punct::Shr => ">>",
            Punct::Le => "<=",
            Punct::Ge => ">=",
            Punct::EqEq => "==",
            Punct::Ne => "!=",
            Punct::AndAnd => "&&",
            Punct::OrOr => "||",
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::Semi => ";",
            Punct::Comma => ",",
            Punct::Star => "*",
            Punct::Amp => "&",
            Punct::Pipe => "|",
            Punct::Caret => "^",
            Punct::Tilde => "~",
            Punct::Bang => "!",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::Lt => "<",
            Punct::Gt => ">",
            Punct::Question => "?",
            Punct::Colon => ":",
            Punct::Eq => "=",
            Punct::Dot => ".",
        }
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TokenKind {
    Ident(String),
    /// Integer literal with suffixes stripped.
    Int(u128),
    /// Floating literal, kept as written.
    Float(String),
    /// String literal with escapes resolved.
    Str(String),
    Char(u32),
    Punct(Punct),
    Hash,
    HashHash,
    /// Operators that only occur in statements (`+=`, `++`, ...).
    Other(String),
    Newline,
    /// Comment text without delimiters.
    Comment(String),
}

impl TokenKind {
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Comment(_))
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => f.write_str(name),
            TokenKind::Int(v) => write!(f, "{v}"),
            TokenKind::Float(text) | TokenKind::Other(text) => f.write_str(text),
            TokenKind::Str(s) => write!(f, "{s:?}"),
            TokenKind::Char(c) => match char::from_u32(*c) {
                Some(ch) => write!(f, "{ch:?}"),
                None => write!(f, "'\\x{c:x}'"),
            },
            TokenKind::Punct(p) => f.write_str(p.as_str()),
            TokenKind::Hash => f.write_str("#"),
            TokenKind::HashHash => f.write_str("##"),
            TokenKind::Newline => f.write_str("newline"),
            TokenKind::Comment(_) => f.write_str("comment"),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.ident() == Some(name)
    }
}

/// Lexed tokens plus any lexical errors.
#[derive(Clone, Debug, Default)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub errors: Vec<Diagnostic>,
}

/// Lex a whole header file.
pub fn lex(source: &str) -> LexOutput {
    let mut out = LexOutput::default();
    let mut logos = RawToken::lexer(source);

    while let Some(result) = logos.next() {
        let span = Span::from_range(logos.span());
        let slice = logos.slice();

        let kind = match result {
            Ok(raw) => match convert(raw, slice) {
                Converted::Token(kind) => kind,
                Converted::Skip => continue,
                Converted::Error(code, message) => {
                    out.errors.push(
                        Diagnostic::error(code)
                            .with_message(message)
                            .with_label(span, "here"),
                    );
                    continue;
                }
            },
            Err(()) => {
                out.errors.push(
                    Diagnostic::error(ErrorCode::E0002)
                        .with_message(format!("invalid character `{}`", slice.escape_debug()))
                        .with_label(span, "not valid in a C header"),
                );
                continue;
            }
        };
        out.tokens.push(Token::new(kind, span));
    }

    out
}

/// Lex a fragment that must not contain errors (command-line defines,
/// configured type names).
pub fn lex_fragment(source: &str) -> Option<Vec<Token>> {
    let out = lex(source);
    if out.errors.is_empty() {
        Some(
            out.tokens
                .into_iter()
                .filter(|t| !t.kind.is_trivia())
                .collect(),
        )
    } else {
        None
    }
}

enum Converted {
    Token(TokenKind),
    Skip,
    Error(ErrorCode, String),
}

fn convert(raw: RawToken, slice: &str) -> Converted {
    let kind = match raw {
        RawToken::LineContinuation => return Converted::Skip,
        RawToken::Newline => TokenKind::Newline,
        RawToken::LineComment => TokenKind::Comment(slice[2..].trim().to_string()),
        RawToken::BlockComment => TokenKind::Comment(block_comment_text(slice)),
        RawToken::UnterminatedComment => {
            return Converted::Error(ErrorCode::E0001, "unterminated block comment".into())
        }
        RawToken::HexInt => {
            let digits = slice[2..].trim_end_matches(['u', 'U', 'l', 'L']);
            match u128::from_str_radix(digits, 16) {
                Ok(v) => TokenKind::Int(v),
                Err(_) => return out_of_range(slice),
            }
        }
        RawToken::DecInt => {
            let digits = slice.trim_end_matches(['u', 'U', 'l', 'L']);
            let parsed = if digits.len() > 1 && digits.starts_with('0') {
                u128::from_str_radix(&digits[1..], 8)
            } else {
                digits.parse::<u128>()
            };
            match parsed {
                Ok(v) => TokenKind::Int(v),
                Err(_) => return out_of_range(slice),
            }
        }
        RawToken::Float => TokenKind::Float(slice.to_string()),
        RawToken::Str => TokenKind::Str(unescape(&slice[1..slice.len() - 1])),
        RawToken::UnterminatedStr => {
            return Converted::Error(ErrorCode::E0001, "unterminated string literal".into())
        }
        RawToken::Char => {
            let text = unescape(&slice[1..slice.len() - 1]);
            TokenKind::Char(text.chars().next().map_or(0, u32::from))
        }
        RawToken::UnterminatedChar => {
            return Converted::Error(ErrorCode::E0001, "unterminated character literal".into())
        }
        RawToken::Ident => TokenKind::Ident(slice.to_string()),
        RawToken::Hash => TokenKind::Hash,
        RawToken::HashHash => TokenKind::HashHash,
        RawToken::OtherOp => TokenKind::Other(slice.to_string()),
        RawToken::Ellipsis => TokenKind::Punct(Punct::Ellipsis),
        RawToken::Arrow => TokenKind::Punct(Punct::Arrow),
        RawToken::Shl => TokenKind::Punct(Punct::Shl),
        RawToken::Shr => TokenKind::Punct(Punct::Shr),
        RawToken::Le => TokenKind::Punct(Punct::Le),
        RawToken::Ge => TokenKind::Punct(Punct::Ge),
        RawToken::EqEq => TokenKind::Punct(Punct::EqEq),
        RawToken::Ne => TokenKind::Punct(Punct::Ne),
        RawToken::AndAnd => TokenKind::Punct(Punct::AndAnd),
        RawToken::OrOr => TokenKind::Punct(Punct::OrOr),
        RawToken::LParen => TokenKind::Punct(Punct::LParen),
        RawToken::RParen => TokenKind::Punct(Punct::RParen),
        RawToken::LBrace => TokenKind::Punct(Punct::LBrace),
        RawToken::RBrace => TokenKind::Punct(Punct::RBrace),
        RawToken::LBracket => TokenKind::Punct(Punct::LBracket),
        RawToken::RBracket => TokenKind::Punct(Punct::RBracket),
        RawToken::Semi => TokenKind::Punct(Punct::Semi),
        RawToken::Comma => TokenKind::Punct(Punct::Comma),
        RawToken::Star => TokenKind::Punct(Punct::Star),
        RawToken::Amp => TokenKind::Punct(Punct::Amp),
        RawToken::Pipe => TokenKind::Punct(Punct::Pipe),
        RawToken::Caret => TokenKind::Punct(Punct::Caret),
        RawToken::Tilde => TokenKind::Punct(Punct::Tilde),
        RawToken::Bang => TokenKind::Punct(Punct::Bang),
        RawToken::Plus => TokenKind::Punct(Punct::Plus),
        RawToken::Minus => TokenKind::Punct(Punct::Minus),
        RawToken::Slash => TokenKind::Punct(Punct::Slash),
        RawToken::Percent => TokenKind::Punct(Punct::Percent),
        RawToken::Lt => TokenKind::Punct(Punct::Lt),
        RawToken::Gt => TokenKind::Punct(Punct::Gt),
        RawToken::Question => TokenKind::Punct(Punct::Question),
        RawToken::Colon => TokenKind::Punct(Punct::Colon),
        RawToken::Eq => TokenKind::Punct(Punct::Eq),
        RawToken::Dot => TokenKind::Punct(Punct::Dot),
    };
    Converted::Token(kind)
}

fn out_of_range(slice: &str) -> Converted {
    Converted::Error(
        ErrorCode::E0002,
        format!("integer literal `{slice}` is out of range"),
    )
}

/// Strip `/* */` and the leading `*` gutter of each line.
fn block_comment_text(slice: &str) -> String {
    let inner = &slice[2..slice.len() - 2];
    inner
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('*').map_or(line, str::trim_start)
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve C escape sequences. Unknown escapes are kept verbatim.
fn unescape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('a') => result.push('\x07'),
            Some('b') => result.push('\x08'),
            Some('f') => result.push('\x0c'),
            Some('v') => result.push('\x0b'),
            Some('\\') => result.push('\\'),
            Some('\'') => result.push('\''),
            Some('"') => result.push('"'),
            Some('?') => result.push('?'),
            Some('x') => {
                let mut value = 0u32;
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(16)) {
                    value = value.wrapping_mul(16).wrapping_add(d);
                    chars.next();
                }
                result.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                result.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

#[cfg(test)]
mod tests;
