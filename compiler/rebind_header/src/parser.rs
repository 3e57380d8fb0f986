//! Recursive-descent parser for C declarations.
//!
//! Works on preprocessed tokens and understands exactly what a library
//! header needs: function prototypes, struct/union/enum definitions and
//! forward declarations, and typedefs (including function-pointer and
//! function-type typedefs). Anything else is reported as an unsupported
//! declaration (a warning) and skipped up to the next `;`.
//!
//! Anonymous struct and union members get synthesized names
//! (`<outer>_<member>`) so they can be emitted as ordinary types.
//! Bit-fields are lowered to byte storage by [`crate::layout`].

use rebind_diagnostic::{unexpected_token, Diagnostic, ErrorCode};
use rebind_ir::ast::{
    Aggregate, EnumDecl, EnumItem, Field, FunctionDecl, Item, Origin, Param, StructDecl,
    TypedefDecl,
};
use rebind_ir::{CType, FileId, IntKind, Span};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::eval::eval;
use crate::layout::{Layouts, Member};
use crate::lexer::{lex_fragment, Punct, Token, TokenKind};
use crate::preprocess::Preprocessed;

#[derive(Clone, Debug)]
enum ParseError {
    Unexpected {
        span: Span,
        expected: &'static str,
        found: String,
    },
    Unsupported {
        span: Span,
        what: String,
    },
    Invalid {
        span: Span,
        message: String,
    },
}

impl ParseError {
    fn into_diagnostic(self) -> Diagnostic {
        match self {
            ParseError::Unexpected {
                span,
                expected,
                found,
            } => unexpected_token(span, expected, &found),
            ParseError::Unsupported { span, what } => unsupported(span, &what),
            ParseError::Invalid { span, message } => Diagnostic::error(ErrorCode::E1001)
                .with_message(message)
                .with_label(span, "here"),
        }
    }
}

fn unsupported(span: Span, what: &str) -> Diagnostic {
    Diagnostic::warning(ErrorCode::E1004)
        .with_message(format!("unsupported declaration: {what}"))
        .with_label(span, "skipped")
}

type PResult<T> = Result<T, ParseError>;

/// Words that qualify or decorate a declaration without changing its type.
fn is_ignored_word(word: &str) -> bool {
    matches!(
        word,
        "extern"
            | "static"
            | "inline"
            | "__inline"
            | "__inline__"
            | "volatile"
            | "__volatile__"
            | "register"
            | "auto"
            | "restrict"
            | "__restrict"
            | "__restrict__"
            | "__extension__"
            | "_Noreturn"
            | "__cdecl"
            | "__stdcall"
    )
}

/// Words followed by a parenthesized argument list to skip.
fn is_attribute_word(word: &str) -> bool {
    matches!(
        word,
        "__attribute__" | "__attribute" | "__declspec" | "__asm__" | "__asm" | "asm" | "_Alignas"
    )
}

/// Builtin type keywords seen in one specifier list.
#[derive(Default)]
struct Builtin {
    void: bool,
    boolean: bool,
    char: bool,
    short: bool,
    int: bool,
    long: u8,
    signed: bool,
    unsigned: bool,
    float: bool,
    double: bool,
}

impl Builtin {
    /// Record `word`; returns false if it is not a type keyword.
    fn add(&mut self, word: &str) -> bool {
        match word {
            "void" => self.void = true,
            "_Bool" | "bool" => self.boolean = true,
            "char" => self.char = true,
            "short" => self.short = true,
            "int" => self.int = true,
            "long" => self.long += 1,
            "signed" | "__signed__" => self.signed = true,
            "unsigned" => self.unsigned = true,
            "float" => self.float = true,
            "double" => self.double = true,
            _ => return false,
        }
        true
    }

    fn any(&self) -> bool {
        self.void
            || self.boolean
            || self.char
            || self.short
            || self.int
            || self.long > 0
            || self.signed
            || self.unsigned
            || self.float
            || self.double
    }

    fn resolve(&self) -> CType {
        let pick = |signed: IntKind, unsigned: IntKind| {
            CType::Int(if self.unsigned { unsigned } else { signed })
        };
        if self.void {
            CType::Void
        } else if self.boolean {
            CType::Bool
        } else if self.float {
            CType::Float
        } else if self.double {
            if self.long > 0 {
                CType::LongDouble
            } else {
                CType::Double
            }
        } else if self.char {
            if self.unsigned {
                CType::Int(IntKind::UChar)
            } else if self.signed {
                CType::Int(IntKind::SChar)
            } else {
                CType::Int(IntKind::Char)
            }
        } else if self.short {
            pick(IntKind::Short, IntKind::UShort)
        } else if self.long >= 2 {
            pick(IntKind::LongLong, IntKind::ULongLong)
        } else if self.long == 1 {
            pick(IntKind::Long, IntKind::ULong)
        } else {
            pick(IntKind::Int, IntKind::UInt)
        }
    }
}

/// A struct, union or enum body defined inside a specifier list.
enum Defined {
    Aggregate {
        aggregate: Aggregate,
        tag: Option<String>,
        fields: Option<Vec<Field>>,
        span: Span,
    },
    Enum {
        tag: Option<String>,
        items: Vec<EnumItem>,
        span: Span,
    },
}

impl Defined {
    fn tag(&self) -> Option<&str> {
        match self {
            Defined::Aggregate { tag, .. } | Defined::Enum { tag, .. } => tag.as_deref(),
        }
    }
}

struct Specifiers {
    ty: CType,
    is_const: bool,
    is_typedef: bool,
    defined: Option<Defined>,
    /// `struct tag` mentioned without a body.
    forward: Option<(Aggregate, String, Span)>,
}

#[derive(Clone, Debug)]
enum Op {
    Pointer { is_const: bool },
    Array(Option<u64>),
    Function { params: Vec<Param>, variadic: bool },
}

struct Declarator {
    name: Option<(String, Span)>,
    /// Type constructors, applied to the base type in order.
    ops: Vec<Op>,
}

#[derive(Clone, Debug)]
enum Shape {
    Object(CType),
    Function {
        ret: CType,
        params: Vec<Param>,
        variadic: bool,
    },
}

fn apply(base: Shape, base_const: bool, ops: Vec<Op>, span: Span) -> PResult<Shape> {
    let mut shape = base;
    let mut is_const = base_const;
    for op in ops {
        shape = match (op, shape) {
            (Op::Pointer { is_const: self_const }, Shape::Object(ty)) => {
                let ptr = CType::pointer_to(ty, is_const);
                is_const = self_const;
                Shape::Object(ptr)
            }
            (
                Op::Pointer { is_const: self_const },
                Shape::Function {
                    ret,
                    params,
                    variadic,
                },
            ) => {
                is_const = self_const;
                Shape::Object(CType::FunctionPointer {
                    ret: Box::new(ret),
                    params: params.into_iter().map(|p| p.ty).collect(),
                    variadic,
                })
            }
            (Op::Array(len), Shape::Object(ty)) => {
                is_const = false;
                Shape::Object(CType::Array {
                    elem: Box::new(ty),
                    len,
                })
            }
            (Op::Function { params, variadic }, Shape::Object(ret)) => {
                is_const = false;
                Shape::Function {
                    ret,
                    params,
                    variadic,
                }
            }
            (Op::Array(_), Shape::Function { .. }) => {
                return Err(ParseError::Invalid {
                    span,
                    message: "array of functions".into(),
                })
            }
            (Op::Function { .. }, Shape::Function { .. }) => {
                return Err(ParseError::Invalid {
                    span,
                    message: "function returning a function".into(),
                })
            }
        };
    }
    Ok(shape)
}

/// Give an anonymous aggregate the name of its first declarator.
fn retag(ty: CType, name: &str) -> CType {
    match ty {
        CType::Struct(tag) if tag.is_empty() => CType::Struct(name.to_string()),
        CType::Union(tag) if tag.is_empty() => CType::Union(name.to_string()),
        CType::Enum(tag) if tag.is_empty() => CType::Enum(name.to_string()),
        other => other,
    }
}

fn typedef_name_type(name: String) -> CType {
    match IntKind::from_typedef_name(&name) {
        Some(kind) => CType::Int(kind),
        None => CType::Named(name),
    }
}

/// What earlier declarations of a run tell later ones.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scope {
    /// Enumerator values.
    constants: FxHashMap<String, i128>,
    /// Typedefs naming a function type, as in `typedef void cb(void *);`.
    functions: FxHashMap<String, Shape>,
    layouts: Layouts,
    /// Anonymous members of anonymous aggregates named so far.
    anonymous: usize,
}

pub(crate) struct Parser<'a> {
    file: FileId,
    tokens: &'a [Token],
    pos: usize,
    docs: &'a FxHashMap<usize, String>,
    scope: &'a mut Scope,
    items: Vec<Item>,
    diagnostics: Vec<Diagnostic>,
}

/// Parse one preprocessed file into items, in declaration order.
///
/// Object-like macros are interleaved at the position they were defined.
pub(crate) fn parse_file(
    file: FileId,
    pre: &Preprocessed,
    scope: &mut Scope,
) -> (Vec<Item>, Vec<Diagnostic>) {
    let mut parser = Parser::new(file, &pre.tokens, &pre.docs, scope);
    let mut macros = pre.macros.iter().peekable();
    let mut extern_blocks = 0usize;

    loop {
        while let Some((_, decl)) = macros.next_if(|(at, _)| *at <= parser.pos) {
            parser.items.push(Item::Macro(decl.clone()));
        }
        if parser.at_end() {
            break;
        }
        if parser.eat_punct(Punct::Semi) {
            continue;
        }
        // extern "C" { ... }
        if parser.at_ident("extern") && matches!(parser.nth_kind(1), Some(TokenKind::Str(_))) {
            parser.pos += 2;
            if parser.eat_punct(Punct::LBrace) {
                extern_blocks += 1;
            }
            continue;
        }
        if parser.at_punct(Punct::RBrace) {
            let span = parser.peek_span();
            parser.pos += 1;
            if extern_blocks > 0 {
                extern_blocks -= 1;
            } else {
                parser
                    .diagnostics
                    .push(unexpected_token(span, "declaration", "}"));
            }
            continue;
        }

        let start = parser.pos;
        if let Err(err) = parser.declaration() {
            parser.diagnostics.push(err.into_diagnostic());
            parser.pos = start;
            parser.recover();
            // Always make progress.
            if parser.pos == start {
                parser.pos += 1;
            }
        }
    }

    (parser.items, parser.diagnostics)
}

/// Parse a C type name such as `char*` or `unsigned long long`.
pub fn parse_type_name(text: &str) -> Option<CType> {
    let tokens = lex_fragment(text)?;
    let docs = FxHashMap::default();
    let mut scope = Scope::default();
    let mut parser = Parser::new(FileId(0), &tokens, &docs, &mut scope);

    let spec = parser.specifiers().ok()?;
    if spec.defined.is_some() || spec.is_typedef {
        return None;
    }
    let decl = parser.declarator().ok()?;
    if decl.name.is_some() || !parser.at_end() {
        return None;
    }
    match apply(Shape::Object(spec.ty), spec.is_const, decl.ops, Span::DUMMY).ok()? {
        Shape::Object(ty) => Some(ty),
        Shape::Function { .. } => None,
    }
}

impl<'a> Parser<'a> {
    fn new(
        file: FileId,
        tokens: &'a [Token],
        docs: &'a FxHashMap<usize, String>,
        scope: &'a mut Scope,
    ) -> Self {
        Parser {
            file,
            tokens,
            pos: 0,
            docs,
            scope,
            items: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    // === Cursor ===

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn nth_kind(&self, n: usize) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos + n).map(|t| &t.kind)
    }

    fn peek_ident(&self) -> Option<&'a str> {
        self.peek().and_then(Token::ident)
    }

    fn peek_span(&self) -> Span {
        match self.peek() {
            Some(token) => token.span,
            None => self
                .tokens
                .last()
                .map_or(Span::DUMMY, |t| Span::point(t.span.end)),
        }
    }

    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(Span::DUMMY, |t| t.span)
    }

    fn found(&self) -> String {
        self.peek()
            .map_or_else(|| "end of file".to_string(), |t| t.kind.to_string())
    }

    fn at_punct(&self, punct: Punct) -> bool {
        self.peek().is_some_and(|t| t.is_punct(punct))
    }

    fn at_ident(&self, name: &str) -> bool {
        self.peek().is_some_and(|t| t.is_ident(name))
    }

    fn eat_punct(&mut self, punct: Punct) -> bool {
        if self.at_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: Punct, expected: &'static str) -> PResult<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> PResult<(String, Span)> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(name),
                span,
            }) => {
                self.pos += 1;
                Ok((name.clone(), *span))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::Unexpected {
            span: self.peek_span(),
            expected,
            found: self.found(),
        }
    }

    /// Skip tokens through the matching close of the bracket at the cursor.
    fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            self.pos += 1;
            match token.kind {
                TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// Skip `__attribute__((...))` and friends at the cursor.
    fn skip_attributes(&mut self) {
        while self.peek_ident().is_some_and(is_attribute_word) {
            self.pos += 1;
            if self.at_punct(Punct::LParen) {
                self.skip_balanced();
            }
        }
    }

    /// Skip to just past the next `;` outside braces, or past a closing
    /// `}` that returns to depth 0. Stops before a `}` that closes an
    /// enclosing block.
    fn recover(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Punct(Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RBrace) => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        self.eat_punct(Punct::Semi);
                        return;
                    }
                }
                TokenKind::Punct(Punct::Semi) if depth == 0 => {
                    self.pos += 1;
                    return;
                }
                _ => {}
            }
            self.pos += 1;
        }
    }

    /// Tokens of an expression ending (exclusive) at a depth-0 `stop`.
    fn expr_tokens(&mut self, stops: &[Punct]) -> &'a [Token] {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if let TokenKind::Punct(p) = token.kind {
                if depth == 0 && stops.contains(&p) {
                    break;
                }
                match p {
                    Punct::LParen | Punct::LBracket | Punct::LBrace => depth += 1,
                    Punct::RParen | Punct::RBracket | Punct::RBrace => {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                    }
                    _ => {}
                }
            }
            self.pos += 1;
        }
        let tokens = self.tokens;
        &tokens[start..self.pos]
    }

    fn eval_constant(&mut self, stops: &[Punct], what: &str) -> PResult<i128> {
        let span = self.peek_span();
        let tokens = self.expr_tokens(stops);
        let constants = &self.scope.constants;
        eval(tokens, |name| constants.get(name).copied()).map_err(|err| ParseError::Invalid {
            span: tokens
                .first()
                .zip(tokens.last())
                .map_or(span, |(a, b)| a.span.merge(b.span)),
            message: format!("{what} is not an integer constant: {err}"),
        })
    }

    fn origin(&self, start: Span) -> Origin {
        Origin::new(self.file, start.merge(self.prev_span()))
    }

    /// Apply declarator `ops` to a specifier type. A function-type
    /// typedef name starts out as that function type, so `cb *` is a
    /// function pointer and `cb f;` declares a function.
    fn shape(&self, base: CType, is_const: bool, ops: Vec<Op>, span: Span) -> PResult<Shape> {
        let function = match &base {
            CType::Named(name) => self.scope.functions.get(name).cloned(),
            _ => None,
        };
        apply(function.unwrap_or(Shape::Object(base)), is_const, ops, span)
    }

    // === Declarations ===

    fn declaration(&mut self) -> PResult<()> {
        let start_index = self.pos;
        let start = self.peek_span();
        let mut doc = self.docs.get(&start_index).cloned();
        let spec = self.specifiers()?;

        if self.eat_punct(Punct::Semi) {
            return self.bare_specifiers(spec, start);
        }

        let mut defined = spec.defined;
        let mut forward = spec.forward;
        loop {
            let decl = self.declarator()?;
            self.skip_attributes();
            let Some((name, _)) = decl.name else {
                return Err(self.unexpected("declarator name"));
            };

            let mut base = spec.ty.clone();
            if let Some(def) = defined.take() {
                match def.tag().map(str::to_string) {
                    Some(tag) => self.emit_defined(def, tag),
                    None if spec.is_typedef => {
                        base = retag(base, &name);
                        self.emit_defined(def, name.clone());
                    }
                    None => {
                        if let Defined::Enum { .. } = def {
                            self.emit_defined(def, String::new());
                        }
                    }
                }
            }
            if spec.is_typedef {
                if let Some((aggregate, tag, span)) = forward.take() {
                    self.emit_forward(aggregate, tag, span);
                }
            }

            let decl_span = start.merge(self.prev_span());
            let shape = self.shape(base, spec.is_const, decl.ops, decl_span)?;

            if spec.is_typedef {
                match shape {
                    Shape::Object(ty) => {
                        trace!(name = %name, ty = %ty, "typedef");
                        if let Some(layout) = self.scope.layouts.of(&ty) {
                            self.scope.layouts.record(CType::Named(name.clone()), layout);
                        }
                        let origin = self.origin(start);
                        self.items.push(Item::Typedef(TypedefDecl { name, ty, origin }));
                    }
                    function @ Shape::Function { .. } => {
                        trace!(name = %name, "function type typedef");
                        self.scope.functions.insert(name, function);
                    }
                }
            } else {
                match shape {
                    Shape::Function {
                        ret,
                        params,
                        variadic,
                    } => {
                        if self.at_punct(Punct::LBrace) {
                            self.skip_balanced();
                            self.diagnostics.push(unsupported(
                                decl_span,
                                &format!("definition of function `{name}`"),
                            ));
                            return Ok(());
                        }
                        let origin = self.origin(start);
                        self.items.push(Item::Function(FunctionDecl {
                            name,
                            ret,
                            params,
                            variadic,
                            doc: doc.take(),
                            origin,
                        }));
                    }
                    Shape::Object(_) => {
                        if self.eat_punct(Punct::Eq) {
                            self.expr_tokens(&[Punct::Comma, Punct::Semi]);
                        }
                        self.diagnostics
                            .push(unsupported(decl_span, &format!("variable `{name}`")));
                    }
                }
            }

            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_punct(Punct::Semi, "`;`")
    }

    /// `struct foo { ... };`, `struct foo;` or `enum { ... };`
    fn bare_specifiers(&mut self, spec: Specifiers, start: Span) -> PResult<()> {
        match (spec.defined, spec.forward) {
            (Some(def), _) => match def.tag().map(str::to_string) {
                Some(tag) => self.emit_defined(def, tag),
                None => match def {
                    Defined::Enum { .. } => self.emit_defined(def, String::new()),
                    Defined::Aggregate { .. } => {
                        return Err(ParseError::Unsupported {
                            span: start,
                            what: "anonymous struct without a declarator".into(),
                        })
                    }
                },
            },
            (None, Some((aggregate, tag, span))) => self.emit_forward(aggregate, tag, span),
            (None, None) => {
                return Err(ParseError::Unsupported {
                    span: start.merge(self.prev_span()),
                    what: "declaration declares nothing".into(),
                })
            }
        }
        Ok(())
    }

    fn emit_defined(&mut self, def: Defined, name: String) {
        match def {
            Defined::Aggregate {
                aggregate,
                fields,
                span,
                ..
            } => {
                let layout = fields
                    .as_deref()
                    .and_then(|fields| self.scope.layouts.aggregate(aggregate, fields));
                if let Some(layout) = layout.filter(|_| !name.is_empty()) {
                    let ty = match aggregate {
                        Aggregate::Struct => CType::Struct(name.clone()),
                        Aggregate::Union => CType::Union(name.clone()),
                    };
                    self.scope.layouts.record(ty, layout);
                }
                let origin = Origin::new(self.file, span);
                self.items.push(Item::Struct(StructDecl {
                    name,
                    aggregate,
                    fields,
                    origin,
                }));
            }
            Defined::Enum { items, span, .. } => {
                if !name.is_empty() {
                    self.scope
                        .layouts
                        .record_enum(&name, items.iter().map(|item| item.value));
                }
                let origin = Origin::new(self.file, span);
                self.items
                    .push(Item::Enum(EnumDecl { name, items, origin }));
            }
        }
    }

    fn emit_forward(&mut self, aggregate: Aggregate, name: String, span: Span) {
        let origin = Origin::new(self.file, span);
        self.items.push(Item::Struct(StructDecl {
            name,
            aggregate,
            fields: None,
            origin,
        }));
    }

    fn specifiers(&mut self) -> PResult<Specifiers> {
        let mut builtin = Builtin::default();
        let mut named: Option<String> = None;
        let mut tagged: Option<CType> = None;
        let mut defined = None;
        let mut forward = None;
        let mut is_const = false;
        let mut is_typedef = false;

        while let Some(word) = self.peek_ident() {
            match word {
                "typedef" => is_typedef = true,
                "const" => is_const = true,
                "struct" | "union" => {
                    let aggregate = if word == "struct" {
                        Aggregate::Struct
                    } else {
                        Aggregate::Union
                    };
                    let keyword_span = self.peek_span();
                    self.pos += 1;
                    let (ty, def) = self.aggregate_specifier(aggregate, keyword_span)?;
                    if def.is_none() {
                        if let CType::Struct(tag) | CType::Union(tag) = &ty {
                            forward = Some((aggregate, tag.clone(), keyword_span.merge(self.prev_span())));
                        }
                    }
                    tagged = Some(ty);
                    defined = def;
                    continue;
                }
                "enum" => {
                    let keyword_span = self.peek_span();
                    self.pos += 1;
                    let (ty, def) = self.enum_specifier(keyword_span)?;
                    tagged = Some(ty);
                    defined = def;
                    continue;
                }
                w if is_ignored_word(w) => {}
                w if is_attribute_word(w) => {
                    self.skip_attributes();
                    continue;
                }
                w => {
                    if !builtin.add(w) {
                        if builtin.any() || named.is_some() || tagged.is_some() {
                            break;
                        }
                        named = Some(w.to_string());
                    }
                }
            }
            self.pos += 1;
        }

        let ty = match (tagged, named) {
            (Some(ty), _) => ty,
            (None, Some(name)) => typedef_name_type(name),
            (None, None) if builtin.any() => builtin.resolve(),
            (None, None) => return Err(self.unexpected("type specifier")),
        };

        Ok(Specifiers {
            ty,
            is_const,
            is_typedef,
            defined,
            forward,
        })
    }

    fn aggregate_specifier(
        &mut self,
        aggregate: Aggregate,
        keyword_span: Span,
    ) -> PResult<(CType, Option<Defined>)> {
        self.skip_attributes();
        let tag = match self.peek_ident() {
            Some(_) => Some(self.expect_ident("tag name")?.0),
            None => None,
        };
        self.skip_attributes();

        let make = |name: String| match aggregate {
            Aggregate::Struct => CType::Struct(name),
            Aggregate::Union => CType::Union(name),
        };

        if !self.eat_punct(Punct::LBrace) {
            return match tag {
                Some(tag) => Ok((make(tag), None)),
                None => Err(self.unexpected("struct tag or `{`")),
            };
        }

        let outer = tag.clone().unwrap_or_default();
        let fields = self.fields(&outer, aggregate)?;
        self.skip_attributes();
        let def = Defined::Aggregate {
            aggregate,
            tag: tag.clone(),
            fields,
            span: keyword_span.merge(self.prev_span()),
        };
        Ok((make(tag.unwrap_or_default()), Some(def)))
    }

    /// Parse fields after `{` through the closing `}`.
    ///
    /// Anonymous nested aggregates are emitted as types of their own,
    /// named `<outer>_<member>`; a member without a declarator is called
    /// `anonN`. Returns `None` (opaque) when bit-fields follow a member
    /// whose size is unknown.
    fn fields(&mut self, outer: &str, aggregate: Aggregate) -> PResult<Option<Vec<Field>>> {
        let mut members = Vec::new();
        let mut anonymous_members = 0usize;

        while !self.eat_punct(Punct::RBrace) {
            if self.at_end() {
                return Err(self.unexpected("`}`"));
            }
            let start = self.peek_span();
            let spec = self.specifiers()?;
            let mut base = spec.ty.clone();
            let mut unnamed = None;

            if let Some(def) = spec.defined {
                match def.tag().map(str::to_string) {
                    Some(tag) => self.emit_defined(def, tag),
                    None => match def {
                        Defined::Enum { .. } => {
                            self.emit_defined(def, String::new());
                            base = CType::Int(IntKind::Int);
                        }
                        Defined::Aggregate { .. } => unnamed = Some(def),
                    },
                }
            }

            if self.eat_punct(Punct::Semi) {
                if let Some(def) = unnamed {
                    anonymous_members += 1;
                    let member = format!("anon{anonymous_members}");
                    let ty = self.name_member_type(def, base, outer, &member);
                    members.push(Member {
                        name: Some(member),
                        ty,
                        bits: None,
                    });
                }
                continue;
            }

            loop {
                let decl = self.declarator()?;
                let bits = if self.eat_punct(Punct::Colon) {
                    let width = self.eval_constant(&[Punct::Comma, Punct::Semi], "bit-field width")?;
                    let width = u64::try_from(width).map_err(|_| ParseError::Invalid {
                        span: self.prev_span(),
                        message: format!("bit-field width {width} is negative"),
                    })?;
                    Some(width)
                } else {
                    None
                };
                self.skip_attributes();
                let span = start.merge(self.prev_span());
                let name = match (decl.name, bits) {
                    (Some((name, _)), _) => Some(name),
                    (None, Some(_)) => None,
                    (None, None) => return Err(self.unexpected("field name")),
                };
                if let (Some(def), Some(member)) = (unnamed.take(), &name) {
                    base = self.name_member_type(def, base, outer, member);
                }
                match self.shape(base.clone(), spec.is_const, decl.ops, span)? {
                    Shape::Object(ty) => members.push(Member { name, ty, bits }),
                    Shape::Function { .. } => {
                        return Err(ParseError::Invalid {
                            span,
                            message: format!(
                                "field `{}` has function type",
                                name.unwrap_or_default()
                            ),
                        })
                    }
                }
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
            self.expect_punct(Punct::Semi, "`;` after field")?;
        }

        if members.iter().all(|m| m.bits.is_none()) {
            return Ok(Some(
                members
                    .into_iter()
                    .filter_map(|m| Some(Field { name: m.name?, ty: m.ty }))
                    .collect(),
            ));
        }
        let lowered = self.scope.layouts.lower_bitfields(aggregate, members);
        if lowered.is_none() {
            self.diagnostics.push(unsupported(
                self.prev_span(),
                &format!("bit-fields in `{outer}` next to a member of unknown size; emitted as opaque"),
            ));
        }
        Ok(lowered)
    }

    /// Emit an anonymous nested aggregate under a synthesized name and
    /// return the member's type.
    fn name_member_type(&mut self, def: Defined, base: CType, outer: &str, member: &str) -> CType {
        let name = if outer.is_empty() {
            self.scope.anonymous += 1;
            format!("anon{}_{member}", self.scope.anonymous)
        } else {
            format!("{outer}_{member}")
        };
        trace!(name = %name, "naming anonymous member type");
        let ty = retag(base, &name);
        self.emit_defined(def, name);
        ty
    }

    fn enum_specifier(&mut self, keyword_span: Span) -> PResult<(CType, Option<Defined>)> {
        self.skip_attributes();
        let tag = match self.peek_ident() {
            Some(_) => Some(self.expect_ident("enum tag")?.0),
            None => None,
        };
        self.skip_attributes();

        if !self.eat_punct(Punct::LBrace) {
            return match tag {
                Some(tag) => Ok((CType::Enum(tag), None)),
                None => Err(self.unexpected("enum tag or `{`")),
            };
        }

        let mut items = Vec::new();
        let mut next: i128 = 0;
        while !self.eat_punct(Punct::RBrace) {
            let (name, span) = self.expect_ident("enumerator")?;
            self.skip_attributes();
            let value = if self.eat_punct(Punct::Eq) {
                self.eval_constant(&[Punct::Comma, Punct::RBrace], "enumerator value")?
            } else {
                next
            };
            let Ok(stored) = i64::try_from(value) else {
                return Err(ParseError::Invalid {
                    span,
                    message: format!("enumerator `{name}` value {value} is out of range"),
                });
            };
            self.scope.constants.insert(name.clone(), value);
            items.push(EnumItem {
                name,
                value: stored,
            });
            next = value.saturating_add(1);
            if !self.eat_punct(Punct::Comma) {
                self.expect_punct(Punct::RBrace, "`,` or `}`")?;
                break;
            }
        }

        let def = Defined::Enum {
            tag: tag.clone(),
            items,
            span: keyword_span.merge(self.prev_span()),
        };
        Ok((CType::Enum(tag.unwrap_or_default()), Some(def)))
    }

    fn declarator(&mut self) -> PResult<Declarator> {
        let mut ops = Vec::new();
        while self.eat_punct(Punct::Star) {
            let mut is_const = false;
            while let Some(word) = self.peek_ident() {
                if word == "const" {
                    is_const = true;
                } else if !is_ignored_word(word) {
                    break;
                }
                self.pos += 1;
            }
            ops.push(Op::Pointer { is_const });
        }
        self.skip_attributes();

        let mut name = None;
        let mut inner = None;
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(ident),
                span,
            }) => {
                name = Some((ident.clone(), *span));
                self.pos += 1;
            }
            Some(token)
                if token.is_punct(Punct::LParen)
                    && matches!(self.nth_kind(1), Some(TokenKind::Punct(Punct::Star))) =>
            {
                self.pos += 1;
                inner = Some(self.declarator()?);
                self.expect_punct(Punct::RParen, "`)`")?;
            }
            _ => {}
        }

        let mut suffixes = Vec::new();
        loop {
            if self.eat_punct(Punct::LBracket) {
                let len = if self.at_punct(Punct::RBracket) {
                    None
                } else {
                    let value = self.eval_constant(&[Punct::RBracket], "array length")?;
                    let len = u64::try_from(value).map_err(|_| ParseError::Invalid {
                        span: self.prev_span(),
                        message: format!("array length {value} is negative"),
                    })?;
                    Some(len)
                };
                self.expect_punct(Punct::RBracket, "`]`")?;
                suffixes.push(Op::Array(len));
            } else if self.eat_punct(Punct::LParen) {
                let (params, variadic) = self.params()?;
                suffixes.push(Op::Function { params, variadic });
            } else {
                break;
            }
        }

        ops.extend(suffixes.into_iter().rev());
        if let Some(inner) = inner {
            ops.extend(inner.ops);
            name = inner.name;
        }
        Ok(Declarator { name, ops })
    }

    /// Parameters after `(` through the closing `)`.
    fn params(&mut self) -> PResult<(Vec<Param>, bool)> {
        let mut params = Vec::new();
        let mut variadic = false;

        if self.eat_punct(Punct::RParen) {
            return Ok((params, variadic));
        }
        if self.at_ident("void") && matches!(self.nth_kind(1), Some(TokenKind::Punct(Punct::RParen)))
        {
            self.pos += 2;
            return Ok((params, variadic));
        }

        loop {
            if self.eat_punct(Punct::Ellipsis) {
                variadic = true;
                self.expect_punct(Punct::RParen, "`)` after `...`")?;
                break;
            }
            let start = self.peek_span();
            let spec = self.specifiers()?;
            if spec.defined.is_some() {
                return Err(ParseError::Unsupported {
                    span: start,
                    what: "type defined inside a parameter list".into(),
                });
            }
            let decl = self.declarator()?;
            self.skip_attributes();
            let span = start.merge(self.prev_span());
            let ty = match self.shape(spec.ty, spec.is_const, decl.ops, span)? {
                // Array parameters decay to pointers.
                Shape::Object(CType::Array { elem, .. }) => CType::Pointer {
                    pointee: elem,
                    is_const: false,
                },
                Shape::Object(ty) => ty,
                Shape::Function {
                    ret,
                    params,
                    variadic,
                } => CType::FunctionPointer {
                    ret: Box::new(ret),
                    params: params.into_iter().map(|p| p.ty).collect(),
                    variadic,
                },
            };
            params.push(Param {
                name: decl.name.map(|(name, _)| name),
                ty,
            });

            if self.eat_punct(Punct::Comma) {
                continue;
            }
            self.expect_punct(Punct::RParen, "`,` or `)`")?;
            break;
        }

        Ok((params, variadic))
    }
}
