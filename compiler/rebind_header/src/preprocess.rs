//! Conditional preprocessor.
//!
//! Line-oriented pass over a file's tokens. Conditional directives are
//! evaluated against the macros defined so far (command-line defines
//! first, then every `#define` seen in earlier files and lines). Active
//! lines have object-like macros expanded; function-like macros are
//! recorded but never expanded. `#include` is ignored: files are
//! processed in path order sharing one macro table instead.
//!
//! Every object-like `#define` in an active region is also reported as a
//! [`MacroDecl`] so the generator can turn it into a constant. Its value
//! is computed once the file is done, from the macro table at that point,
//! so a body may name macros defined further down. [`Preprocessor::macro_value`]
//! recomputes it later against a table that has seen more files.

use rebind_diagnostic::{Diagnostic, ErrorCode};
use rebind_ir::ast::{MacroDecl, MacroValue, Origin};
use rebind_ir::{FileId, Span};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::eval::eval;
use crate::lexer::{lex, Punct, Token, TokenKind};

#[derive(Clone, Debug)]
struct MacroDef {
    body: Vec<Token>,
    function_like: bool,
}

#[derive(Clone, Debug)]
struct Conditional {
    parent_active: bool,
    active: bool,
    /// Some branch of this group has already been taken.
    taken: bool,
    seen_else: bool,
    span: Span,
}

/// Output of preprocessing one file.
#[derive(Clone, Debug, Default)]
pub struct Preprocessed {
    /// Active, expanded tokens with trivia removed.
    pub tokens: Vec<Token>,
    /// Comment text directly preceding the token at an index.
    pub docs: FxHashMap<usize, String>,
    /// Object-like macros, keyed by the token index they precede.
    pub macros: Vec<(usize, MacroDecl)>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Macro table shared across the files of one run.
#[derive(Clone, Debug, Default)]
pub struct Preprocessor {
    macros: FxHashMap<String, MacroDef>,
    /// Raw body of every reported object-like macro.
    bodies: FxHashMap<Origin, Vec<Token>>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predefine `name`, as `-D name[=value]` would. A missing value
    /// defines the macro as `1`.
    pub fn define(&mut self, name: &str, value: Option<&str>) {
        let body = match value {
            Some(text) => lex(text)
                .tokens
                .into_iter()
                .filter(|t| !t.kind.is_trivia())
                .collect(),
            None => vec![Token::new(TokenKind::Int(1), Span::DUMMY)],
        };
        self.macros.insert(
            name.to_string(),
            MacroDef {
                body,
                function_like: false,
            },
        );
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Run the preprocessor over one lexed file.
    pub fn process(&mut self, file: FileId, source: &str, tokens: &[Token]) -> Preprocessed {
        let mut state = FileState {
            file,
            source,
            out: Preprocessed::default(),
            stack: Vec::new(),
            pending_doc: None,
            blank_lines: 0,
        };

        for line in tokens.split_inclusive(|t| t.kind == TokenKind::Newline) {
            let first = line.iter().find(|t| !matches!(t.kind, TokenKind::Comment(_)));
            if matches!(first.map(|t| &t.kind), Some(TokenKind::Hash)) {
                let directive: Vec<&Token> = line
                    .iter()
                    .filter(|t| !t.kind.is_trivia())
                    .skip(1)
                    .collect();
                let hash_span = first.map_or(Span::DUMMY, |t| t.span);
                self.directive(&mut state, hash_span, &directive);
                state.pending_doc = None;
                continue;
            }
            if state.is_active() {
                self.text_line(&mut state, line);
            }
        }

        for open in state.stack.drain(..).rev() {
            state.out.diagnostics.push(
                Diagnostic::error(ErrorCode::E1002)
                    .with_message("unterminated conditional directive")
                    .with_label(open.span, "this conditional has no matching `#endif`"),
            );
        }

        let mut out = state.out;
        for (_, decl) in &mut out.macros {
            decl.value = self.macro_value(decl);
        }
        out
    }

    /// Value of a reported macro, expanding its body with the current
    /// table. Unknown declarations keep the value they carry.
    pub fn macro_value(&self, decl: &MacroDecl) -> MacroValue {
        let Some(body) = self.bodies.get(&decl.origin) else {
            return decl.value.clone();
        };
        let mut hidden = FxHashSet::default();
        hidden.insert(decl.name.clone());
        let mut expanded = Vec::new();
        self.expand_into(body, &mut expanded, &mut hidden, None);
        classify(&expanded)
    }

    fn text_line(&self, state: &mut FileState<'_>, line: &[Token]) {
        let mut code: Vec<Token> = Vec::new();
        for token in line {
            match &token.kind {
                // Trailing comments after code on the same line are dropped.
                TokenKind::Comment(_) if !code.is_empty() => {}
                TokenKind::Comment(text) => {
                    match &mut state.pending_doc {
                        Some(doc) => {
                            doc.push('\n');
                            doc.push_str(text);
                        }
                        None => state.pending_doc = Some(text.clone()),
                    }
                    state.blank_lines = 0;
                }
                TokenKind::Newline => {
                    if code.is_empty() {
                        state.blank_lines += 1;
                        if state.blank_lines > 1 {
                            state.pending_doc = None;
                        }
                    }
                }
                _ => {
                    if code.is_empty() {
                        if let Some(doc) = state.pending_doc.take() {
                            state.out.docs.insert(state.out.tokens.len(), doc);
                        }
                    }
                    state.blank_lines = 0;
                    code.push(token.clone());
                }
            }
        }
        let mut hidden = FxHashSet::default();
        self.expand_into(&code, &mut state.out.tokens, &mut hidden, None);
    }

    /// Expand object-like macros in `tokens`, appending to `out`.
    ///
    /// `hidden` holds the macros currently being expanded; a name inside
    /// its own expansion is left alone. Expanded tokens take the span of
    /// the outermost invocation.
    fn expand_into(
        &self,
        tokens: &[Token],
        out: &mut Vec<Token>,
        hidden: &mut FxHashSet<String>,
        site: Option<Span>,
    ) {
        for token in tokens {
            let span = site.unwrap_or(token.span);
            let expansion = token.ident().and_then(|name| {
                self.macros
                    .get(name)
                    .filter(|def| !def.function_like && !hidden.contains(name))
                    .map(|def| (name, def))
            });
            match expansion {
                Some((name, def)) => {
                    hidden.insert(name.to_string());
                    self.expand_into(&def.body, out, hidden, Some(span));
                    hidden.remove(name);
                }
                None => out.push(Token::new(token.kind.clone(), span)),
            }
        }
    }

    fn directive(&mut self, state: &mut FileState<'_>, hash_span: Span, tokens: &[&Token]) {
        let Some(name_token) = tokens.first() else {
            return; // null directive
        };
        let name = match &name_token.kind {
            TokenKind::Ident(name) => name.as_str(),
            // `#if` lexes as an identifier; anything else is malformed.
            other => {
                if state.is_active() {
                    state.out.diagnostics.push(
                        Diagnostic::error(ErrorCode::E1001)
                            .with_message(format!("expected directive name, found `{other}`"))
                            .with_label(name_token.span, "expected directive name"),
                    );
                }
                return;
            }
        };
        let rest = &tokens[1..];
        let span = hash_span.merge(tokens.last().map_or(hash_span, |t| t.span));

        match name {
            "ifdef" | "ifndef" => {
                let parent = state.is_active();
                let cond = match rest.first().and_then(|t| t.ident()) {
                    Some(macro_name) => self.is_defined(macro_name) == (name == "ifdef"),
                    None => {
                        if parent {
                            state.missing_name(name, span);
                        }
                        false
                    }
                };
                state.push(parent, parent && cond, span);
            }
            "if" => {
                let parent = state.is_active();
                let cond = parent && self.condition(state, rest, span);
                state.push(parent, cond, span);
            }
            "elif" => {
                let Some(top) = state.stack.last() else {
                    state.unbalanced("#elif without #if", span);
                    return;
                };
                if top.seen_else {
                    state.unbalanced("#elif after #else", span);
                    return;
                }
                let evaluate = top.parent_active && !top.taken;
                let cond = evaluate && self.condition(state, rest, span);
                if let Some(top) = state.stack.last_mut() {
                    top.active = cond;
                    top.taken |= cond;
                }
            }
            "else" => match state.stack.last_mut() {
                None => state.unbalanced("#else without #if", span),
                Some(top) if top.seen_else => state.unbalanced("duplicate #else", span),
                Some(top) => {
                    top.active = top.parent_active && !top.taken;
                    top.taken = true;
                    top.seen_else = true;
                }
            },
            "endif" => {
                if state.stack.pop().is_none() {
                    state.unbalanced("#endif without #if", span);
                }
            }
            _ if !state.is_active() => {}
            "define" => self.define_directive(state, rest, span),
            "undef" => {
                if let Some(macro_name) = rest.first().and_then(|t| t.ident()) {
                    self.macros.remove(macro_name);
                } else {
                    state.missing_name(name, span);
                }
            }
            "error" => {
                let text = state.text_of(rest);
                state.out.diagnostics.push(
                    Diagnostic::error(ErrorCode::E1003)
                        .with_message(format!("#error {text}"))
                        .with_label(span, "reached #error directive"),
                );
            }
            "include" | "include_next" | "import" | "pragma" | "line" | "ident" | "warning" => {
                trace!(directive = name, "ignoring directive");
            }
            other => {
                state.out.diagnostics.push(
                    Diagnostic::warning(ErrorCode::E1004)
                        .with_message(format!("unknown directive `#{other}` ignored"))
                        .with_label(span, "unknown directive"),
                );
            }
        }
    }

    fn define_directive(&mut self, state: &mut FileState<'_>, rest: &[&Token], span: Span) {
        let Some(name_token) = rest.first() else {
            state.missing_name("define", span);
            return;
        };
        let Some(name) = name_token.ident() else {
            state.missing_name("define", span);
            return;
        };
        // `#define F(x)` is function-like only when `(` touches the name.
        let function_like = rest
            .get(1)
            .is_some_and(|t| t.is_punct(Punct::LParen) && t.span.start == name_token.span.end);

        let body_start = if function_like {
            rest.iter()
                .position(|t| t.is_punct(Punct::RParen))
                .map_or(rest.len(), |i| i + 1)
        } else {
            1
        };
        let body: Vec<Token> = rest[body_start..].iter().map(|t| (*t).clone()).collect();

        if function_like {
            debug!(name, "recording function-like macro; it will not be expanded");
        } else {
            let origin = Origin::new(state.file, span);
            let decl = MacroDecl {
                name: name.to_string(),
                body: state.text_of(&rest[body_start..]),
                // Filled in when the file is done.
                value: MacroValue::Other,
                origin,
            };
            self.bodies.insert(origin, body.clone());
            state.out.macros.push((state.out.tokens.len(), decl));
        }

        self.macros.insert(
            name.to_string(),
            MacroDef {
                body,
                function_like,
            },
        );
    }

    /// Evaluate an `#if`/`#elif` condition. Errors are reported and the
    /// branch is treated as false.
    fn condition(&self, state: &mut FileState<'_>, tokens: &[&Token], span: Span) -> bool {
        let mut substituted = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            if token.is_ident("defined") {
                let (target, consumed) = match (tokens.get(i + 1), tokens.get(i + 2)) {
                    (Some(open), Some(name)) if open.is_punct(Punct::LParen) => (
                        name.ident(),
                        if tokens.get(i + 3).is_some_and(|t| t.is_punct(Punct::RParen)) {
                            4
                        } else {
                            3
                        },
                    ),
                    (Some(name), _) => (name.ident(), 2),
                    (None, _) => (None, 1),
                };
                let Some(target) = target else {
                    state.missing_name("defined", token.span);
                    return false;
                };
                let value = u128::from(self.is_defined(target));
                substituted.push(Token::new(TokenKind::Int(value), token.span));
                i += consumed;
            } else {
                substituted.push(token.clone());
                i += 1;
            }
        }

        let mut expanded = Vec::new();
        self.expand_into(&substituted, &mut expanded, &mut FxHashSet::default(), None);

        // Identifiers left after expansion evaluate to 0.
        match eval(&expanded, |_| Some(0)) {
            Ok(value) => value != 0,
            Err(err) => {
                state.out.diagnostics.push(
                    Diagnostic::error(ErrorCode::E1001)
                        .with_message(format!("invalid conditional expression: {err}"))
                        .with_label(span, "in this directive"),
                );
                false
            }
        }
    }
}

/// Classify an expanded macro body.
fn classify(tokens: &[Token]) -> MacroValue {
    if !tokens.is_empty() && tokens.iter().all(|t| matches!(t.kind, TokenKind::Str(_))) {
        let joined = tokens
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Str(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        return MacroValue::Str(joined);
    }
    match eval(tokens, |_| None) {
        Ok(value) => MacroValue::Int(value),
        Err(_) => MacroValue::Other,
    }
}

struct FileState<'src> {
    file: FileId,
    source: &'src str,
    out: Preprocessed,
    stack: Vec<Conditional>,
    pending_doc: Option<String>,
    blank_lines: u32,
}

impl FileState<'_> {
    fn is_active(&self) -> bool {
        self.stack.last().map_or(true, |c| c.active)
    }

    fn push(&mut self, parent_active: bool, active: bool, span: Span) {
        self.stack.push(Conditional {
            parent_active,
            active,
            taken: active,
            seen_else: false,
            span,
        });
    }

    fn unbalanced(&mut self, message: &str, span: Span) {
        self.out.diagnostics.push(
            Diagnostic::error(ErrorCode::E1002)
                .with_message(message.to_string())
                .with_label(span, "unbalanced conditional directive"),
        );
    }

    fn missing_name(&mut self, directive: &str, span: Span) {
        self.out.diagnostics.push(
            Diagnostic::error(ErrorCode::E1001)
                .with_message(format!("`{directive}` expects a macro name"))
                .with_label(span, "macro name missing"),
        );
    }

    /// Source text covered by `tokens`, whitespace-normalized.
    fn text_of(&self, tokens: &[&Token]) -> String {
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return String::new();
        };
        let range = first.span.start as usize..last.span.end as usize;
        self.source
            .get(range)
            .unwrap_or_default()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests;
