//! Integer constant-expression evaluation.
//!
//! Shared by `#if` conditions, enumerator values, array lengths and macro
//! values. Arithmetic is done in `i128` and fails on overflow instead of
//! wrapping. Casts to integer types are accepted and ignored.

use std::fmt;

use rebind_ir::IntKind;

use crate::lexer::{Punct, Token, TokenKind};

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum EvalError {
    Empty,
    Unexpected(String),
    UnknownIdent(String),
    DivideByZero,
    Overflow,
    /// A complete expression was followed by more tokens.
    Trailing(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Empty => write!(f, "empty expression"),
            EvalError::Unexpected(found) => write!(f, "unexpected `{found}` in expression"),
            EvalError::UnknownIdent(name) => write!(f, "`{name}` is not a constant"),
            EvalError::DivideByZero => write!(f, "division by zero"),
            EvalError::Overflow => write!(f, "arithmetic overflow"),
            EvalError::Trailing(found) => write!(f, "unexpected `{found}` after expression"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Evaluate `tokens` as one integer constant expression.
///
/// Identifiers are looked up through `resolve`; trivia must already be
/// filtered out.
pub fn eval<R>(tokens: &[Token], resolve: R) -> Result<i128, EvalError>
where
    R: Fn(&str) -> Option<i128>,
{
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }
    let mut ev = Evaluator {
        tokens,
        pos: 0,
        resolve,
    };
    let value = ev.conditional()?;
    match ev.peek() {
        None => Ok(value),
        Some(kind) => Err(EvalError::Trailing(kind.to_string())),
    }
}

/// Evaluate with no identifiers in scope.
pub fn eval_literal(tokens: &[Token]) -> Result<i128, EvalError> {
    eval(tokens, |_| None)
}

struct Evaluator<'a, R> {
    tokens: &'a [Token],
    pos: usize,
    resolve: R,
}

fn binary_precedence(punct: Punct) -> Option<u8> {
    let prec = match punct {
        Punct::OrOr => 1,
        Punct::AndAnd => 2,
        Punct::Pipe => 3,
        Punct::Caret => 4,
        Punct::Amp => 5,
        Punct::EqEq | Punct::Ne => 6,
        Punct::Lt | Punct::Gt | Punct::Le | Punct::Ge => 7,
        Punct::Shl | Punct::Shr => 8,
        Punct::Plus | Punct::Minus => 9,
        Punct::Star | Punct::Slash | Punct::Percent => 10,
        _ => return None,
    };
    Some(prec)
}

fn is_type_word(name: &str) -> bool {
    matches!(
        name,
        "char" | "short" | "int" | "long" | "signed" | "unsigned" | "const" | "_Bool" | "bool"
    ) || IntKind::from_typedef_name(name).is_some()
}

impl<'a, R> Evaluator<'a, R>
where
    R: Fn(&str) -> Option<i128>,
{
    fn peek(&self) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_punct(&self) -> Option<Punct> {
        match self.peek() {
            Some(TokenKind::Punct(p)) => Some(*p),
            _ => None,
        }
    }

    fn bump(&mut self) -> Option<&'a TokenKind> {
        let kind = self.tokens.get(self.pos).map(|t| &t.kind);
        self.pos += 1;
        kind
    }

    fn expect(&mut self, punct: Punct) -> Result<(), EvalError> {
        match self.bump() {
            Some(TokenKind::Punct(p)) if *p == punct => Ok(()),
            Some(other) => Err(EvalError::Unexpected(other.to_string())),
            None => Err(EvalError::Empty),
        }
    }

    fn conditional(&mut self) -> Result<i128, EvalError> {
        let cond = self.binary(1)?;
        if self.peek_punct() != Some(Punct::Question) {
            return Ok(cond);
        }
        self.pos += 1;
        let then = self.conditional()?;
        self.expect(Punct::Colon)?;
        let otherwise = self.conditional()?;
        Ok(if cond != 0 { then } else { otherwise })
    }

    fn binary(&mut self, min_prec: u8) -> Result<i128, EvalError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek_punct() {
            let Some(prec) = binary_precedence(op) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(prec + 1)?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<i128, EvalError> {
        match self.peek_punct() {
            Some(Punct::Minus) => {
                self.pos += 1;
                self.unary()?.checked_neg().ok_or(EvalError::Overflow)
            }
            Some(Punct::Plus) => {
                self.pos += 1;
                self.unary()
            }
            Some(Punct::Tilde) => {
                self.pos += 1;
                Ok(!self.unary()?)
            }
            Some(Punct::Bang) => {
                self.pos += 1;
                Ok(i128::from(self.unary()? == 0))
            }
            Some(Punct::LParen) => {
                self.pos += 1;
                if self.skip_cast() {
                    return self.unary();
                }
                let value = self.conditional()?;
                self.expect(Punct::RParen)?;
                Ok(value)
            }
            _ => self.primary(),
        }
    }

    /// After `(`: if a type name and `)` follow, consume them.
    fn skip_cast(&mut self) -> bool {
        let mut end = self.pos;
        while let Some(name) = self.tokens.get(end).and_then(Token::ident) {
            if !is_type_word(name) {
                return false;
            }
            end += 1;
        }
        if end == self.pos || !self.tokens.get(end).is_some_and(|t| t.is_punct(Punct::RParen)) {
            return false;
        }
        self.pos = end + 1;
        true
    }

    fn primary(&mut self) -> Result<i128, EvalError> {
        match self.bump() {
            Some(TokenKind::Int(v)) => i128::try_from(*v).map_err(|_| EvalError::Overflow),
            Some(TokenKind::Char(c)) => Ok(i128::from(*c)),
            Some(TokenKind::Ident(name)) => {
                (self.resolve)(name).ok_or_else(|| EvalError::UnknownIdent(name.clone()))
            }
            Some(other) => Err(EvalError::Unexpected(other.to_string())),
            None => Err(EvalError::Empty),
        }
    }
}

fn apply(op: Punct, lhs: i128, rhs: i128) -> Result<i128, EvalError> {
    let shift = |amount: i128| u32::try_from(amount).ok().filter(|s| *s < 127);
    let value = match op {
        Punct::OrOr => i128::from(lhs != 0 || rhs != 0),
        Punct::AndAnd => i128::from(lhs != 0 && rhs != 0),
        Punct::Pipe => lhs | rhs,
        Punct::Caret => lhs ^ rhs,
        Punct::Amp => lhs & rhs,
        Punct::EqEq => i128::from(lhs == rhs),
        Punct::Ne => i128::from(lhs != rhs),
        Punct::Lt => i128::from(lhs < rhs),
        Punct::Gt => i128::from(lhs > rhs),
        Punct::Le => i128::from(lhs <= rhs),
        Punct::Ge => i128::from(lhs >= rhs),
        Punct::Shl => {
            let amount = shift(rhs).ok_or(EvalError::Overflow)?;
            lhs.checked_mul(1i128 << amount).ok_or(EvalError::Overflow)?
        }
        Punct::Shr => lhs >> shift(rhs).ok_or(EvalError::Overflow)?,
        Punct::Plus => lhs.checked_add(rhs).ok_or(EvalError::Overflow)?,
        Punct::Minus => lhs.checked_sub(rhs).ok_or(EvalError::Overflow)?,
        Punct::Star => lhs.checked_mul(rhs).ok_or(EvalError::Overflow)?,
        Punct::Slash => {
            if rhs == 0 {
                return Err(EvalError::DivideByZero);
            }
            lhs.checked_div(rhs).ok_or(EvalError::Overflow)?
        }
        Punct::Percent => {
            if rhs == 0 {
                return Err(EvalError::DivideByZero);
            }
            lhs.checked_rem(rhs).ok_or(EvalError::Overflow)?
        }
        other => return Err(EvalError::Unexpected(other.as_str().to_string())),
    };
    Ok(value)
}
