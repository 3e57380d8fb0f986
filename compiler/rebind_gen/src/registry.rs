//! Rule Registry
//!
//! One ordered rule list per [`DeclKind`]. A declaration is only ever
//! checked against rules of its own kind, and the first rule whose matcher
//! accepts the name decides the action. Exact matchers get no priority over
//! patterns: registration order alone decides.
//!
//! Because order is load-bearing, [`RuleRegistry::shadowed`] reports exact
//! rules that can never fire because an earlier rule already matches.

use std::fmt;

use rebind_diagnostic::{Diagnostic, ErrorCode};
use rebind_ir::model::{DeclKind, MarshalDirection};
use rebind_ir::CType;
use regex::Regex;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Tests a declaration name.
#[derive(Clone, Debug)]
pub enum Matcher {
    Exact(String),
    /// Anchored: the whole name must match.
    Pattern(Regex),
}

impl Matcher {
    pub fn exact(name: impl Into<String>) -> Self {
        Matcher::Exact(name.into())
    }

    /// Compile `pattern` so that it must match the entire name.
    pub fn pattern(pattern: &str) -> Result<Self, RuleError> {
        Regex::new(&format!("^(?:{pattern})$"))
            .map(Matcher::Pattern)
            .map_err(|source| RuleError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Every name starting with `prefix`.
    pub fn prefix(prefix: &str) -> Self {
        let escaped = regex::escape(prefix);
        match Regex::new(&format!("^(?:{escaped}.*)$")) {
            Ok(regex) => Matcher::Pattern(regex),
            // An escaped literal always compiles.
            Err(_) => Matcher::Exact(prefix.to_string()),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::Exact(exact) => exact == name,
            Matcher::Pattern(regex) => regex.is_match(name),
        }
    }

    /// The pattern as written, without the anchoring wrapper.
    pub fn source(&self) -> &str {
        match self {
            Matcher::Exact(name) => name,
            Matcher::Pattern(regex) => {
                let text = regex.as_str();
                text.strip_prefix("^(?:")
                    .and_then(|t| t.strip_suffix(")$"))
                    .unwrap_or(text)
            }
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exact(name) => write!(f, "`{name}`"),
            Matcher::Pattern(_) => write!(f, "/{}/", self.source()),
        }
    }
}

/// Which function slot an `OverrideMarshal` rule applies to.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum MarshalSlot {
    Return,
    /// A parameter by name (unnamed parameters are `arg0`, `arg1`, ...).
    Param(String),
}

impl fmt::Display for MarshalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalSlot::Return => f.write_str("return"),
            MarshalSlot::Param(name) => write!(f, "parameter `{name}`"),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Action {
    Discard,
    RetypeAs(CType),
    OverrideMarshal {
        slot: MarshalSlot,
        direction: MarshalDirection,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Discard => "discard",
            Action::RetypeAs(_) => "retype_as",
            Action::OverrideMarshal { .. } => "override_marshal",
        }
    }

    fn applies_to(&self, kind: DeclKind) -> bool {
        match self {
            Action::Discard | Action::RetypeAs(_) => true,
            Action::OverrideMarshal { .. } => kind == DeclKind::Function,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Discard => f.write_str("discard"),
            Action::RetypeAs(ty) => write!(f, "retype as `{ty}`"),
            Action::OverrideMarshal { slot, direction } => {
                write!(f, "marshal {slot} {direction}")
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Rule {
    pub kind: DeclKind,
    pub matcher: Matcher,
    pub action: Action,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.kind, self.matcher, self.action)
    }
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("`{action}` rules cannot target {kind} declarations")]
    ActionNotApplicable { kind: DeclKind, action: &'static str },

    #[error("invalid name pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Ordered rules partitioned by declaration kind.
#[derive(Clone, Debug, Default)]
pub struct RuleRegistry {
    rules: FxHashMap<DeclKind, Vec<Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule to the end of `kind`'s list.
    pub fn register(
        &mut self,
        kind: DeclKind,
        matcher: Matcher,
        action: Action,
    ) -> Result<(), RuleError> {
        if !action.applies_to(kind) {
            return Err(RuleError::ActionNotApplicable {
                kind,
                action: action.name(),
            });
        }
        self.rules.entry(kind).or_default().push(Rule {
            kind,
            matcher,
            action,
        });
        Ok(())
    }

    /// The action of the first `kind` rule matching `name`.
    pub fn resolve(&self, kind: DeclKind, name: &str) -> Option<&Action> {
        self.rules(kind)
            .iter()
            .find(|rule| rule.matcher.matches(name))
            .map(|rule| &rule.action)
    }

    /// Rules of one kind, in registration order.
    pub fn rules(&self, kind: DeclKind) -> &[Rule] {
        self.rules.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// All rules, grouped by kind in [`DeclKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        DeclKind::ALL
            .into_iter()
            .flat_map(move |kind| self.rules(kind).iter())
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Warn about exact rules that an earlier rule of the same kind
    /// already matches; they can never fire.
    pub fn shadowed(&self) -> Vec<Diagnostic> {
        let mut warnings = Vec::new();
        for kind in DeclKind::ALL {
            let rules = self.rules(kind);
            for (index, rule) in rules.iter().enumerate() {
                let Matcher::Exact(name) = &rule.matcher else {
                    continue;
                };
                let Some((earlier_index, earlier)) = rules[..index]
                    .iter()
                    .enumerate()
                    .find(|(_, earlier)| earlier.matcher.matches(name))
                else {
                    continue;
                };
                warnings.push(
                    Diagnostic::warning(ErrorCode::W2001)
                        .with_message(format!(
                            "{kind} rule #{} for `{name}` can never apply",
                            index + 1
                        ))
                        .with_note(format!(
                            "rule #{} ({}) matches first and wins",
                            earlier_index + 1,
                            earlier
                        ))
                        .with_suggestion("remove the later rule or register it first"),
                );
            }
        }
        warnings
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
