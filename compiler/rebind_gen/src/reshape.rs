//! Structural Reshaper
//!
//! The transformer leaves everything inside a synthetic wrapper scope. This
//! pass flattens it: imports are hoisted to the top of the unit, the single
//! container follows them, and the wrapper disappears. Declaration order
//! inside the container is never touched.
//!
//! The pass also promotes structs whose name ends with a configured suffix
//! to value equality, provided every field can be compared by value.

use rebind_diagnostic::{internal_error, Diagnostic, ErrorCode};
use rebind_ir::ast::Aggregate;
use rebind_ir::model::{
    Container, Decl, DeclBody, FieldDef, GeneratedUnit, HostType, UnitMember, UseDecl,
    ValueEquality,
};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct Reshaped {
    pub unit: GeneratedUnit,
    /// `W1001` for suffix-named structs left with identity equality.
    pub warnings: Vec<Diagnostic>,
}

/// The unit does not have the shape the transformer produces.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ReshapeError {
    #[error("expected exactly one wrapper scope, found {0}")]
    ScopeCount(usize),
    #[error("expected exactly one declaration container, found {0}")]
    ContainerCount(usize),
    #[error("wrapper scope `{scope}` contains nested scope `{nested}`")]
    NestedScope { scope: String, nested: String },
}

impl ReshapeError {
    /// Report as `E9001`.
    pub fn into_diagnostic(self) -> Diagnostic {
        internal_error(self.to_string())
    }
}

/// Hoist imports out of the wrapper scope and mark value-equality structs.
///
/// Fails unless the unit holds exactly one wrapper scope and exactly one
/// container.
#[tracing::instrument(level = "debug", skip_all, fields(file = %unit.file_name))]
pub fn reshape(unit: GeneratedUnit, suffix: &str) -> Result<Reshaped, ReshapeError> {
    let mut uses: Vec<UseDecl> = Vec::new();
    let mut containers: Vec<Container> = Vec::new();
    let mut scopes = 0usize;

    for member in unit.members {
        match member {
            UnitMember::Use(u) => uses.push(u),
            UnitMember::Container(c) => containers.push(c),
            UnitMember::Scope(scope) => {
                scopes += 1;
                for inner in scope.members {
                    match inner {
                        UnitMember::Use(u) => uses.push(u),
                        UnitMember::Container(c) => containers.push(c),
                        UnitMember::Scope(nested) => {
                            return Err(ReshapeError::NestedScope {
                                scope: scope.name,
                                nested: nested.name,
                            });
                        }
                    }
                }
            }
        }
    }

    if scopes != 1 {
        return Err(ReshapeError::ScopeCount(scopes));
    }
    let mut container = match containers.len() {
        1 => containers.remove(0),
        n => return Err(ReshapeError::ContainerCount(n)),
    };

    let mut seen = FxHashSet::default();
    uses.retain(|u| seen.insert(u.path.clone()));

    let warnings = promote_value_equality(&mut container.decls, suffix);
    debug!(
        uses = uses.len(),
        decls = container.decls.len(),
        warnings = warnings.len(),
        "reshaped"
    );

    let mut members: Vec<UnitMember> = uses.into_iter().map(UnitMember::Use).collect();
    members.push(UnitMember::Container(container));
    Ok(Reshaped {
        unit: GeneratedUnit {
            file_name: unit.file_name,
            members,
        },
        warnings,
    })
}

/// What a name in the container refers to.
enum Target<'a> {
    Struct(&'a [FieldDef]),
    Opaque,
    Union,
    Enum,
    Alias(&'a HostType),
}

struct Lookup<'a> {
    names: FxHashMap<&'a str, Target<'a>>,
}

impl<'a> Lookup<'a> {
    fn new(decls: &'a [Decl]) -> Self {
        let names = decls
            .iter()
            .filter_map(|decl| {
                let target = match &decl.body {
                    DeclBody::Struct(shape) => match (&shape.aggregate, &shape.fields) {
                        (Aggregate::Union, _) => Target::Union,
                        (Aggregate::Struct, Some(fields)) => Target::Struct(fields),
                        (Aggregate::Struct, None) => Target::Opaque,
                    },
                    DeclBody::Enum(_) => Target::Enum,
                    DeclBody::Alias(ty) => Target::Alias(ty),
                    DeclBody::Function(_) | DeclBody::Constant(_) => return None,
                };
                Some((decl.name.as_str(), target))
            })
            .collect();
        Lookup { names }
    }

    /// Whether a by-value field of type `ty` supports `PartialEq`, given the
    /// structs currently marked as comparable.
    fn comparable(&self, ty: &HostType, marked: &FxHashSet<&str>, depth: usize) -> bool {
        match ty {
            HostType::Named(name) => match self.names.get(name.as_str()) {
                Some(Target::Struct(_)) => marked.contains(name.as_str()),
                Some(Target::Enum) => true,
                Some(Target::Alias(inner)) if depth < 32 => {
                    self.comparable(inner, marked, depth + 1)
                }
                Some(Target::Alias(_) | Target::Opaque | Target::Union) | None => false,
            },
            HostType::Array { elem, .. } => self.comparable(elem, marked, depth),
            HostType::Unit
            | HostType::Prim(_)
            | HostType::CVoid
            | HostType::Ptr { .. }
            | HostType::FnPtr { .. }
            | HostType::Str => true,
        }
    }

    /// Whether `ty` holds a float by value, looking through structs and aliases.
    fn has_float(&self, ty: &HostType, visiting: &mut FxHashSet<String>) -> bool {
        match ty {
            HostType::Prim(prim) => prim.is_float(),
            HostType::Array { elem, .. } => self.has_float(elem, visiting),
            HostType::Named(name) => {
                if !visiting.insert(name.clone()) {
                    return false;
                }
                let found = match self.names.get(name.as_str()) {
                    Some(Target::Struct(fields)) => {
                        fields.iter().any(|f| self.has_float(&f.ty, visiting))
                    }
                    Some(Target::Alias(inner)) => self.has_float(inner, visiting),
                    _ => false,
                };
                visiting.remove(name);
                found
            }
            _ => false,
        }
    }
}

/// Mark suffix-named structs whose fields all compare by value.
///
/// Candidates are removed until a fixpoint: a struct holding another
/// candidate that was removed loses its promotion too.
fn promote_value_equality(decls: &mut [Decl], suffix: &str) -> Vec<Diagnostic> {
    let mut warnings = Vec::new();
    let promoted: Vec<(String, ValueEquality)> = {
        let lookup = Lookup::new(decls);
        let mut marked: FxHashSet<&str> = decls
            .iter()
            .filter(|decl| decl.name.ends_with(suffix))
            .filter(|decl| matches!(lookup.names.get(decl.name.as_str()), Some(Target::Struct(_))))
            .map(|decl| decl.name.as_str())
            .collect();

        loop {
            let failing = decls.iter().find_map(|decl| {
                if !marked.contains(decl.name.as_str()) {
                    return None;
                }
                let Some(Target::Struct(fields)) = lookup.names.get(decl.name.as_str()) else {
                    return None;
                };
                fields
                    .iter()
                    .find(|field| !lookup.comparable(&field.ty, &marked, 0))
                    .map(|field| (decl.name.as_str(), field.name.as_str()))
            });
            let Some((name, field)) = failing else {
                break;
            };
            marked.remove(name);
            warnings.push(
                Diagnostic::warning(ErrorCode::W1001)
                    .with_message(format!(
                        "`{name}` cannot compare by value: field `{field}` is not comparable"
                    ))
                    .with_note(format!("`{name}` is emitted without `PartialEq`")),
            );
        }

        decls
            .iter()
            .filter(|decl| marked.contains(decl.name.as_str()))
            .map(|decl| {
                let mut visiting = FxHashSet::default();
                let floats = lookup.has_float(&HostType::Named(decl.name.clone()), &mut visiting);
                let level = if floats {
                    ValueEquality::Partial
                } else {
                    ValueEquality::Full
                };
                (decl.name.clone(), level)
            })
            .collect()
    };

    let levels: FxHashMap<String, ValueEquality> = promoted.into_iter().collect();
    for decl in decls.iter_mut() {
        if let DeclBody::Struct(shape) = &mut decl.body {
            shape.value_equality = levels.get(&decl.name).copied();
        }
    }
    warnings
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
