//! Rebind Gen - rule-driven binding generation.
//!
//! Takes the declarations read by `rebind_header` and produces the output
//! model the emitter renders.
//!
//! # Pipeline
//!
//! ```text
//! HeaderSet ──transform──▶ wrapped unit ──reshape──▶ flat unit
//!              (rules, type table,          (hoisted uses,
//!               string codecs)               value equality)
//! ```
//!
//! # Module Organization
//!
//! - `registry`: ordered per-kind rules and the shadowing audit
//! - `typemap`: default C to host type table
//! - `marshal`: codec choice for string-like slots
//! - `transform`: declarations to output model
//! - `reshape`: structural flattening
//! - `config`: JSON configuration and the nng preset

pub mod config;
pub mod marshal;
pub mod registry;
pub mod reshape;
pub mod transform;
pub mod typemap;

use rebind_diagnostic::{Diagnostic, Tally};
use rebind_header::HeaderSet;
use rebind_ir::model::GeneratedUnit;
use tracing::debug;

pub use config::{ConfigError, GeneratorConfig};
pub use registry::{Action, MarshalSlot, Matcher, Rule, RuleError, RuleRegistry};
pub use reshape::{reshape, ReshapeError, Reshaped};
pub use transform::{transform, TransformOptions, Transformed};

/// Result of a full generation pass.
#[derive(Clone, Debug)]
pub struct Generated {
    /// `None` when reshaping failed; the reason is among the diagnostics.
    pub unit: Option<GeneratedUnit>,
    /// Header, rule, transform and reshape diagnostics, in that order.
    pub diagnostics: Vec<Diagnostic>,
}

impl Generated {
    pub fn has_errors(&self) -> bool {
        Tally::of(&self.diagnostics).has_errors()
    }
}

/// Run the rule audit, the transformer and the reshaper over `headers`.
#[tracing::instrument(level = "debug", skip_all, fields(file = %options.file_name))]
pub fn generate(
    headers: &HeaderSet,
    registry: &RuleRegistry,
    options: &TransformOptions,
    value_equality_suffix: &str,
) -> Generated {
    let mut diagnostics = headers.diagnostics.clone();
    diagnostics.extend(registry.shadowed());

    let transformed = transform(headers, registry, options);
    diagnostics.extend(transformed.diagnostics);

    let unit = match reshape(transformed.unit, value_equality_suffix) {
        Ok(reshaped) => {
            diagnostics.extend(reshaped.warnings);
            Some(reshaped.unit)
        }
        Err(err) => {
            diagnostics.push(err.into_diagnostic());
            None
        }
    };

    let tally = Tally::of(&diagnostics);
    debug!(errors = tally.errors, warnings = tally.warnings, "generated");
    Generated { unit, diagnostics }
}
