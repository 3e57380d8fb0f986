//! Rebind driver.
//!
//! Resolves the configuration, checks the source and destination
//! locations, and runs headers → generation → emission. Diagnostics from
//! every phase are collected and handed back with the outcome so the caller
//! can print all of them before deciding the exit code.

pub mod args;

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;

use rebind_diagnostic::{Diagnostic, Tally};
use rebind_emit::{emit, render, EmitError, EmitReport, PhysicalFs};
use rebind_gen::{generate, ConfigError, GeneratorConfig};
use rebind_header::load_dir;
use rebind_ir::model::DeclKind;
use thiserror::Error;
use tracing::{debug, info};

use crate::args::GenerateArgs;

static TRACING_INIT: Once = Once::new();

/// Initialize the tracing subscriber.
///
/// Only installs a subscriber when `RUST_LOG` is set; safe to call more
/// than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .init();
        }
    });
}

/// Fatal driver conditions.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{role} location `{}` does not exist", path.display())]
    MissingLocation { role: &'static str, path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("generation failed: {errors} error(s), {warnings} warning(s)")]
    Diagnostics { errors: usize, warnings: usize },

    #[error(transparent)]
    Emission(#[from] EmitError),

    #[error("failed to read headers under `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl GenerateError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            GenerateError::MissingLocation { .. } => 2,
            GenerateError::Config(_)
            | GenerateError::Diagnostics { .. }
            | GenerateError::Emission(_)
            | GenerateError::Io { .. } => 1,
        }
    }
}

/// What a successful run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Produced {
    Written(EmitReport),
    /// `--dry-run`: the rendered bindings.
    Rendered(String),
}

/// Diagnostics from every phase plus the final result.
#[derive(Debug)]
pub struct Outcome {
    pub diagnostics: Vec<Diagnostic>,
    pub result: Result<Produced, GenerateError>,
}

impl Outcome {
    fn failed(err: impl Into<GenerateError>) -> Self {
        Outcome {
            diagnostics: Vec::new(),
            result: Err(err.into()),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.result.as_ref().map_or_else(GenerateError::exit_code, |_| 0)
    }
}

/// Load `--config` (or the conventions) and apply the flag overrides.
pub fn resolve_config(args: &GenerateArgs) -> Result<GeneratorConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(source) = &args.source {
        config.source.clone_from(source);
    }
    if let Some(dest) = &args.dest {
        config.dest.clone_from(dest);
    }
    config.defines.extend(args.defines.iter().cloned());
    Ok(config)
}

/// Run the whole pipeline with paths resolved against `cwd`.
#[tracing::instrument(level = "info", skip_all, fields(cwd = %cwd.display()))]
pub fn run_generate(args: &GenerateArgs, cwd: &Path) -> Outcome {
    let config = match resolve_config(args) {
        Ok(config) => config,
        Err(err) => return Outcome::failed(err),
    };
    let (headers_opts, registry) = match config.header_options().and_then(|opts| {
        let registry = config.registry()?;
        Ok((opts, registry))
    }) {
        Ok(pair) => pair,
        Err(err) => return Outcome::failed(err),
    };

    let source = cwd.join(&config.source);
    if !source.is_dir() {
        return Outcome::failed(GenerateError::MissingLocation {
            role: "source",
            path: source,
        });
    }
    let dest = cwd.join(&config.dest);
    if !args.dry_run && !dest.is_dir() {
        return Outcome::failed(GenerateError::MissingLocation {
            role: "destination",
            path: dest,
        });
    }

    let headers = match load_dir(&source, &headers_opts) {
        Ok(headers) => headers,
        Err(source_err) => {
            return Outcome::failed(GenerateError::Io {
                path: source,
                source: source_err,
            })
        }
    };
    debug!(files = headers.files.len(), rules = registry.len(), "headers loaded");

    let generated = generate(
        &headers,
        &registry,
        &config.transform_options(),
        &config.value_equality_suffix,
    );
    let tally = Tally::of(&generated.diagnostics);
    let result = match generated.unit {
        Some(_) if tally.has_errors() => Err(GenerateError::Diagnostics {
            errors: tally.errors,
            warnings: tally.warnings,
        }),
        // Always accompanied by the reshape error explaining it.
        None => Err(GenerateError::Diagnostics {
            errors: tally.errors,
            warnings: tally.warnings,
        }),
        Some(unit) if args.dry_run => Ok(Produced::Rendered(render(&unit))),
        Some(unit) => {
            let mut out = PhysicalFs::new(dest);
            emit(unit, &generated.diagnostics, &mut out)
                .map(Produced::Written)
                .map_err(GenerateError::from)
        }
    };
    if let Ok(Produced::Written(report)) = &result {
        info!(path = %report.path.display(), decls = report.decls, "done");
    }
    Outcome {
        diagnostics: generated.diagnostics,
        result,
    }
}

/// The effective rule table, grouped by kind and numbered in match order,
/// plus the shadowing warnings that refer to those numbers.
pub fn rule_table(config: &GeneratorConfig) -> Result<(String, Vec<Diagnostic>), ConfigError> {
    let registry = config.registry()?;
    let mut table = String::new();
    for kind in DeclKind::ALL {
        for (index, rule) in registry.rules(kind).iter().enumerate() {
            let _ = writeln!(
                table,
                "{:<10}#{:<3} {} -> {}",
                kind.as_str(),
                index + 1,
                rule.matcher,
                rule.action
            );
        }
    }
    if registry.is_empty() {
        table.push_str("(no rules)\n");
    }
    Ok((table, registry.shadowed()))
}

/// The configured rules as JSON, in config order.
pub fn rules_json(config: &GeneratorConfig) -> Result<String, ConfigError> {
    Ok(serde_json::to_string_pretty(&config.rules)?)
}
