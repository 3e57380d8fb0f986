//! Rebind Emit - writes the generated unit as Rust source.
//!
//! Emission is all-or-nothing: it refuses to run while error diagnostics
//! exist, renders the whole unit in memory, then hands the bytes to an
//! [`OutputFs`] in one atomic write.

mod fs;
mod render;
mod writer;

use std::io;
use std::path::{Path, PathBuf};

use rebind_diagnostic::{Diagnostic, Tally};
use rebind_ir::model::GeneratedUnit;
use thiserror::Error;
use tracing::{debug, info};

pub use fs::{MemoryFs, OutputFs, PhysicalFs};
pub use render::{ident, render, ty_str};

/// Why nothing was written.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("refusing to emit: {errors} error(s), {warnings} warning(s)")]
    Diagnostics { errors: usize, warnings: usize },

    #[error("failed to write `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What was written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitReport {
    pub path: PathBuf,
    pub bytes: usize,
    /// Declarations in the container.
    pub decls: usize,
}

/// Render `unit` and write it under `out`.
///
/// `diagnostics` is everything reported for the run so far; any error among
/// them aborts before rendering. The unit is consumed and dropped here.
#[tracing::instrument(level = "debug", skip_all, fields(file = %unit.file_name))]
pub fn emit(
    unit: GeneratedUnit,
    diagnostics: &[Diagnostic],
    out: &mut dyn OutputFs,
) -> Result<EmitReport, EmitError> {
    let tally = Tally::of(diagnostics);
    if tally.has_errors() {
        debug!(errors = tally.errors, "emission refused");
        return Err(EmitError::Diagnostics {
            errors: tally.errors,
            warnings: tally.warnings,
        });
    }

    let rel = Path::new(&unit.file_name);
    let path = out.display_path(rel);
    if !out.exists() {
        return Err(EmitError::Io {
            path,
            source: io::Error::new(
                io::ErrorKind::NotFound,
                "destination directory does not exist",
            ),
        });
    }

    let text = render(&unit);
    let decls = unit.container().map_or(0, |c| c.decls.len());
    out.write_atomic(rel, text.as_bytes())
        .map_err(|source| EmitError::Io {
            path: path.clone(),
            source,
        })?;

    info!(path = %path.display(), bytes = text.len(), decls, "bindings written");
    Ok(EmitReport {
        path,
        bytes: text.len(),
        decls,
    })
}
