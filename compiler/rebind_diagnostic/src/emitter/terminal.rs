//! Terminal Emitter
//!
//! Human-readable diagnostic output with optional ANSI color support.

use std::fmt;
use std::io::{self, Write};

use crate::{Diagnostic, Severity};

use super::DiagnosticEmitter;

/// Color output mode for terminal emitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Color when the output is a TTY.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// `is_tty` only matters for `Auto`.
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

impl std::str::FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ColorMode::Auto),
            "always" => Ok(ColorMode::Always),
            "never" => Ok(ColorMode::Never),
            other => Err(format!(
                "unknown color mode `{other}` (expected `auto`, `always` or `never`)"
            )),
        }
    }
}

#[derive(Clone, Copy)]
enum Role {
    Error,
    Warning,
    Emphasis,
    Location,
    Help,
}

impl Role {
    fn ansi(self) -> &'static str {
        match self {
            Role::Error => "\x1b[1;31m",
            Role::Warning => "\x1b[1;33m",
            Role::Emphasis => "\x1b[1m",
            Role::Location => "\x1b[1;34m",
            Role::Help => "\x1b[1;32m",
        }
    }

    fn of(severity: Severity) -> Self {
        match severity {
            Severity::Error => Role::Error,
            Severity::Warning => Role::Warning,
        }
    }
}

/// Text wrapped in the escape for its role, or left bare.
struct Painted<T> {
    text: T,
    role: Option<Role>,
}

impl<T: fmt::Display> fmt::Display for Painted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Some(role) => write!(f, "{}{}\x1b[0m", role.ansi(), self.text),
            None => write!(f, "{}", self.text),
        }
    }
}

/// Paints text when color is enabled.
#[derive(Clone, Copy)]
struct Palette {
    colors: bool,
}

impl Palette {
    fn paint<T: fmt::Display>(self, text: T, role: Role) -> Painted<T> {
        Painted {
            text,
            role: self.colors.then_some(role),
        }
    }
}

fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Terminal emitter with optional color support.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    palette: Palette,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn with_color_mode(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter {
            writer,
            palette: Palette {
                colors: mode.should_use_colors(is_tty),
            },
        }
    }

    fn render(&mut self, diagnostic: &Diagnostic) -> io::Result<()> {
        let palette = self.palette;
        let tone = Role::of(diagnostic.severity);
        writeln!(
            self.writer,
            "{}{}: {}",
            palette.paint(diagnostic.severity, tone),
            palette.paint(format!("[{}]", diagnostic.code), Role::Emphasis),
            diagnostic.message
        )?;
        if let Some(location) = &diagnostic.location {
            writeln!(self.writer, "  --> {}", palette.paint(location, Role::Location))?;
        }
        for label in &diagnostic.labels {
            writeln!(
                self.writer,
                "   | {}",
                palette.paint(&label.message, tone)
            )?;
        }
        for note in &diagnostic.notes {
            writeln!(self.writer, "   = {}: {note}", palette.paint("note", Role::Emphasis))?;
        }
        for suggestion in &diagnostic.suggestions {
            writeln!(self.writer, "   = {}: {suggestion}", palette.paint("help", Role::Help))?;
        }
        writeln!(self.writer)
    }
}

impl TerminalEmitter<io::Stderr> {
    /// Diagnostics go to stderr; stdout stays free for `--dry-run` output.
    pub fn stderr(mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter::with_color_mode(io::stderr(), mode, is_tty)
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        // A closed stderr leaves nowhere to report the failure.
        let _ = self.render(diagnostic);
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }

    fn emit_summary(&mut self, error_count: usize, warning_count: usize) {
        let palette = self.palette;
        let line = match (error_count, warning_count) {
            (0, 0) => return,
            (0, w) => format!("{}: {}", palette.paint("warning", Role::Warning), count(w, "warning")),
            (e, 0) => format!(
                "{}: generation failed with {}",
                palette.paint("error", Role::Error),
                count(e, "error")
            ),
            (e, w) => format!(
                "{}: generation failed with {} and {}",
                palette.paint("error", Role::Error),
                count(e, "error"),
                count(w, "warning")
            ),
        };
        let _ = writeln!(self.writer, "{line}");
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
