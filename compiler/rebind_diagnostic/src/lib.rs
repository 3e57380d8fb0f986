//! Diagnostics for the binding generator.
//!
//! Every phase reports problems as [`Diagnostic`] values instead of
//! failing fast, so a single run surfaces everything wrong with the
//! headers and the rule set at once:
//! - Error codes for searchability
//! - A source location (file, line, column) when one is known
//! - Context labels and notes
//!
//! The driver decides what to do with them. Any error-severity
//! diagnostic blocks emission; warnings never do.

mod diagnostic;
pub mod emitter;
mod error_code;
pub mod span_utils;

pub use diagnostic::{
    internal_error, unexpected_token, Diagnostic, Label, Severity, SourceLocation, Tally,
};
pub use error_code::ErrorCode;
