//! JSON Emitter
//!
//! Buffers a run's diagnostics and writes them as a single JSON document
//! on [`flush`](DiagnosticEmitter::flush).

use std::io::Write;

use serde::Serialize;

use crate::{Diagnostic, Label};

use super::DiagnosticEmitter;

#[derive(Serialize)]
struct DiagnosticJson {
    severity: &'static str,
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<LabelJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    help: Vec<String>,
}

#[derive(Serialize)]
struct LabelJson {
    start: u32,
    end: u32,
    message: String,
}

#[derive(Serialize)]
struct ReportJson<'a> {
    success: bool,
    error_count: usize,
    warning_count: usize,
    diagnostics: &'a [DiagnosticJson],
}

impl From<&Diagnostic> for DiagnosticJson {
    fn from(diag: &Diagnostic) -> Self {
        DiagnosticJson {
            severity: diag.severity.as_str(),
            code: diag.code.as_str(),
            message: diag.message.clone(),
            file: diag.location.as_ref().map(|l| l.path.clone()),
            line: diag.location.as_ref().map(|l| l.line),
            column: diag.location.as_ref().map(|l| l.column),
            labels: diag.labels.iter().map(LabelJson::from).collect(),
            notes: diag.notes.clone(),
            help: diag.suggestions.clone(),
        }
    }
}

impl From<&Label> for LabelJson {
    fn from(label: &Label) -> Self {
        LabelJson {
            start: label.span.start,
            end: label.span.end,
            message: label.message.clone(),
        }
    }
}

/// JSON emitter for machine-readable output.
pub struct JsonEmitter<W: Write> {
    writer: W,
    pending: Vec<DiagnosticJson>,
    counts: Option<(usize, usize)>,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        JsonEmitter {
            writer,
            pending: Vec::new(),
            counts: None,
        }
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        self.pending.push(DiagnosticJson::from(diagnostic));
    }

    fn flush(&mut self) {
        if self.pending.is_empty() && self.counts.is_none() {
            return;
        }
        let (error_count, warning_count) = self.counts.take().unwrap_or_else(|| {
            let errors = self.pending.iter().filter(|d| d.severity == "error").count();
            let warnings = self.pending.iter().filter(|d| d.severity == "warning").count();
            (errors, warnings)
        });
        let report = ReportJson {
            success: error_count == 0,
            error_count,
            warning_count,
            diagnostics: &self.pending,
        };
        let rendered = serde_json::to_string_pretty(&report).unwrap_or_else(|_| {
            format!(r#"{{"success":{},"error_count":{error_count}}}"#, error_count == 0)
        });
        let _ = writeln!(self.writer, "{rendered}");
        let _ = self.writer.flush();
        self.pending.clear();
    }

    fn emit_summary(&mut self, error_count: usize, warning_count: usize) {
        self.counts = Some((error_count, warning_count));
    }
}
