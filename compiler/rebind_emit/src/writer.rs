//! Indented line writer for generated source.

/// Accumulates output lines at the current indentation.
pub(crate) struct SourceWriter {
    /// Current indentation level.
    indent: usize,
    output: String,
}

impl SourceWriter {
    pub(crate) fn new() -> Self {
        SourceWriter {
            indent: 0,
            output: String::with_capacity(16 * 1024),
        }
    }

    pub(crate) fn indent(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn dedent(&mut self) {
        debug_assert!(self.indent > 0, "dedent called with zero indent");
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write a line with indentation and newline.
    pub(crate) fn writeln(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
        self.output.push_str(s);
        self.output.push('\n');
    }

    /// One `///` line per line of `doc`.
    pub(crate) fn doc(&mut self, doc: Option<&str>) {
        for line in doc.into_iter().flat_map(str::lines) {
            let line = line.trim_end();
            if line.is_empty() {
                self.writeln("///");
            } else {
                self.writeln(&format!("/// {line}"));
            }
        }
    }

    pub(crate) fn newline(&mut self) {
        self.output.push('\n');
    }

    pub(crate) fn finish(self) -> String {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_indent_dedent() {
        let mut w = SourceWriter::new();
        w.writeln("extern \"C\" {");
        w.indent();
        w.doc(Some("Close.\n\nSee also dial."));
        w.writeln("pub fn nng_close(s: nng_socket) -> c_int;");
        w.dedent();
        w.writeln("}");
        w.newline();
        assert_eq!(
            w.finish(),
            "extern \"C\" {\n    /// Close.\n    ///\n    /// See also dial.\n    \
             pub fn nng_close(s: nng_socket) -> c_int;\n}\n\n"
        );
    }

    #[test]
    fn test_no_doc_writes_nothing() {
        let mut w = SourceWriter::new();
        w.doc(None);
        assert_eq!(w.finish(), "");
    }
}
