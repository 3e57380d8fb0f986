//! C header front end for the binding generator.
//!
//! Turns a directory of C headers into a flat, ordered list of
//! declarations ([`HeaderSet`]). Files are processed in relative-path order
//! and share one macro table and one enumerator table, so a definition in
//! an earlier file is visible in later ones just as it would be through
//! `#include`.
//!
//! # Pipeline
//!
//! ```text
//! source ──lex──▶ tokens ──preprocess──▶ active tokens ──parse──▶ items
//!                  (logos)      (#if, #define)            (declarations)
//! ```
//!
//! Problems never stop the pass: they become [`Diagnostic`]s with a
//! resolved `path:line:column`, and parsing resumes at the next
//! declaration.

pub mod eval;
mod layout;
pub mod lexer;
mod parser;
pub mod preprocess;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rebind_diagnostic::span_utils::LineOffsetTable;
use rebind_diagnostic::{Diagnostic, SourceLocation};
use rebind_ir::ast::{Item, Origin};
use rebind_ir::{FileId, Span};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

pub use parser::parse_type_name;
use preprocess::Preprocessor;

/// A header that contributed to a [`HeaderSet`].
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub id: FileId,
    /// Path relative to the source root, `/`-separated.
    pub path: String,
    source: String,
    lines: LineOffsetTable,
}

impl SourceFile {
    pub fn locate(&self, span: Span) -> SourceLocation {
        self.lines.locate(&self.path, &self.source, span)
    }
}

/// Options for reading a header tree.
#[derive(Clone, Debug, Default)]
pub struct HeaderOptions {
    /// Macros defined before the first file, as with `-D`.
    pub defines: Vec<(String, Option<String>)>,
    /// Files whose relative path contains any of these are skipped.
    pub exclude: Vec<String>,
}

impl HeaderOptions {
    fn excludes(&self, rel: &str) -> bool {
        self.exclude
            .iter()
            .any(|fragment| !fragment.is_empty() && rel.contains(fragment.as_str()))
    }
}

/// Every declaration found in a header tree.
#[derive(Clone, Debug, Default)]
pub struct HeaderSet {
    pub files: Vec<SourceFile>,
    /// In file order, then declaration order.
    pub items: Vec<Item>,
    pub diagnostics: Vec<Diagnostic>,
}

impl HeaderSet {
    pub fn path(&self, file: FileId) -> Option<&str> {
        self.files.get(file.index()).map(|f| f.path.as_str())
    }

    /// Resolve an item origin to `path:line:column`.
    pub fn locate(&self, origin: Origin) -> Option<SourceLocation> {
        self.files
            .get(origin.file.index())
            .map(|f| f.locate(origin.span))
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Incremental builder for a [`HeaderSet`].
///
/// Feed files in the order they should be seen, then call
/// [`HeaderParser::finish`].
pub struct HeaderParser {
    preprocessor: Preprocessor,
    scope: parser::Scope,
    set: HeaderSet,
}

impl HeaderParser {
    pub fn new(options: &HeaderOptions) -> Self {
        let mut preprocessor = Preprocessor::new();
        for (name, value) in &options.defines {
            preprocessor.define(name, value.as_deref());
        }
        HeaderParser {
            preprocessor,
            scope: parser::Scope::default(),
            set: HeaderSet::default(),
        }
    }

    /// Parse one header. `path` is only used for reporting.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn parse_source(&mut self, path: &str, source: &str) -> FileId {
        let id = FileId(u32::try_from(self.set.files.len()).unwrap_or(u32::MAX));

        let lexed = lexer::lex(source);
        let pre = self.preprocessor.process(id, source, &lexed.tokens);
        let (items, parse_diagnostics) = parser::parse_file(id, &pre, &mut self.scope);
        debug!(
            tokens = pre.tokens.len(),
            items = items.len(),
            macros = pre.macros.len(),
            "parsed header"
        );

        let file = SourceFile {
            id,
            path: path.to_string(),
            source: source.to_string(),
            lines: LineOffsetTable::build(source),
        };
        let diagnostics = lexed
            .errors
            .into_iter()
            .chain(pre.diagnostics)
            .chain(parse_diagnostics)
            .map(|diag| match (diag.location.is_none(), diag.primary_span()) {
                (true, Some(span)) => {
                    let location = file.locate(span);
                    diag.with_location(location)
                }
                _ => diag,
            })
            .collect::<Vec<_>>();

        self.set.files.push(file);
        self.set.items.extend(items);
        self.set.diagnostics.extend(diagnostics);
        id
    }

    /// Drop forward declarations made redundant by a full definition, and
    /// repeated declarations of the same aggregate. Macro values are
    /// recomputed against the table every file has contributed to.
    pub fn finish(self) -> HeaderSet {
        let mut set = self.set;
        for item in &mut set.items {
            if let Item::Macro(decl) = item {
                decl.value = self.preprocessor.macro_value(decl);
            }
        }
        let defined: FxHashSet<String> = set
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Struct(s) if s.fields.is_some() => Some(s.name.clone()),
                _ => None,
            })
            .collect();

        let mut seen = FxHashSet::default();
        set.items.retain(|item| {
            let Item::Struct(s) = item else {
                return true;
            };
            if s.fields.is_none() && defined.contains(&s.name) {
                trace!(name = %s.name, "forward declaration superseded");
                return false;
            }
            seen.insert(s.name.clone())
        });
        set
    }
}

/// Read every `*.h` under `root`, recursively, in relative-path order.
#[tracing::instrument(level = "debug", skip_all, fields(root = %root.display()))]
pub fn load_dir(root: &Path, options: &HeaderOptions) -> io::Result<HeaderSet> {
    let mut headers = Vec::new();
    collect_headers(root, root, &mut headers)?;
    headers.sort();

    let mut parser = HeaderParser::new(options);
    for (rel, path) in headers {
        if options.excludes(&rel) {
            debug!(path = %rel, "excluded");
            continue;
        }
        let bytes = fs::read(&path)?;
        let source = String::from_utf8_lossy(&bytes);
        parser.parse_source(&rel, &source);
    }

    let set = parser.finish();
    debug!(
        files = set.files.len(),
        items = set.items.len(),
        diagnostics = set.diagnostics.len(),
        "headers loaded"
    );
    Ok(set)
}

fn collect_headers(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_headers(root, &path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "h") {
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push((rel, path));
        }
    }
    Ok(())
}
