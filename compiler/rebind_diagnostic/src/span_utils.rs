//! Line/column lookup for header diagnostics.
//!
//! The header front end works in byte offsets; diagnostics are reported
//! as `path:line:column`. Build one [`LineOffsetTable`] per file and reuse
//! it for every diagnostic raised in that file.

use rebind_ir::Span;

use crate::SourceLocation;

/// Byte offset of each line start, for O(log L) lookups.
///
/// ```
/// use rebind_diagnostic::span_utils::LineOffsetTable;
///
/// let source = "#define A 1\n#define B 2\n";
/// let table = LineOffsetTable::build(source);
///
/// assert_eq!(table.offset_to_line_col(source, 0), (1, 1));
/// assert_eq!(table.offset_to_line_col(source, 20), (2, 9));
/// ```
#[derive(Clone, Debug, Default)]
pub struct LineOffsetTable {
    /// offsets[0] = 0; offsets[n] = byte after the n-th newline.
    offsets: Vec<u32>,
}

impl LineOffsetTable {
    pub fn build(source: &str) -> Self {
        let mut offsets = vec![0u32];
        offsets.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, byte)| byte == b'\n')
                .map(|(i, _)| u32::try_from(i + 1).unwrap_or(u32::MAX)),
        );
        LineOffsetTable { offsets }
    }

    /// 1-based line containing `offset`.
    pub fn line_from_offset(&self, offset: u32) -> u32 {
        let line_idx = match self.offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        u32::try_from(line_idx).unwrap_or(u32::MAX - 1) + 1
    }

    /// 1-based (line, column). Columns count characters, not bytes.
    pub fn offset_to_line_col(&self, source: &str, offset: u32) -> (u32, u32) {
        let line = self.line_from_offset(offset);
        let line_start = self
            .offsets
            .get((line - 1) as usize)
            .copied()
            .unwrap_or(0) as usize;
        let end = (offset as usize).min(source.len()).max(line_start);
        let col = source
            .get(line_start..end)
            .map_or(0, |text| text.chars().count());
        (line, u32::try_from(col).unwrap_or(u32::MAX - 1) + 1)
    }

    /// Resolve the start of `span` in the file at `path`.
    pub fn locate(&self, path: &str, source: &str, span: Span) -> SourceLocation {
        let (line, column) = self.offset_to_line_col(source, span.start);
        SourceLocation::new(path, line, column)
    }

    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }
}
