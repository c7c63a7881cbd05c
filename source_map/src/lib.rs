//! Source mapping utilities for IDL libraries
//!
//! Every raw declaration handed to the flattening stage carries a `SourceSpan`.
//! This crate owns the files those spans point into and renders spans as
//! `file:line:col` for diagnostics that cite a previous occurrence.

use std::collections::HashMap;
use std::fmt;

/// Represents a position in source code (1-based line and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize, byte_offset: usize) -> Self {
        Self {
            line,
            column,
            byte_offset,
        }
    }
}

/// Represents a span of source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
    pub file_id: FileId,
}

impl SourceSpan {
    pub fn new(start: SourcePosition, end: SourcePosition, file_id: FileId) -> Self {
        Self {
            start,
            end,
            file_id,
        }
    }

    pub fn single_position(pos: SourcePosition, file_id: FileId) -> Self {
        Self {
            start: pos,
            end: SourcePosition::new(pos.line, pos.column + 1, pos.byte_offset + 1),
            file_id,
        }
    }

    /// Merge two spans of the same file into the smallest span covering both
    pub fn merge(self, other: SourceSpan) -> SourceSpan {
        assert_eq!(
            self.file_id, other.file_id,
            "Cannot merge spans from different files"
        );

        let start = if self.start.byte_offset <= other.start.byte_offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.byte_offset >= other.end.byte_offset {
            self.end
        } else {
            other.end
        };

        SourceSpan::new(start, end, self.file_id)
    }

    pub fn len(&self) -> usize {
        self.end.byte_offset.saturating_sub(self.start.byte_offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unique identifier for a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(usize);

impl FileId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

/// A single `.fidl`-style source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
    pub line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: String, content: String) -> Self {
        let line_starts = compute_line_starts(&content);
        Self {
            name,
            content,
            line_starts,
        }
    }

    /// Get a specific line (1-based)
    pub fn get_line(&self, line_number: usize) -> Option<&str> {
        if line_number == 0 || line_number > self.line_starts.len() {
            return None;
        }

        let start = self.line_starts[line_number - 1];
        let end = if line_number < self.line_starts.len() {
            self.line_starts[line_number]
        } else {
            self.content.len()
        };

        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Convert a byte offset to line and column (1-based)
    pub fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };

        let line_start = self.line_starts.get(line_index).copied().unwrap_or(0);
        (line_index + 1, offset - line_start + 1)
    }

    pub fn offset_to_position(&self, offset: usize) -> SourcePosition {
        let (line, column) = self.offset_to_line_col(offset);
        SourcePosition::new(line, column, offset)
    }

    /// The text covered by `span`, if it lies inside this file
    pub fn slice(&self, span: &SourceSpan) -> Option<&str> {
        self.content
            .get(span.start.byte_offset..span.end.byte_offset)
    }
}

/// Registry of every file contributing to a compilation
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: HashMap<FileId, SourceFile>,
    next_id: usize,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source file and return its FileId
    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<String>) -> FileId {
        let file_id = FileId(self.next_id);
        self.next_id += 1;
        self.files
            .insert(file_id, SourceFile::new(name.into(), content.into()));
        file_id
    }

    pub fn get_file(&self, file_id: FileId) -> Option<&SourceFile> {
        self.files.get(&file_id)
    }

    /// Get a specific line from a file (1-based line numbers)
    pub fn get_line(&self, file_id: FileId, line_number: usize) -> Option<&str> {
        self.get_file(file_id)?.get_line(line_number)
    }

    pub fn file_name(&self, file_id: FileId) -> Option<&str> {
        self.get_file(file_id).map(|file| file.name.as_str())
    }

    /// Create a SourceSpan from file, start offset, and end offset
    pub fn span_from_offsets(
        &self,
        file_id: FileId,
        start: usize,
        end: usize,
    ) -> Option<SourceSpan> {
        let file = self.get_file(file_id)?;
        Some(SourceSpan::new(
            file.offset_to_position(start),
            file.offset_to_position(end),
            file_id,
        ))
    }

    /// Source text covered by a span
    pub fn span_text(&self, span: &SourceSpan) -> Option<&str> {
        self.get_file(span.file_id)?.slice(span)
    }

    /// Render a span as `file:line:col`. Unknown files fall back to the file id.
    pub fn position_str(&self, span: &SourceSpan) -> String {
        match self.file_name(span.file_id) {
            Some(name) => format!("{}:{}:{}", name, span.start.line, span.start.column),
            None => format!(
                "{}:{}:{}",
                span.file_id, span.start.line, span.start.column
            ),
        }
    }

    pub fn file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        self.files.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut line_starts = vec![0];
    for (i, ch) in source.char_indices() {
        if ch == '\n' {
            line_starts.push(i + 1);
        }
    }
    line_starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_map_basic() {
        let mut source_map = SourceMap::new();
        let file_id = source_map.add_file("test.fidl", "library a;\nstruct S {};\n");

        assert_eq!(source_map.get_line(file_id, 1), Some("library a;"));
        assert_eq!(source_map.get_line(file_id, 2), Some("struct S {};"));
        assert_eq!(source_map.get_line(file_id, 4), None);
    }

    #[test]
    fn test_offset_to_line_col() {
        let mut source_map = SourceMap::new();
        let file_id = source_map.add_file("test.fidl", "hello\nworld\ntest");
        let file = source_map.get_file(file_id).unwrap();

        assert_eq!(file.offset_to_line_col(0), (1, 1));
        assert_eq!(file.offset_to_line_col(4), (1, 5));
        assert_eq!(file.offset_to_line_col(6), (2, 1));
        assert_eq!(file.offset_to_line_col(12), (3, 1));
    }

    #[test]
    fn test_position_str_and_span_text() {
        let mut source_map = SourceMap::new();
        let file_id = source_map.add_file("lib.fidl", "library a;\nconst uint8 X = 1;");
        let span = source_map.span_from_offsets(file_id, 23, 24).unwrap();

        assert_eq!(source_map.position_str(&span), "lib.fidl:2:13");
        assert_eq!(source_map.span_text(&span), Some("X"));
    }

    #[test]
    fn test_position_str_unknown_file() {
        let source_map = SourceMap::new();
        let span = SourceSpan::single_position(SourcePosition::new(3, 4, 10), FileId::new(7));
        assert_eq!(source_map.position_str(&span), "FileId(7):3:4");
    }

    #[test]
    fn test_source_span_merge() {
        let file_id = FileId::new(0);
        let span1 = SourceSpan::new(
            SourcePosition::new(1, 1, 0),
            SourcePosition::new(1, 5, 4),
            file_id,
        );
        let span2 = SourceSpan::new(
            SourcePosition::new(1, 3, 2),
            SourcePosition::new(1, 8, 7),
            file_id,
        );

        let merged = span1.merge(span2);
        assert_eq!(merged.start.byte_offset, 0);
        assert_eq!(merged.end.byte_offset, 7);
        assert_eq!(merged.len(), 7);
    }
}
