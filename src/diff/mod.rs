//! Parsing of `git diff` output into plain file/hunk/line records.
//!
//! The records here carry no selection or presentation state; [`crate::tree`]
//! decorates them into the interactive commit tree.

use error_set::error_set;

pub mod file;
pub mod full;
pub mod hunk;

pub use file::FileDiff;
pub use full::Patch;
pub use hunk::{DiffLine, Fragment, NO_NEWLINE_MARKER, Op};

error_set! {
    /// Errors from parsing unified diff text. Line numbers are 1-based.
    ParseError := {
        /// An `@@` line that does not have the `@@ -a,b +c,d @@` shape
        #[display("line {line}: invalid hunk header '{text}'")]
        InvalidHunkHeader { line: usize, text: String },
        /// A line inside a hunk body that is not context, addition or deletion,
        /// or one that exceeds the header's line counts
        #[display("line {line}: unexpected '{text}' inside hunk")]
        UnexpectedLine { line: usize, text: String },
        /// Input ended before the hunk body matched its header's line counts
        #[display("line {line}: hunk ends before its header's line counts are met")]
        TruncatedHunk { line: usize },
        /// A `\ No newline at end of file` marker with no line before it
        #[display("line {line}: 'No newline at end of file' marker without a preceding line")]
        OrphanedNewlineMarker { line: usize },
        /// A file mode that is not an octal number
        #[display("line {line}: invalid file mode '{text}'")]
        InvalidMode { line: usize, text: String },
        /// A path that could not be decoded, such as an unterminated quoted name
        #[display("line {line}: invalid path '{text}'")]
        InvalidPath { line: usize, text: String },
    }
}

/// Line cursor over diff text that keeps line breaks and 1-based numbering.
pub(crate) struct LineReader<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineReader<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            lines: text.split_inclusive('\n').collect(),
            pos: 0,
        }
    }

    /// The next line and its number, without consuming it.
    pub(crate) fn peek(&self) -> Option<(usize, &'a str)> {
        self.peek_nth(0)
    }

    pub(crate) fn peek_nth(&self, n: usize) -> Option<(usize, &'a str)> {
        self.lines
            .get(self.pos + n)
            .map(|line| (self.pos + n + 1, *line))
    }

    /// Number of the line that would be read next (one past the end at EOF).
    pub(crate) fn line_number(&self) -> usize {
        self.pos + 1
    }
}

impl<'a> Iterator for LineReader<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.peek()?;
        self.pos += 1;
        Some(item)
    }
}
