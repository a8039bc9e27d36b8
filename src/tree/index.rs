use super::{Commit, Node};
use error_set::error_set;

error_set! {
    /// Errors from mapping screen rows back to tree nodes.
    TreeError := {
        /// The tree changed since it was last rendered
        #[display("line index is stale; render the tree before looking up rows")]
        StaleLineIndex,
        #[display("row {row} is outside the rendered listing of {rows} rows")]
        RowOutOfRange { row: usize, rows: usize },
    }
}

/// Which node each rendered row shows, in row order.
///
/// A line that lacks a trailing newline is followed by a marker row that maps
/// back to the same line, so a line may occupy two rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    rows: Vec<Node>,
    valid: bool,
}

impl LineIndex {
    pub(super) fn from_rows(rows: Vec<Node>) -> Self {
        Self { rows, valid: true }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn node_at(&self, row: usize) -> Option<Node> {
        self.rows.get(row).copied()
    }

    /// First row showing `node`, if it is visible.
    pub fn row_of(&self, node: Node) -> Option<usize> {
        self.rows.iter().position(|n| *n == node)
    }
}

impl Commit {
    /// Mark the listing out of date. Every selection or expansion change
    /// does this.
    pub fn invalidate_index(&mut self) {
        self.line_index.valid = false;
    }

    /// The row map of the last render.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleLineIndex`] if the tree changed since then.
    pub fn line_index(&self) -> Result<&LineIndex, TreeError> {
        if self.line_index.valid {
            Ok(&self.line_index)
        } else {
            Err(TreeError::StaleLineIndex)
        }
    }

    /// Node shown on `row` of the last render.
    ///
    /// # Errors
    ///
    /// Fails if the index is stale or the row does not exist.
    pub fn node_at(&self, row: usize) -> Result<Node, TreeError> {
        let index = self.line_index()?;
        index.node_at(row).ok_or(TreeError::RowOutOfRange {
            row,
            rows: index.len(),
        })
    }

    /// First row showing `node` in the last render, or `None` if it is
    /// hidden under a collapsed parent.
    ///
    /// # Errors
    ///
    /// Fails if the index is stale.
    pub fn row_of(&self, node: Node) -> Result<Option<usize>, TreeError> {
        Ok(self.line_index()?.row_of(node))
    }
}
