use super::walk::{Flow, Scope, Visitor, VisitorMut};
use super::{Chunk, ChunkId, Commit, File, FileId, Line, LineId, Node};
use crate::diff::Op;
use std::convert::Infallible;
use std::fmt;

/// Whether a node's content goes into the output patch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Selection {
    #[default]
    Selected,
    /// Some but not all descendants are selected. Only ever derived, never set.
    Partial,
    Deselected,
}

impl Selection {
    /// The state a toggle moves to: anything selected becomes deselected.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Selection::Selected | Selection::Partial => Selection::Deselected,
            Selection::Deselected => Selection::Selected,
        }
    }

    /// Derive a parent state from how many of `total` children are fully
    /// and partially selected.
    fn derive(selected: usize, partial: usize, total: usize) -> Self {
        if selected == total {
            Selection::Selected
        } else if selected > 0 || partial > 0 {
            Selection::Partial
        } else {
            Selection::Deselected
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Selection::Selected => "[*]",
            Selection::Partial => "[~]",
            Selection::Deselected => "[ ]",
        })
    }
}

/// Assigns one state to every node a walk reaches.
struct Assign(Selection);

impl VisitorMut for Assign {
    type Error = Infallible;

    fn file(&mut self, _: FileId, file: &mut File) -> Result<Flow, Infallible> {
        file.selection = self.0;
        Ok(Flow::Continue)
    }

    fn chunk(&mut self, _: ChunkId, _: &File, chunk: &mut Chunk) -> Result<Flow, Infallible> {
        chunk.selection = self.0;
        Ok(Flow::Continue)
    }

    fn line(&mut self, _: LineId, _: &Chunk, line: &mut Line) -> Result<Flow, Infallible> {
        line.selection = self.0;
        Ok(Flow::Continue)
    }
}

/// Counts selected and partially selected children one level down.
#[derive(Default)]
struct Tally {
    selected: usize,
    partial: usize,
}

impl Tally {
    fn count(&mut self, selection: Selection) {
        match selection {
            Selection::Selected => self.selected += 1,
            Selection::Partial => self.partial += 1,
            Selection::Deselected => {}
        }
    }
}

impl Visitor for Tally {
    type Error = Infallible;

    fn chunk(&mut self, _: ChunkId, _: &File, chunk: &Chunk) -> Result<Flow, Infallible> {
        self.count(chunk.selection);
        Ok(Flow::SkipChildren)
    }

    fn line(&mut self, _: LineId, _: &Chunk, line: &Line) -> Result<Flow, Infallible> {
        if line.op != Op::Context {
            self.count(line.selection);
        }
        Ok(Flow::Continue)
    }
}

impl Commit {
    /// Flip the node under the cursor and restore the tri-state invariant.
    ///
    /// Context lines are not selectable and are left alone.
    pub fn toggle(&mut self, node: Node) {
        let next = self.selection(node).toggled();
        match node {
            Node::Line(id) if self.lines[id.0].op == Op::Context => {}
            _ => self.set_selection(node, next),
        }
    }

    /// Set a node to `Selected` or `Deselected`, cascading to descendants and
    /// re-deriving every ancestor.
    ///
    /// # Panics
    ///
    /// Panics if `state` is [`Selection::Partial`]; partial selection is only
    /// ever derived from children.
    pub fn set_selection(&mut self, node: Node, state: Selection) {
        assert_ne!(
            state,
            Selection::Partial,
            "Partial is not a valid explicit selection"
        );
        tracing::debug!(?node, ?state, "set selection");
        self.invalidate_index();

        match node {
            Node::File(id) => {
                self.files[id.0].selection = state;
                self.assign(Scope::File(id), state);
            }
            Node::Chunk(id) => {
                self.chunks[id.0].selection = state;
                self.assign(Scope::Chunk(id), state);
                self.update_file_selection(self.chunks[id.0].file);
            }
            Node::Line(id) => {
                self.lines[id.0].selection = state;
                self.update_chunk_selection(self.lines[id.0].chunk);
            }
        }
    }

    /// Select every file, chunk and line.
    pub fn select_all(&mut self) {
        self.invalidate_index();
        self.assign(Scope::All, Selection::Selected);
    }

    /// Deselect every file, chunk and line.
    pub fn select_none(&mut self) {
        self.invalidate_index();
        self.assign(Scope::All, Selection::Deselected);
    }

    fn assign(&mut self, scope: Scope, state: Selection) {
        let Ok(_) = self.walk_mut(scope, &mut Assign(state));
    }

    /// Re-derive a chunk from its non-context lines, then its file.
    fn update_chunk_selection(&mut self, id: ChunkId) {
        let mut tally = Tally::default();
        let Ok(_) = self.walk(Scope::Chunk(id), &mut tally);

        let chunk = &mut self.chunks[id.0];
        chunk.selection = Selection::derive(tally.selected, tally.partial, chunk.change_count);
        let file = chunk.file;
        self.update_file_selection(file);
    }

    /// Re-derive a file from its chunks.
    fn update_file_selection(&mut self, id: FileId) {
        let mut tally = Tally::default();
        let Ok(_) = self.walk(Scope::File(id), &mut tally);

        let file = &mut self.files[id.0];
        file.selection = Selection::derive(tally.selected, tally.partial, file.chunks.len());
    }
}
