use super::walk::{Flow, Scope, VisitorMut};
use super::{Chunk, ChunkId, Commit, File, FileId, Node};
use std::convert::Infallible;
use std::fmt;

/// Whether a file or chunk shows its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Expansion {
    #[default]
    Collapsed,
    Expanded,
}

impl fmt::Display for Expansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Expansion::Collapsed => "(+)",
            Expansion::Expanded => "(-)",
        })
    }
}

/// Sets every file and chunk to one state without touching lines.
struct SetAll(Expansion);

impl VisitorMut for SetAll {
    type Error = Infallible;

    fn file(&mut self, _: FileId, file: &mut File) -> Result<Flow, Infallible> {
        file.expansion = self.0;
        Ok(Flow::Continue)
    }

    fn chunk(&mut self, _: ChunkId, _: &File, chunk: &mut Chunk) -> Result<Flow, Infallible> {
        chunk.expansion = self.0;
        Ok(Flow::SkipChildren)
    }
}

impl Commit {
    /// Expansion of a file or chunk; lines have none.
    pub fn expansion(&self, node: Node) -> Option<Expansion> {
        match node {
            Node::File(id) => Some(self.files[id.0].expansion),
            Node::Chunk(id) => Some(self.chunks[id.0].expansion),
            Node::Line(_) => None,
        }
    }

    /// Set the expansion of a file or chunk. Returns false, changing
    /// nothing, for a line.
    pub fn set_expansion(&mut self, node: Node, state: Expansion) -> bool {
        let target = match node {
            Node::File(id) => &mut self.files[id.0].expansion,
            Node::Chunk(id) => &mut self.chunks[id.0].expansion,
            Node::Line(_) => return false,
        };
        *target = state;
        self.invalidate_index();
        true
    }

    pub fn expand_all(&mut self) {
        self.set_all(Expansion::Expanded);
    }

    pub fn collapse_all(&mut self) {
        self.set_all(Expansion::Collapsed);
    }

    fn set_all(&mut self, state: Expansion) {
        self.invalidate_index();
        let Ok(_) = self.walk_mut(Scope::All, &mut SetAll(state));
    }
}
