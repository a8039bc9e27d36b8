//! Depth-first traversal of the commit tree.
//!
//! Every component that needs to visit files, chunks and lines goes through
//! [`Commit::walk`] or [`Commit::walk_mut`]. Hooks steer the walk with a
//! [`Flow`]; failures travel separately through `Err`.

use super::{Chunk, ChunkId, Commit, File, FileId, Line, LineId};

/// How the walk proceeds after a hook returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Visit this node's children, then its next sibling.
    Continue,
    /// Do not descend into this node; move on to its next sibling.
    SkipChildren,
    /// Skip the rest of this level and resume at the parent's next sibling.
    SkipSiblings,
    /// Stop the whole walk.
    Abort,
}

/// Which part of the tree a walk covers. `File` and `Chunk` visit the
/// node's descendants, not the node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    File(FileId),
    Chunk(ChunkId),
}

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Completed,
    Aborted,
}

/// Read-only hooks, one per level. Unimplemented hooks continue.
pub trait Visitor {
    type Error;

    fn file(&mut self, _id: FileId, _file: &File) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn chunk(&mut self, _id: ChunkId, _file: &File, _chunk: &Chunk) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn line(&mut self, _id: LineId, _chunk: &Chunk, _line: &Line) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }
}

/// Mutating hooks. Each hook may modify the node it is given; parents are
/// only readable.
pub trait VisitorMut {
    type Error;

    fn file(&mut self, _id: FileId, _file: &mut File) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn chunk(
        &mut self,
        _id: ChunkId,
        _file: &File,
        _chunk: &mut Chunk,
    ) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn line(&mut self, _id: LineId, _chunk: &Chunk, _line: &mut Line) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }
}

/// What the enclosing level does after a hook.
enum Step {
    Descend,
    Next,
    Break,
    Abort,
}

impl From<Flow> for Step {
    fn from(flow: Flow) -> Self {
        match flow {
            Flow::Continue => Step::Descend,
            Flow::SkipChildren => Step::Next,
            Flow::SkipSiblings => Step::Break,
            Flow::Abort => Step::Abort,
        }
    }
}

impl Commit {
    /// Visit `scope` in document order.
    ///
    /// # Errors
    ///
    /// Returns the first error a hook returns; the walk stops there.
    pub fn walk<V: Visitor>(&self, scope: Scope, visitor: &mut V) -> Result<Walk, V::Error> {
        match scope {
            Scope::All => self.walk_files(visitor),
            Scope::File(id) => self.walk_chunks(id, visitor),
            Scope::Chunk(id) => self.walk_lines(id, visitor),
        }
    }

    /// Visit `scope` in document order with mutable access to each node.
    ///
    /// # Errors
    ///
    /// Returns the first error a hook returns; the walk stops there.
    pub fn walk_mut<V: VisitorMut>(
        &mut self,
        scope: Scope,
        visitor: &mut V,
    ) -> Result<Walk, V::Error> {
        match scope {
            Scope::All => self.walk_files_mut(visitor),
            Scope::File(id) => self.walk_chunks_mut(id, visitor),
            Scope::Chunk(id) => self.walk_lines_mut(id, visitor),
        }
    }

    fn walk_files<V: Visitor>(&self, visitor: &mut V) -> Result<Walk, V::Error> {
        for (index, file) in self.files.iter().enumerate() {
            let id = FileId(index);
            match visitor.file(id, file)?.into() {
                Step::Descend => {}
                Step::Next => continue,
                Step::Break => break,
                Step::Abort => return Ok(Walk::Aborted),
            }
            if self.walk_chunks(id, visitor)? == Walk::Aborted {
                return Ok(Walk::Aborted);
            }
        }
        Ok(Walk::Completed)
    }

    fn walk_chunks<V: Visitor>(&self, id: FileId, visitor: &mut V) -> Result<Walk, V::Error> {
        let file = &self.files[id.0];
        for index in file.chunks.clone() {
            let chunk_id = ChunkId(index);
            match visitor.chunk(chunk_id, file, &self.chunks[index])?.into() {
                Step::Descend => {}
                Step::Next => continue,
                Step::Break => break,
                Step::Abort => return Ok(Walk::Aborted),
            }
            if self.walk_lines(chunk_id, visitor)? == Walk::Aborted {
                return Ok(Walk::Aborted);
            }
        }
        Ok(Walk::Completed)
    }

    fn walk_lines<V: Visitor>(&self, id: ChunkId, visitor: &mut V) -> Result<Walk, V::Error> {
        let chunk = &self.chunks[id.0];
        for index in chunk.lines.clone() {
            match visitor.line(LineId(index), chunk, &self.lines[index])?.into() {
                Step::Descend | Step::Next => {}
                Step::Break => break,
                Step::Abort => return Ok(Walk::Aborted),
            }
        }
        Ok(Walk::Completed)
    }

    fn walk_files_mut<V: VisitorMut>(&mut self, visitor: &mut V) -> Result<Walk, V::Error> {
        for index in 0..self.files.len() {
            let id = FileId(index);
            match visitor.file(id, &mut self.files[index])?.into() {
                Step::Descend => {}
                Step::Next => continue,
                Step::Break => break,
                Step::Abort => return Ok(Walk::Aborted),
            }
            if self.walk_chunks_mut(id, visitor)? == Walk::Aborted {
                return Ok(Walk::Aborted);
            }
        }
        Ok(Walk::Completed)
    }

    fn walk_chunks_mut<V: VisitorMut>(
        &mut self,
        id: FileId,
        visitor: &mut V,
    ) -> Result<Walk, V::Error> {
        for index in self.files[id.0].chunks.clone() {
            let chunk_id = ChunkId(index);
            match visitor
                .chunk(chunk_id, &self.files[id.0], &mut self.chunks[index])?
                .into()
            {
                Step::Descend => {}
                Step::Next => continue,
                Step::Break => break,
                Step::Abort => return Ok(Walk::Aborted),
            }
            if self.walk_lines_mut(chunk_id, visitor)? == Walk::Aborted {
                return Ok(Walk::Aborted);
            }
        }
        Ok(Walk::Completed)
    }

    fn walk_lines_mut<V: VisitorMut>(
        &mut self,
        id: ChunkId,
        visitor: &mut V,
    ) -> Result<Walk, V::Error> {
        for index in self.chunks[id.0].lines.clone() {
            match visitor
                .line(LineId(index), &self.chunks[id.0], &mut self.lines[index])?
                .into()
            {
                Step::Descend | Step::Next => {}
                Step::Break => break,
                Step::Abort => return Ok(Walk::Aborted),
            }
        }
        Ok(Walk::Completed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tree::{Node, ParseOptions};
    use similar_asserts::assert_eq;
    use std::convert::Infallible;

    const DIFF: &str = "diff --git a/a b/a
--- a/a
+++ b/a
@@ -1 +1 @@
-a1
+a2
@@ -5 +5 @@
-a5
+a6
diff --git a/b b/b
--- a/b
+++ b/b
@@ -1 +1,2 @@
 b1
+b2
";

    fn commit() -> Commit {
        Commit::parse(DIFF, ParseOptions::default()).unwrap()
    }

    /// Records every visited node; `decide` picks the flow per node.
    struct Recorder<F> {
        seen: Vec<Node>,
        decide: F,
    }

    impl<F: FnMut(Node) -> Flow> Visitor for Recorder<F> {
        type Error = Infallible;

        fn file(&mut self, id: FileId, _: &File) -> Result<Flow, Infallible> {
            self.seen.push(Node::File(id));
            Ok((self.decide)(Node::File(id)))
        }

        fn chunk(&mut self, id: ChunkId, _: &File, _: &Chunk) -> Result<Flow, Infallible> {
            self.seen.push(Node::Chunk(id));
            Ok((self.decide)(Node::Chunk(id)))
        }

        fn line(&mut self, id: LineId, _: &Chunk, _: &Line) -> Result<Flow, Infallible> {
            self.seen.push(Node::Line(id));
            Ok((self.decide)(Node::Line(id)))
        }
    }

    fn record(
        commit: &Commit,
        scope: Scope,
        decide: impl FnMut(Node) -> Flow,
    ) -> (Vec<Node>, Walk) {
        let mut recorder = Recorder {
            seen: Vec::new(),
            decide,
        };
        let Ok(walk) = commit.walk(scope, &mut recorder);
        (recorder.seen, walk)
    }

    #[test]
    fn visits_in_document_order() {
        let commit = commit();
        let (seen, walk) = record(&commit, Scope::All, |_| Flow::Continue);

        assert_eq!(walk, Walk::Completed);
        assert_eq!(
            seen,
            vec![
                Node::File(FileId(0)),
                Node::Chunk(ChunkId(0)),
                Node::Line(LineId(0)),
                Node::Line(LineId(1)),
                Node::Chunk(ChunkId(1)),
                Node::Line(LineId(2)),
                Node::Line(LineId(3)),
                Node::File(FileId(1)),
                Node::Chunk(ChunkId(2)),
                Node::Line(LineId(4)),
                Node::Line(LineId(5)),
            ]
        );
    }

    #[test]
    fn skip_children_moves_to_next_sibling() {
        let commit = commit();
        let (seen, _) = record(&commit, Scope::All, |node| match node {
            Node::Chunk(ChunkId(0)) => Flow::SkipChildren,
            _ => Flow::Continue,
        });

        assert!(!seen.contains(&Node::Line(LineId(0))));
        assert!(seen.contains(&Node::Chunk(ChunkId(1))));
        assert!(seen.contains(&Node::Line(LineId(2))));
    }

    #[test]
    fn skip_siblings_resumes_at_parent_sibling() {
        let commit = commit();
        let (seen, walk) = record(&commit, Scope::All, |node| match node {
            Node::Line(LineId(0)) => Flow::SkipSiblings,
            Node::Chunk(ChunkId(1)) => Flow::SkipSiblings,
            _ => Flow::Continue,
        });

        assert_eq!(walk, Walk::Completed);
        assert_eq!(
            seen,
            vec![
                Node::File(FileId(0)),
                Node::Chunk(ChunkId(0)),
                Node::Line(LineId(0)),
                Node::Chunk(ChunkId(1)),
                Node::File(FileId(1)),
                Node::Chunk(ChunkId(2)),
                Node::Line(LineId(4)),
                Node::Line(LineId(5)),
            ]
        );
    }

    #[test]
    fn abort_stops_everything() {
        let commit = commit();
        let (seen, walk) = record(&commit, Scope::All, |node| match node {
            Node::Line(LineId(2)) => Flow::Abort,
            _ => Flow::Continue,
        });

        assert_eq!(walk, Walk::Aborted);
        assert_eq!(seen.last(), Some(&Node::Line(LineId(2))));
        assert!(!seen.contains(&Node::File(FileId(1))));
    }

    #[test]
    fn scoped_walk_covers_descendants_only() {
        let commit = commit();
        let (seen, _) = record(&commit, Scope::File(FileId(1)), |_| Flow::Continue);
        assert_eq!(
            seen,
            vec![
                Node::Chunk(ChunkId(2)),
                Node::Line(LineId(4)),
                Node::Line(LineId(5)),
            ]
        );

        let (seen, _) = record(&commit, Scope::Chunk(ChunkId(1)), |_| Flow::Continue);
        assert_eq!(seen, vec![Node::Line(LineId(2)), Node::Line(LineId(3))]);
    }

    #[test]
    fn errors_are_not_control_flow() {
        struct FailOnSecondFile;

        impl Visitor for FailOnSecondFile {
            type Error = String;

            fn file(&mut self, id: FileId, file: &File) -> Result<Flow, String> {
                if id == FileId(1) {
                    return Err(format!("refusing {}", file.new_path()));
                }
                Ok(Flow::SkipChildren)
            }
        }

        let commit = commit();
        let result = commit.walk(Scope::All, &mut FailOnSecondFile);
        assert_eq!(result, Err("refusing b".to_string()));
    }

    #[test]
    fn mutable_walk_edits_nodes() {
        struct Count(usize);

        impl VisitorMut for Count {
            type Error = Infallible;

            fn line(&mut self, _: LineId, _: &Chunk, _: &mut Line) -> Result<Flow, Infallible> {
                self.0 += 1;
                Ok(Flow::Continue)
            }
        }

        let mut commit = commit();
        let mut count = Count(0);
        let Ok(walk) = commit.walk_mut(Scope::All, &mut count);
        assert_eq!(walk, Walk::Completed);
        assert_eq!(count.0, 6);
    }
}
