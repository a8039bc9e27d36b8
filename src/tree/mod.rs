//! The commit tree: files, chunks and lines decorated with selection and
//! expansion state.
//!
//! Nodes live in three arenas owned by [`Commit`] and are addressed by typed
//! ids. Children are contiguous ranges of the next arena, and every child
//! keeps its parent's id so state changes can walk back up.

use crate::diff::{Op, ParseError, Patch};
use std::ops::Range;

pub mod display;
pub mod expansion;
pub mod index;
pub mod patch;
pub mod selection;
pub mod walk;

pub use display::DisplayOptions;
pub use expansion::Expansion;
pub use index::{LineIndex, TreeError};
pub use selection::Selection;
pub use walk::{Flow, Scope, Visitor, VisitorMut, Walk};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(usize);

/// Any node of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    File(FileId),
    Chunk(ChunkId),
    Line(LineId),
}

/// Options applied while building the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Expansion state every file and chunk starts in
    pub initial_expansion: Expansion,
}

/// One changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    old_path: String,
    new_path: String,
    old_mode: Option<u32>,
    new_mode: Option<u32>,
    is_new: bool,
    is_delete: bool,
    is_rename: bool,
    is_copy: bool,
    selection: Selection,
    expansion: Expansion,
    chunks: Range<usize>,
}

impl File {
    pub fn old_path(&self) -> &str {
        &self.old_path
    }

    pub fn new_path(&self) -> &str {
        &self.new_path
    }

    pub fn old_mode(&self) -> Option<u32> {
        self.old_mode
    }

    pub fn new_mode(&self) -> Option<u32> {
        self.new_mode
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_delete(&self) -> bool {
        self.is_delete
    }

    pub fn is_rename(&self) -> bool {
        self.is_rename
    }

    pub fn is_copy(&self) -> bool {
        self.is_copy
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn expansion(&self) -> Expansion {
        self.expansion
    }

    /// True when both modes are known and differ.
    pub fn mode_changed(&self) -> bool {
        matches!((self.old_mode, self.new_mode), (Some(old), Some(new)) if old != new)
    }

    pub fn chunk_ids(&self) -> impl Iterator<Item = ChunkId> + use<> {
        self.chunks.clone().map(ChunkId)
    }
}

/// One hunk of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Raw `@@` line, without its line break
    header: String,
    selection: Selection,
    expansion: Expansion,
    file: FileId,
    lines: Range<usize>,
    /// Non-context lines, the only ones that take part in selection
    change_count: usize,
}

impl Chunk {
    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn expansion(&self) -> Expansion {
        self.expansion
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn change_count(&self) -> usize {
        self.change_count
    }

    pub fn line_ids(&self) -> impl Iterator<Item = LineId> + use<> {
        self.lines.clone().map(LineId)
    }
}

/// One line of a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    op: Op,
    /// Content after the prefix, including its line break unless
    /// `missing_newline` is set
    text: String,
    missing_newline: bool,
    selection: Selection,
    chunk: ChunkId,
}

impl Line {
    pub fn op(&self) -> Op {
        self.op
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn missing_newline(&self) -> bool {
        self.missing_newline
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn chunk(&self) -> ChunkId {
        self.chunk
    }
}

/// The whole diff being split, with its interactive state.
#[derive(Debug, Clone, Default)]
pub struct Commit {
    /// Text that preceded the first file in the input, usually the commit
    /// header printed by `git show`
    pub description: String,
    files: Vec<File>,
    chunks: Vec<Chunk>,
    lines: Vec<Line>,
    line_index: LineIndex,
}

impl Commit {
    /// Parse `git diff` output into a fully selected tree.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the diff is malformed.
    pub fn parse(text: &str, options: ParseOptions) -> Result<Self, ParseError> {
        Ok(Self::from_patch(Patch::parse(text)?, options))
    }

    /// Decorate parsed file records. Files without any hunk (pure renames,
    /// mode changes, binary files) have nothing to select and are dropped.
    pub fn from_patch(patch: Patch, options: ParseOptions) -> Self {
        let mut commit = Commit {
            description: patch.preamble,
            ..Commit::default()
        };

        for diff in patch.files {
            if diff.fragments.is_empty() {
                tracing::warn!(
                    path = %diff.new_path,
                    binary = diff.is_binary,
                    "skipping change without text hunks"
                );
                continue;
            }

            let file_id = FileId(commit.files.len());
            let first_chunk = commit.chunks.len();
            for fragment in diff.fragments {
                let chunk_id = ChunkId(commit.chunks.len());
                let first_line = commit.lines.len();
                let change_count = fragment.change_count();
                commit.lines.extend(fragment.lines.into_iter().map(|line| Line {
                    op: line.op,
                    text: line.text,
                    missing_newline: line.missing_newline,
                    selection: Selection::Selected,
                    chunk: chunk_id,
                }));
                commit.chunks.push(Chunk {
                    header: fragment.header,
                    selection: Selection::Selected,
                    expansion: options.initial_expansion,
                    file: file_id,
                    lines: first_line..commit.lines.len(),
                    change_count,
                });
            }

            commit.files.push(File {
                old_path: diff.old_path,
                new_path: diff.new_path,
                old_mode: diff.old_mode,
                new_mode: diff.new_mode,
                is_new: diff.is_new,
                is_delete: diff.is_delete,
                is_rename: diff.is_rename,
                is_copy: diff.is_copy,
                selection: Selection::Selected,
                expansion: options.initial_expansion,
                chunks: first_chunk..commit.chunks.len(),
            });
        }

        tracing::debug!(
            files = commit.files.len(),
            chunks = commit.chunks.len(),
            lines = commit.lines.len(),
            "built commit tree"
        );
        commit
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn file_ids(&self) -> impl Iterator<Item = FileId> + use<> {
        (0..self.files.len()).map(FileId)
    }

    pub fn file(&self, id: FileId) -> &File {
        &self.files[id.0]
    }

    pub fn chunk(&self, id: ChunkId) -> &Chunk {
        &self.chunks[id.0]
    }

    pub fn line(&self, id: LineId) -> &Line {
        &self.lines[id.0]
    }

    pub fn selection(&self, node: Node) -> Selection {
        match node {
            Node::File(id) => self.files[id.0].selection,
            Node::Chunk(id) => self.chunks[id.0].selection,
            Node::Line(id) => self.lines[id.0].selection,
        }
    }

    /// The parent of a node; files have none.
    pub fn parent(&self, node: Node) -> Option<Node> {
        match node {
            Node::File(_) => None,
            Node::Chunk(id) => Some(Node::File(self.chunks[id.0].file)),
            Node::Line(id) => Some(Node::Chunk(self.lines[id.0].chunk)),
        }
    }
}
