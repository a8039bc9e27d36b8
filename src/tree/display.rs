//! The text listing the selector shows.
//!
//! Rendering walks the visible part of the tree, writes one row per node and
//! records which node each row shows in the commit's [`LineIndex`].

use super::index::LineIndex;
use super::walk::{Flow, Scope, Visitor};
use super::{Chunk, ChunkId, Commit, Expansion, File, FileId, Line, LineId, Node};
use crate::diff::{NO_NEWLINE_MARKER, Op};
use crossterm::style::{Color, Stylize, style};
use std::convert::Infallible;

/// Indent per tree level.
const TAB: &str = "    ";
/// Width of one glyph column.
const SPACER: &str = "   ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Colour headers and change lines with ANSI escapes
    pub color: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self { color: true }
    }
}

struct Listing {
    options: DisplayOptions,
    out: String,
    rows: Vec<Node>,
}

impl Listing {
    fn paint(&mut self, text: &str, color: Option<Color>) {
        match color {
            Some(color) if self.options.color => {
                self.out.push_str(&format!("{}", style(text).with(color)));
            }
            _ => self.out.push_str(text),
        }
    }

    fn descend(expansion: Expansion) -> Flow {
        match expansion {
            Expansion::Expanded => Flow::Continue,
            Expansion::Collapsed => Flow::SkipChildren,
        }
    }
}

fn op_color(op: Op) -> Option<Color> {
    match op {
        Op::Add => Some(Color::Green),
        Op::Delete => Some(Color::Red),
        Op::Context => None,
    }
}

impl Visitor for Listing {
    type Error = Infallible;

    fn file(&mut self, id: FileId, file: &File) -> Result<Flow, Infallible> {
        self.rows.push(Node::File(id));
        self.out.push_str(&format!("{} {} ", file.expansion, file.selection));
        if file.is_new {
            self.out.push_str("(NEW FILE)");
        } else {
            self.out.push_str(&file.old_path);
        }
        self.out.push_str(" => ");
        if file.is_delete {
            self.out.push_str("(DELETED)");
        } else {
            self.out.push_str(&file.new_path);
        }
        self.out.push('\n');
        Ok(Self::descend(file.expansion))
    }

    fn chunk(&mut self, id: ChunkId, _: &File, chunk: &Chunk) -> Result<Flow, Infallible> {
        self.rows.push(Node::Chunk(id));
        self.out.push_str(&format!("{TAB}{} {} ", chunk.expansion, chunk.selection));
        self.paint(&chunk.header, Some(Color::Cyan));
        self.out.push('\n');
        Ok(Self::descend(chunk.expansion))
    }

    fn line(&mut self, id: LineId, _: &Chunk, line: &Line) -> Result<Flow, Infallible> {
        self.rows.push(Node::Line(id));
        self.out.push_str(&format!("{TAB}{TAB}{SPACER} "));
        match line.op {
            Op::Context => self.out.push_str(SPACER),
            _ => self.out.push_str(&line.selection.to_string()),
        }
        self.out.push(' ');
        let text = line.text.strip_suffix('\n').unwrap_or(&line.text);
        self.paint(&format!("{}{text}", line.op.prefix()), op_color(line.op));
        self.out.push('\n');

        if line.missing_newline {
            self.rows.push(Node::Line(id));
            self.out.push_str(&format!("{TAB}{TAB}{TAB}{TAB}"));
            self.paint(
                &format!("{}{NO_NEWLINE_MARKER}", line.op.prefix()),
                op_color(line.op),
            );
            self.out.push('\n');
        }
        Ok(Flow::Continue)
    }
}

impl Commit {
    /// Render the visible tree, one row per file, chunk and line, and rebuild
    /// the row-to-node index.
    pub fn render(&mut self, options: DisplayOptions) -> String {
        let mut listing = Listing {
            options,
            out: String::new(),
            rows: Vec::new(),
        };
        let Ok(_) = self.walk(Scope::All, &mut listing);
        self.line_index = LineIndex::from_rows(listing.rows);
        listing.out
    }
}
