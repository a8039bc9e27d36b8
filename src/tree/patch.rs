//! Reconstruct a unified diff from the selected part of the tree.
//!
//! The output is meant for `git apply --recount`: hunk headers are copied
//! as they were read, and git recomputes the counts from the lines that
//! remain.

use super::selection::Selection;
use super::walk::{Flow, Scope, Visitor};
use super::{Chunk, ChunkId, Commit, File, FileId, Line, LineId};
use crate::diff::{NO_NEWLINE_MARKER, Op};
use std::convert::Infallible;
use std::fmt;

const DEFAULT_MODE: u32 = 0o100644;

/// The header lines of one file in an output patch.
///
/// A deleted file whose content is only partly selected is written as a
/// plain modification, since the file survives the commit.
pub struct FileHeader<'a>(pub &'a File);

impl FileHeader<'_> {
    fn deletes(&self) -> bool {
        self.0.is_delete && self.0.selection == Selection::Selected
    }
}

impl fmt::Display for FileHeader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.0;
        writeln!(f, "diff --git a/{} b/{}", file.old_path, file.new_path)?;

        if file.is_new {
            writeln!(
                f,
                "new file mode {:06o}",
                file.new_mode.unwrap_or(DEFAULT_MODE)
            )?;
            writeln!(f, "--- /dev/null")?;
            return writeln!(f, "+++ b/{}", file.new_path);
        }
        if self.deletes() {
            writeln!(
                f,
                "deleted file mode {:06o}",
                file.old_mode.unwrap_or(DEFAULT_MODE)
            )?;
            writeln!(f, "--- a/{}", file.old_path)?;
            return writeln!(f, "+++ /dev/null");
        }

        if file.mode_changed()
            && let (Some(old), Some(new)) = (file.old_mode, file.new_mode)
        {
            writeln!(f, "old mode {old:06o}")?;
            writeln!(f, "new mode {new:06o}")?;
        }
        if file.is_rename {
            writeln!(f, "rename from {}", file.old_path)?;
            writeln!(f, "rename to {}", file.new_path)?;
        } else if file.is_copy {
            writeln!(f, "copy from {}", file.old_path)?;
            writeln!(f, "copy to {}", file.new_path)?;
        }
        writeln!(f, "--- a/{}", file.old_path)?;
        writeln!(f, "+++ b/{}", file.new_path)
    }
}

/// Writes selected content through a walk.
struct PatchWriter<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
    lines: &'a [Line],
    /// Last line of the current chunk that makes it into the output
    last: Option<LineId>,
}

fn emitted(line: &Line) -> bool {
    !(line.op == Op::Add && line.selection == Selection::Deselected)
}

impl Visitor for PatchWriter<'_, '_> {
    type Error = fmt::Error;

    fn file(&mut self, _: FileId, file: &File) -> Result<Flow, fmt::Error> {
        if file.selection == Selection::Deselected {
            return Ok(Flow::SkipChildren);
        }
        write!(self.f, "{}", FileHeader(file))?;
        Ok(Flow::Continue)
    }

    fn chunk(&mut self, _: ChunkId, _: &File, chunk: &Chunk) -> Result<Flow, fmt::Error> {
        if chunk.selection == Selection::Deselected {
            return Ok(Flow::SkipChildren);
        }
        self.last = chunk
            .lines
            .clone()
            .rev()
            .map(LineId)
            .find(|id| emitted(&self.lines[id.0]));
        writeln!(self.f, "{}", chunk.header)?;
        Ok(Flow::Continue)
    }

    fn line(&mut self, id: LineId, _: &Chunk, line: &Line) -> Result<Flow, fmt::Error> {
        let op = match (line.op, line.selection) {
            (Op::Add, Selection::Deselected) => return Ok(Flow::Continue),
            // Leaving a deletion out of this commit keeps the line in the file
            (Op::Delete, Selection::Deselected) => Op::Context,
            (op, _) => op,
        };

        // A kept line without a newline cannot have content after it; the
        // newline is added back instead
        if line.missing_newline && line.op == Op::Delete && self.last != Some(id) {
            writeln!(self.f, "-{}", line.text)?;
            writeln!(self.f, "{NO_NEWLINE_MARKER}")?;
            writeln!(self.f, "+{}", line.text)?;
            return Ok(Flow::Continue);
        }

        write!(self.f, "{}{}", op.prefix(), line.text)?;
        if line.missing_newline {
            writeln!(self.f)?;
            writeln!(self.f, "{NO_NEWLINE_MARKER}")?;
        }
        Ok(Flow::Continue)
    }
}

/// Display adapter over the selected part of a commit.
pub struct SelectedPatch<'a>(&'a Commit);

impl fmt::Display for SelectedPatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = PatchWriter {
            f,
            lines: &self.0.lines,
            last: None,
        };
        self.0.walk(Scope::All, &mut writer)?;
        Ok(())
    }
}

/// Collects paths of files that take part in the patch.
struct Paths {
    paths: Vec<String>,
    include_sources: bool,
}

impl Visitor for Paths {
    type Error = Infallible;

    fn file(&mut self, _: FileId, file: &File) -> Result<Flow, Infallible> {
        if file.selection != Selection::Deselected {
            if self.include_sources && file.is_rename && !self.paths.contains(&file.old_path) {
                self.paths.push(file.old_path.clone());
            }
            if !self.paths.contains(&file.new_path) {
                self.paths.push(file.new_path.clone());
            }
        }
        Ok(Flow::SkipChildren)
    }
}

impl Commit {
    /// The selected content as an applicable patch. Empty when nothing is
    /// selected.
    pub fn patch(&self) -> SelectedPatch<'_> {
        SelectedPatch(self)
    }

    pub fn to_patch(&self) -> String {
        self.patch().to_string()
    }

    /// Paths of every file with at least one selected change.
    pub fn selected_files(&self) -> Vec<String> {
        self.collect_paths(false)
    }

    /// Like [`Commit::selected_files`], plus the source path of every
    /// selected rename. These are the paths to stage after applying.
    pub fn selected_paths(&self) -> Vec<String> {
        self.collect_paths(true)
    }

    fn collect_paths(&self, include_sources: bool) -> Vec<String> {
        let mut paths = Paths {
            paths: Vec::new(),
            include_sources,
        };
        let Ok(_) = self.walk(Scope::All, &mut paths);
        paths.paths
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tree::{Node, ParseOptions};
    use similar_asserts::assert_eq;

    fn parse(text: &str) -> Commit {
        Commit::parse(text, ParseOptions::default()).unwrap()
    }

    const MODIFIED: &str = r#"diff --git a/gtk.nix b/gtk.nix
--- a/gtk.nix
+++ b/gtk.nix
@@ -9,3 +9,4 @@ line 8
 line 9
-    gtk.theme.name = "Adwaita";
+    # Theme managed by Stylix
+    gtk.cursorTheme.size = 24;
 line 11
@@ -20 +21 @@
-old
+new
"#;

    #[test]
    fn full_selection_reproduces_input() {
        let commit = parse(MODIFIED);
        assert_eq!(commit.to_patch(), MODIFIED);
    }

    #[test]
    fn collapsing_does_not_change_output() {
        let mut commit = parse(MODIFIED);
        commit.expand_all();
        let expanded = commit.to_patch();
        commit.collapse_all();
        assert_eq!(commit.to_patch(), expanded);
    }

    #[test]
    fn deselected_deletion_becomes_context() {
        let mut commit = parse(MODIFIED);
        let file = commit.file_ids().next().unwrap();
        let chunk = commit.file(file).chunk_ids().next().unwrap();
        let lines: Vec<_> = commit.chunk(chunk).line_ids().collect();
        // Keep the deletion out, and the second addition
        commit.toggle(Node::Line(lines[1]));
        commit.toggle(Node::Line(lines[3]));

        assert_eq!(
            commit.to_patch(),
            r#"diff --git a/gtk.nix b/gtk.nix
--- a/gtk.nix
+++ b/gtk.nix
@@ -9,3 +9,4 @@ line 8
 line 9
     gtk.theme.name = "Adwaita";
+    # Theme managed by Stylix
 line 11
@@ -20 +21 @@
-old
+new
"#
        );
    }

    #[test]
    fn deselected_chunk_is_left_out() {
        let mut commit = parse(MODIFIED);
        let file = commit.file_ids().next().unwrap();
        let chunk = commit.file(file).chunk_ids().next().unwrap();
        commit.toggle(Node::Chunk(chunk));

        assert_eq!(
            commit.to_patch(),
            "diff --git a/gtk.nix b/gtk.nix\n--- a/gtk.nix\n+++ b/gtk.nix\n@@ -20 +21 @@\n-old\n+new\n"
        );
    }

    #[test]
    fn nothing_selected_is_empty() {
        let mut commit = parse(MODIFIED);
        commit.select_none();
        assert_eq!(commit.to_patch(), "");
        assert!(commit.selected_files().is_empty());
    }

    #[test]
    fn missing_newline_marker_is_written_back() {
        let text = "diff --git a/a.txt b/a.txt\n--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-old\n\\ No newline at end of file\n+new\n\\ No newline at end of file\n";
        let commit = parse(text);
        assert_eq!(commit.to_patch(), text);
    }

    #[test]
    fn missing_newline_on_deselected_deletion() {
        let text = "diff --git a/a.txt b/a.txt\n--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-old\n\\ No newline at end of file\n+new\n\\ No newline at end of file\n";
        let mut commit = parse(text);
        let file = commit.file_ids().next().unwrap();
        let chunk = commit.file(file).chunk_ids().next().unwrap();
        let mut lines = commit.chunk(chunk).line_ids();
        let delete = lines.next().unwrap();
        let add = lines.next().unwrap();

        // With the addition kept, the old line needs its newline back
        commit.toggle(Node::Line(delete));
        assert_eq!(
            commit.to_patch(),
            "diff --git a/a.txt b/a.txt\n--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-old\n\\ No newline at end of file\n+old\n+new\n\\ No newline at end of file\n"
        );

        commit.toggle(Node::Line(add));
        assert_eq!(commit.to_patch(), "");
    }

    #[test]
    fn kept_unterminated_line_followed_by_additions() {
        let text = "diff --git a/f b/f\n--- a/f\n+++ b/f\n@@ -1,2 +1,3 @@\n a\n-b\n\\ No newline at end of file\n+b\n+c\n";
        let mut commit = parse(text);
        let file = commit.file_ids().next().unwrap();
        let chunk = commit.file(file).chunk_ids().next().unwrap();
        let delete = commit.chunk(chunk).line_ids().nth(1).unwrap();
        commit.toggle(Node::Line(delete));

        let patch = commit.to_patch();
        assert_eq!(
            patch,
            "diff --git a/f b/f\n--- a/f\n+++ b/f\n@@ -1,2 +1,3 @@\n a\n-b\n\\ No newline at end of file\n+b\n+b\n+c\n"
        );
        assert_eq!(patch.matches(NO_NEWLINE_MARKER).count(), 1);
    }

    #[test]
    fn new_and_deleted_file_headers() {
        let text = "diff --git a/new.sh b/new.sh
new file mode 100755
index 0000000..1111111
--- /dev/null
+++ b/new.sh
@@ -0,0 +1 @@
+echo hi
diff --git a/gone.txt b/gone.txt
deleted file mode 100644
index 2222222..0000000
--- a/gone.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-a
-b
";
        let commit = parse(text);
        assert_eq!(
            commit.to_patch(),
            "diff --git a/new.sh b/new.sh
new file mode 100755
--- /dev/null
+++ b/new.sh
@@ -0,0 +1 @@
+echo hi
diff --git a/gone.txt b/gone.txt
deleted file mode 100644
--- a/gone.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-a
-b
"
        );
        assert_eq!(commit.selected_files(), vec!["new.sh", "gone.txt"]);
    }

    #[test]
    fn partly_deleted_file_is_a_modification() {
        let text = "diff --git a/gone.txt b/gone.txt
deleted file mode 100644
--- a/gone.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-a
-b
";
        let mut commit = parse(text);
        let file = commit.file_ids().next().unwrap();
        let chunk = commit.file(file).chunk_ids().next().unwrap();
        let second = commit.chunk(chunk).line_ids().nth(1).unwrap();
        commit.toggle(Node::Line(second));

        assert_eq!(
            commit.to_patch(),
            "diff --git a/gone.txt b/gone.txt
--- a/gone.txt
+++ b/gone.txt
@@ -1,2 +0,0 @@
-a
 b
"
        );
    }

    #[test]
    fn rename_with_mode_change() {
        let text = "diff --git a/run.sh b/bin/run.sh
old mode 100644
new mode 100755
similarity index 80%
rename from run.sh
rename to bin/run.sh
index 1111111..2222222
--- a/run.sh
+++ b/bin/run.sh
@@ -1 +1 @@
-echo old
+echo new
";
        let commit = parse(text);
        assert_eq!(
            commit.to_patch(),
            "diff --git a/run.sh b/bin/run.sh
old mode 100644
new mode 100755
rename from run.sh
rename to bin/run.sh
--- a/run.sh
+++ b/bin/run.sh
@@ -1 +1 @@
-echo old
+echo new
"
        );
        assert_eq!(commit.selected_files(), vec!["bin/run.sh"]);
        assert_eq!(commit.selected_paths(), vec!["run.sh", "bin/run.sh"]);
    }

    #[test]
    fn copy_header() {
        let text = "diff --git a/a.txt b/b.txt
similarity index 90%
copy from a.txt
copy to b.txt
--- a/a.txt
+++ b/b.txt
@@ -1 +1 @@
-x
+y
";
        let header = FileHeader(&parse(text).files()[0]).to_string();
        assert_eq!(
            header,
            "diff --git a/a.txt b/b.txt\ncopy from a.txt\ncopy to b.txt\n--- a/a.txt\n+++ b/b.txt\n"
        );
    }

    #[test]
    fn partial_file_is_listed() {
        let mut commit = parse(MODIFIED);
        let file = commit.file_ids().next().unwrap();
        let chunk = commit.file(file).chunk_ids().nth(1).unwrap();
        commit.toggle(Node::Chunk(chunk));
        assert_eq!(commit.selected_files(), vec!["gtk.nix"]);
    }
}
