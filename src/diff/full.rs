use super::{FileDiff, LineReader, ParseError};

/// A complete patch: any text before the first file, then every file section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    /// Text before the first file (commit header from `git show`/`format-patch`)
    pub preamble: String,
    pub files: Vec<FileDiff>,
}

impl Patch {
    /// Parse complete `git diff` output.
    ///
    /// Lines between file sections that belong to no file (such as a
    /// `format-patch` signature) are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] on the first malformed hunk or header; no
    /// partial result is produced.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut reader = LineReader::new(text);
        let mut patch = Patch::default();

        while let Some((number, line)) = reader.peek() {
            if starts_file(&reader) {
                patch.files.push(FileDiff::parse(&mut reader)?);
                continue;
            }
            reader.next();
            if patch.files.is_empty() {
                patch.preamble.push_str(line);
            } else {
                tracing::trace!(
                    line = number,
                    text = line.trim_end(),
                    "skipping line outside any file"
                );
            }
        }

        tracing::debug!(files = patch.files.len(), "parsed diff");
        Ok(patch)
    }
}

/// A file starts at `diff --git`, or at a bare `---`/`+++` pair.
fn starts_file(reader: &LineReader<'_>) -> bool {
    match reader.peek() {
        Some((_, line)) if line.starts_with("diff --git ") => true,
        Some((_, line)) if line.starts_with("--- ") => reader
            .peek_nth(1)
            .is_some_and(|(_, next)| next.starts_with("+++ ")),
        _ => false,
    }
}
