use super::{LineReader, ParseError};
use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{map_res, opt},
    sequence::preceded,
};
use std::fmt;

/// Text of the marker git prints after a line that lacks a trailing newline.
pub const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// The operation a diff line performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Context,
    Add,
    Delete,
}

impl Op {
    /// The single-character prefix used for this operation in a unified diff.
    #[must_use]
    pub fn prefix(self) -> char {
        match self {
            Op::Context => ' ',
            Op::Add => '+',
            Op::Delete => '-',
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// A single line of a hunk body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub op: Op,
    /// Line content without the operation prefix. Includes the trailing `\n`
    /// unless `missing_newline` is set.
    pub text: String,
    /// The line was followed by a `\ No newline at end of file` marker.
    pub missing_newline: bool,
}

/// A hunk as it appeared in the input, header preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// The original `@@ ... @@` line, without its line break
    pub header: String,
    pub lines: Vec<DiffLine>,
}

/// Line counts from a hunk header; they bound the hunk body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkCounts {
    old: u32,
    new: u32,
}

impl Fragment {
    /// Parse one hunk starting at the reader's current `@@` line.
    ///
    /// The body is read by the header's line counts, so a hunk ends exactly
    /// where git says it does even if the next line looks like content.
    pub(super) fn parse(reader: &mut LineReader<'_>) -> Result<Self, ParseError> {
        let Some((header_line, raw_header)) = reader.next() else {
            return Err(ParseError::TruncatedHunk {
                line: reader.line_number(),
            });
        };
        let header = raw_header.trim_end_matches(['\n', '\r']).to_string();

        let (_, counts) = parse_header(&header).map_err(|_| ParseError::InvalidHunkHeader {
            line: header_line,
            text: header.clone(),
        })?;

        let mut old_remaining = counts.old;
        let mut new_remaining = counts.new;
        let mut lines: Vec<DiffLine> = Vec::new();

        while old_remaining > 0 || new_remaining > 0 {
            let Some((line_number, raw)) = reader.next() else {
                return Err(ParseError::TruncatedHunk {
                    line: reader.line_number(),
                });
            };

            if raw.starts_with('\\') {
                mark_missing_newline(&mut lines, line_number)?;
                continue;
            }

            let (op, text) = split_op(raw).ok_or_else(|| ParseError::UnexpectedLine {
                line: line_number,
                text: raw.trim_end().to_string(),
            })?;

            let fits = match op {
                Op::Context => old_remaining > 0 && new_remaining > 0,
                Op::Delete => old_remaining > 0,
                Op::Add => new_remaining > 0,
            };
            if !fits {
                return Err(ParseError::UnexpectedLine {
                    line: line_number,
                    text: raw.trim_end().to_string(),
                });
            }
            match op {
                Op::Context => {
                    old_remaining -= 1;
                    new_remaining -= 1;
                }
                Op::Delete => old_remaining -= 1,
                Op::Add => new_remaining -= 1,
            }

            let mut text = text.to_string();
            // The final line of the input may have lost its line break
            if !text.ends_with('\n') {
                text.push('\n');
            }
            lines.push(DiffLine {
                op,
                text,
                missing_newline: false,
            });
        }

        // A marker for the last body line comes after the counts are exhausted
        if let Some((line_number, raw)) = reader.peek()
            && raw.starts_with('\\')
        {
            reader.next();
            mark_missing_newline(&mut lines, line_number)?;
        }

        Ok(Fragment { header, lines })
    }

    /// Number of added and deleted lines.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.lines.iter().filter(|l| l.op != Op::Context).count()
    }
}

/// Split a body line into its operation and content.
///
/// An empty line counts as empty context; some tools strip the lone space.
fn split_op(raw: &str) -> Option<(Op, &str)> {
    match raw.chars().next() {
        Some(' ') => Some((Op::Context, &raw[1..])),
        Some('+') => Some((Op::Add, &raw[1..])),
        Some('-') => Some((Op::Delete, &raw[1..])),
        Some('\n') | None => Some((Op::Context, "\n")),
        Some('\r') if raw.trim_end_matches(['\r', '\n']).is_empty() => Some((Op::Context, raw)),
        _ => None,
    }
}

fn mark_missing_newline(lines: &mut [DiffLine], line_number: usize) -> Result<(), ParseError> {
    let last = lines
        .last_mut()
        .ok_or(ParseError::OrphanedNewlineMarker { line: line_number })?;
    if last.text.ends_with('\n') {
        last.text.pop();
    }
    last.missing_newline = true;
    Ok(())
}

fn number(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |digits: &str| digits.parse::<u32>()).parse(input)
}

/// `start[,count]`, where an omitted count means one line.
fn range(input: &str) -> IResult<&str, (u32, u32)> {
    (number, opt(preceded(char(','), number)))
        .map(|(start, count)| (start, count.unwrap_or(1)))
        .parse(input)
}

/// Parse `@@ -old[,n] +new[,n] @@[ section]`; the remaining input is the section.
fn parse_header(input: &str) -> IResult<&str, HunkCounts> {
    (
        tag("@@ -"),
        range,
        tag(" +"),
        range,
        tag(" @@"),
        opt(char(' ')),
    )
        .map(|(_, (_, old), _, (_, new), _, _)| HunkCounts { old, new })
        .parse(input)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn parse(text: &str) -> Result<Fragment, ParseError> {
        let mut reader = LineReader::new(text);
        Fragment::parse(&mut reader)
    }

    #[test]
    fn header_with_counts_and_section() {
        let (section, counts) = parse_header("@@ -10,2 +10,3 @@ fn main() {").unwrap();
        assert_eq!(section, "fn main() {");
        assert_eq!(counts, HunkCounts { old: 2, new: 3 });
    }

    #[test]
    fn header_with_omitted_counts() {
        let (section, counts) = parse_header("@@ -15 +14,0 @@").unwrap();
        assert_eq!(section, "");
        assert_eq!(counts, HunkCounts { old: 1, new: 0 });
    }

    #[test]
    fn header_rejects_garbage() {
        assert!(parse_header("@@ -a,b +c @@").is_err());
        assert!(parse_header("@@@ -1,2 -1,2 +1,3 @@@").is_err());
    }

    #[test]
    fn parses_mixed_body() {
        let fragment = parse(
            "@@ -1,3 +1,3 @@ intro\n context\n-old\n+new\n tail\n",
        )
        .unwrap();

        assert_eq!(fragment.header, "@@ -1,3 +1,3 @@ intro");
        assert_eq!(fragment.lines.len(), 4);
        assert_eq!(fragment.change_count(), 2);
        assert_eq!(fragment.lines[1].op, Op::Delete);
        assert_eq!(fragment.lines[1].text, "old\n");
        assert_eq!(fragment.lines[2].op, Op::Add);
        assert_eq!(fragment.lines[2].text, "new\n");
    }

    #[test]
    fn stops_at_header_counts() {
        let mut reader = LineReader::new("@@ -1 +1 @@\n-a\n+b\n--- a/next\n");
        let fragment = Fragment::parse(&mut reader).unwrap();
        assert_eq!(fragment.lines.len(), 2);
        assert_eq!(reader.peek().map(|(_, l)| l), Some("--- a/next\n"));
    }

    #[test]
    fn no_newline_marker_strips_line_break() {
        let fragment = parse(
            "@@ -1 +1 @@\n-old\n\\ No newline at end of file\n+new\n\\ No newline at end of file\n",
        )
        .unwrap();

        assert_eq!(fragment.lines[0].text, "old");
        assert!(fragment.lines[0].missing_newline);
        assert_eq!(fragment.lines[1].text, "new");
        assert!(fragment.lines[1].missing_newline);
    }

    #[test]
    fn empty_line_is_context() {
        let fragment = parse("@@ -1,2 +1,2 @@\n\n-a\n+b\n").unwrap();
        assert_eq!(fragment.lines[0].op, Op::Context);
        assert_eq!(fragment.lines[0].text, "\n");
    }

    #[test]
    fn truncated_body_is_an_error() {
        let result = parse("@@ -1,3 +1,3 @@\n a\n");
        assert!(matches!(result, Err(ParseError::TruncatedHunk { .. })));
    }

    #[test]
    fn surplus_add_is_an_error() {
        let result = parse("@@ -1 +1,0 @@\n+extra\n");
        assert!(matches!(
            result,
            Err(ParseError::UnexpectedLine { line: 2, .. })
        ));
    }

    #[test]
    fn marker_without_line_is_an_error() {
        let result = parse("@@ -1 +1 @@\n\\ No newline at end of file\n-a\n+b\n");
        assert!(matches!(
            result,
            Err(ParseError::OrphanedNewlineMarker { line: 2 })
        ));
    }
}
