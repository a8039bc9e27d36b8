use super::{Fragment, LineReader, ParseError};
use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, hex_digit1, oct_digit1},
    combinator::{all_consuming, map_res, opt},
    sequence::preceded,
};

/// All changes to a single path, as read from a `diff --git` section.
///
/// For new and deleted files both paths name the one path that exists, so
/// callers never see `/dev/null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    pub old_path: String,
    pub new_path: String,
    pub old_mode: Option<u32>,
    pub new_mode: Option<u32>,
    pub is_new: bool,
    pub is_delete: bool,
    pub is_rename: bool,
    pub is_copy: bool,
    /// Binary changes carry no text hunks
    pub is_binary: bool,
    pub fragments: Vec<Fragment>,
}

impl FileDiff {
    /// Parse one file section: optional `diff --git` line, extended headers,
    /// `---`/`+++` names, then every hunk up to the next file.
    pub(super) fn parse(reader: &mut LineReader<'_>) -> Result<Self, ParseError> {
        let mut file = FileDiff::default();

        if let Some((number, raw)) = reader.peek()
            && let Some(names) = raw.strip_prefix("diff --git ")
        {
            reader.next();
            if let Some((old, new)) = parse_git_names(trim_eol(names), number)? {
                file.old_path = old;
                file.new_path = new;
            }
        }

        while let Some((number, raw)) = reader.peek() {
            if raw.starts_with("@@ ") || raw.starts_with("diff --git ") {
                break;
            }
            reader.next();
            file.apply_header(trim_eol(raw), number)?;
        }

        while let Some((_, raw)) = reader.peek()
            && raw.starts_with("@@ ")
        {
            file.fragments.push(Fragment::parse(reader)?);
        }

        if file.is_new {
            file.old_path = file.new_path.clone();
        } else if file.is_delete {
            file.new_path = file.old_path.clone();
        }

        Ok(file)
    }

    /// Record one extended header line. Unknown lines (similarity, binary
    /// payload) are skipped.
    fn apply_header(&mut self, line: &str, number: usize) -> Result<(), ParseError> {
        if let Some(name) = line.strip_prefix("--- ") {
            match parse_name(name, "a/", number)? {
                Some(path) => self.old_path = path,
                None => self.is_new = true,
            }
        } else if let Some(name) = line.strip_prefix("+++ ") {
            match parse_name(name, "b/", number)? {
                Some(path) => self.new_path = path,
                None => self.is_delete = true,
            }
        } else if let Some(mode) = line.strip_prefix("old mode ") {
            self.old_mode = Some(parse_mode(mode, number)?);
        } else if let Some(mode) = line.strip_prefix("new mode ") {
            self.new_mode = Some(parse_mode(mode, number)?);
        } else if let Some(mode) = line.strip_prefix("new file mode ") {
            self.is_new = true;
            self.new_mode = Some(parse_mode(mode, number)?);
        } else if let Some(mode) = line.strip_prefix("deleted file mode ") {
            self.is_delete = true;
            self.old_mode = Some(parse_mode(mode, number)?);
        } else if let Some(name) = line.strip_prefix("rename from ") {
            self.is_rename = true;
            self.old_path = decode_path(name, number)?;
        } else if let Some(name) = line.strip_prefix("rename to ") {
            self.is_rename = true;
            self.new_path = decode_path(name, number)?;
        } else if let Some(name) = line.strip_prefix("copy from ") {
            self.is_copy = true;
            self.old_path = decode_path(name, number)?;
        } else if let Some(name) = line.strip_prefix("copy to ") {
            self.is_copy = true;
            self.new_path = decode_path(name, number)?;
        } else if let Some(index) = line.strip_prefix("index ") {
            // `index <old>..<new> <mode>` names the mode of an unchanged-mode file
            if let Ok((_, Some(mode))) = index_mode(index) {
                self.old_mode = self.old_mode.or(Some(mode));
                self.new_mode = self.new_mode.or(Some(mode));
            }
        } else if line.starts_with("Binary files ") || line == "GIT binary patch" {
            self.is_binary = true;
        } else {
            tracing::trace!(line = number, text = line, "skipping diff header line");
        }
        Ok(())
    }
}

fn trim_eol(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn mode(input: &str) -> IResult<&str, u32> {
    map_res(oct_digit1, |digits: &str| u32::from_str_radix(digits, 8)).parse(input)
}

fn parse_mode(text: &str, line: usize) -> Result<u32, ParseError> {
    all_consuming(mode)
        .parse(text.trim())
        .map(|(_, mode)| mode)
        .map_err(|_| ParseError::InvalidMode {
            line,
            text: text.to_string(),
        })
}

/// `<hash>..<hash>[ <mode>]`
fn index_mode(input: &str) -> IResult<&str, Option<u32>> {
    preceded(
        (hex_digit1, tag(".."), hex_digit1),
        opt(preceded(char(' '), mode)),
    )
    .parse(input)
}

/// Decode a path as git writes it: either C-quoted, or raw up to an
/// optional tab-separated suffix.
fn decode_path(raw: &str, line: usize) -> Result<String, ParseError> {
    if raw.starts_with('"') {
        let (name, _) = unquote(raw).ok_or_else(|| ParseError::InvalidPath {
            line,
            text: raw.to_string(),
        })?;
        return Ok(name);
    }
    let name = raw.split_once('\t').map_or(raw, |(name, _)| name);
    Ok(name.to_string())
}

/// Decode a `---`/`+++` name, stripping the side prefix. `/dev/null` yields `None`.
fn parse_name(raw: &str, prefix: &str, line: usize) -> Result<Option<String>, ParseError> {
    let name = decode_path(raw, line)?;
    if name == "/dev/null" {
        return Ok(None);
    }
    Ok(Some(strip_side(name, prefix)))
}

fn strip_side(name: String, prefix: &str) -> String {
    match name.strip_prefix(prefix) {
        Some(path) => path.to_string(),
        None => name,
    }
}

/// Split the names on a `diff --git` line.
///
/// Unquoted names may contain spaces, so the split where both sides agree is
/// preferred over the first ` b/`.
fn parse_git_names(names: &str, line: usize) -> Result<Option<(String, String)>, ParseError> {
    if names.starts_with('"') {
        let (old, rest) = unquote(names).ok_or_else(|| ParseError::InvalidPath {
            line,
            text: names.to_string(),
        })?;
        let new = decode_path(rest.trim_start(), line)?;
        return Ok(Some((strip_side(old, "a/"), strip_side(new, "b/"))));
    }

    let Some(body) = names.strip_prefix("a/") else {
        return Ok(None);
    };

    if body.len() >= 3 && (body.len() - 3) % 2 == 0 {
        let half = (body.len() - 3) / 2;
        if body.is_char_boundary(half)
            && body[half..].starts_with(" b/")
            && body[..half] == body[half + 3..]
        {
            let path = body[..half].to_string();
            return Ok(Some((path.clone(), path)));
        }
    }

    if let Some((old, new)) = body.split_once(" \"") {
        let new = decode_path(&format!("\"{new}"), line)?;
        return Ok(Some((old.to_string(), strip_side(new, "b/"))));
    }

    Ok(body
        .split_once(" b/")
        .map(|(old, new)| (old.to_string(), new.to_string())))
}

/// Decode a C-style quoted name, returning it and the input after the
/// closing quote.
fn unquote(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('"')?;
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                return Some((String::from_utf8_lossy(&out).into_owned(), &body[i + 1..]));
            }
            b'\\' => {
                let escape = *bytes.get(i + 1)?;
                i += 2;
                let decoded = match escape {
                    b'a' => 0x07,
                    b'b' => 0x08,
                    b't' => b'\t',
                    b'n' => b'\n',
                    b'v' => 0x0b,
                    b'f' => 0x0c,
                    b'r' => b'\r',
                    b'"' => b'"',
                    b'\\' => b'\\',
                    b'0'..=b'3' => {
                        let digits = bytes.get(i - 1..i + 2)?;
                        i += 2;
                        let mut value = 0u8;
                        for digit in digits {
                            if !(b'0'..=b'7').contains(digit) {
                                return None;
                            }
                            value = value * 8 + (digit - b'0');
                        }
                        value
                    }
                    _ => return None,
                };
                out.push(decoded);
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }

    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::diff::Op;
    use similar_asserts::assert_eq;

    fn parse(text: &str) -> FileDiff {
        let mut reader = LineReader::new(text);
        FileDiff::parse(&mut reader).unwrap()
    }

    #[test]
    fn modified_file() {
        let file = parse(
            r#"diff --git a/flake.nix b/flake.nix
index abc1234..def5678 100644
--- a/flake.nix
+++ b/flake.nix
@@ -136,0 +137 @@
+      debug = true;
"#,
        );
        assert_eq!(file.old_path, "flake.nix");
        assert_eq!(file.new_path, "flake.nix");
        assert_eq!(file.old_mode, Some(0o100644));
        assert_eq!(file.new_mode, Some(0o100644));
        assert!(
            !file.is_new && !file.is_delete && !file.is_rename && !file.is_copy
        );
        assert_eq!(file.old_mode, file.new_mode);
        assert_eq!(file.fragments.len(), 1);
        assert_eq!(file.fragments[0].lines[0].op, Op::Add);
    }

    #[test]
    fn new_file() {
        let file = parse(
            r#"diff --git a/notes.txt b/notes.txt
new file mode 100755
index 0000000..3b18e51
--- /dev/null
+++ b/notes.txt
@@ -0,0 +1 @@
+hello
"#,
        );
        assert!(file.is_new);
        assert_eq!(file.new_mode, Some(0o100755));
        assert_eq!(file.old_path, "notes.txt");
        assert_eq!(file.new_path, "notes.txt");
    }

    #[test]
    fn deleted_file() {
        let file = parse(
            r#"diff --git a/old.txt b/old.txt
deleted file mode 100644
index 3b18e51..0000000
--- a/old.txt
+++ /dev/null
@@ -1 +0,0 @@
-hello
"#,
        );
        assert!(file.is_delete);
        assert_eq!(file.old_mode, Some(0o100644));
        assert_eq!(file.new_path, "old.txt");
    }

    #[test]
    fn rename_with_changes() {
        let file = parse(
            r#"diff --git a/src/old.rs b/src/new.rs
similarity index 90%
rename from src/old.rs
rename to src/new.rs
index 1111111..2222222 100644
--- a/src/old.rs
+++ b/src/new.rs
@@ -1 +1 @@
-fn old() {}
+fn new() {}
"#,
        );
        assert!(file.is_rename);
        assert_eq!(file.old_path, "src/old.rs");
        assert_eq!(file.new_path, "src/new.rs");
        assert_eq!(file.fragments.len(), 1);
    }

    #[test]
    fn mode_change_without_hunks() {
        let file = parse(
            "diff --git a/run.sh b/run.sh\nold mode 100644\nnew mode 100755\n",
        );
        assert_eq!(file.old_mode, Some(0o100644));
        assert_eq!(file.new_mode, Some(0o100755));
        assert_eq!(file.old_path, "run.sh");
        assert!(file.fragments.is_empty());
    }

    #[test]
    fn binary_file() {
        let file = parse(
            "diff --git a/logo.png b/logo.png\nindex 1111111..2222222 100644\nBinary files a/logo.png and b/logo.png differ\n",
        );
        assert!(file.is_binary);
        assert!(file.fragments.is_empty());
    }

    #[test]
    fn names_with_spaces() {
        let file = parse(
            "diff --git a/my file.txt b/my file.txt\n--- a/my file.txt\t\n+++ b/my file.txt\t\n@@ -1 +1 @@\n-a\n+b\n",
        );
        assert_eq!(file.old_path, "my file.txt");
        assert_eq!(file.new_path, "my file.txt");
    }

    #[test]
    fn quoted_names() {
        let file = parse(
            "diff --git \"a/caf\\303\\251.txt\" \"b/caf\\303\\251.txt\"\n--- \"a/caf\\303\\251.txt\"\n+++ \"b/caf\\303\\251.txt\"\n@@ -1 +1 @@\n-a\n+b\n",
        );
        assert_eq!(file.old_path, "café.txt");
        assert_eq!(file.new_path, "café.txt");
    }

    #[test]
    fn git_names_prefer_matching_split() {
        let names = parse_git_names("a/x b/y b/x b/y", 1).unwrap();
        assert_eq!(names, Some(("x b/y".to_string(), "x b/y".to_string())));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let mut reader = LineReader::new("diff --git \"a/broken b/broken\n");
        let result = FileDiff::parse(&mut reader);
        assert!(matches!(
            result,
            Err(ParseError::InvalidPath { line: 1, .. })
        ));
    }

    #[test]
    fn invalid_mode_is_an_error() {
        let mut reader = LineReader::new("diff --git a/x b/x\nold mode 10064x\n");
        let result = FileDiff::parse(&mut reader);
        assert!(matches!(
            result,
            Err(ParseError::InvalidMode { line: 2, .. })
        ));
    }
}
