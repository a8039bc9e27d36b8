//! Thin wrapper over the `git` executable.
//!
//! Every call runs `git -C <dir> ...` and captures its output; only
//! [`Git::amend`] hands the terminal to git so the user's editor can run.

use crate::GitCommandError;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

/// Runs git commands against one repository.
#[derive(Debug, Clone)]
pub struct Git {
    dir: PathBuf,
}

impl Git {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Patch text taking `from` to `to`, with the standard `a/` and `b/`
    /// prefixes whatever the user's diff configuration says.
    pub fn diff(&self, from: &str, to: &str) -> Result<String, GitCommandError> {
        self.run(&[
            "diff",
            "--no-ext-diff",
            "--no-color",
            "--src-prefix=a/",
            "--dst-prefix=b/",
            "-p",
            from,
            to,
        ])
    }

    pub fn is_different(&self, from: &str, to: &str) -> Result<bool, GitCommandError> {
        Ok(!self.diff(from, to)?.is_empty())
    }

    /// Apply a patch to the working tree without touching the index.
    pub fn apply(&self, patch: &str) -> Result<(), GitCommandError> {
        self.run_with_input(&["apply", "--recount", "-"], patch)?;
        Ok(())
    }

    /// Whether tracked files have changes. Untracked files do not count.
    pub fn has_changes(&self) -> Result<bool, GitCommandError> {
        let status = self.run(&["status", "--porcelain"])?;
        Ok(status
            .lines()
            .any(|line| !line.is_empty() && !line.starts_with("??")))
    }

    /// A commit's metadata rendered through a `--format` string.
    pub fn show_description(&self, rev: &str, format: &str) -> Result<String, GitCommandError> {
        let format = format!("--format={format}");
        self.run(&["show", "--no-patch", "--no-color", format.as_str(), rev])
    }

    /// The checked-out branch name, empty when HEAD is detached.
    pub fn current_branch(&self) -> Result<String, GitCommandError> {
        Ok(self.run(&["branch", "--show-current"])?.trim().to_string())
    }

    /// Resolve a revision to a full hash.
    pub fn rev_parse(&self, rev: &str) -> Result<String, GitCommandError> {
        let hash = self.run(&["rev-parse", "--verify", rev])?;
        Ok(hash.trim().to_string())
    }

    pub fn branch_exists(&self, name: &str) -> Result<bool, GitCommandError> {
        let reference = format!("refs/heads/{name}");
        let args = ["rev-parse", "--verify", "--quiet", reference.as_str()];
        let output = self.output(&args)?;
        Ok(output.status.success())
    }

    /// Create a branch at HEAD without switching to it.
    pub fn create_branch(&self, name: &str) -> Result<(), GitCommandError> {
        self.run(&["branch", name])?;
        Ok(())
    }

    pub fn force_delete_branch(&self, name: &str) -> Result<(), GitCommandError> {
        self.run(&["branch", "-D", name])?;
        Ok(())
    }

    pub fn checkout(&self, rev: &str) -> Result<(), GitCommandError> {
        self.run(&["checkout", "--quiet", rev])?;
        Ok(())
    }

    /// Stage `paths`, including deletions.
    pub fn add(&self, paths: &[String]) -> Result<(), GitCommandError> {
        let mut args = vec!["add", "-A", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run(&args)?;
        Ok(())
    }

    /// Commit the index with `message`. Comment lines are stripped.
    pub fn commit(&self, message: &str) -> Result<(), GitCommandError> {
        self.run_with_input(
            &["commit", "--quiet", "--cleanup=strip", "-F", "-"],
            message,
        )?;
        Ok(())
    }

    /// Open the user's editor on the last commit.
    pub fn amend(&self) -> Result<(), GitCommandError> {
        let args = ["commit", "--amend"];
        let command = command_line(&args);
        tracing::debug!(%command, "running");

        let status = self
            .command(&args)
            .status()
            .map_err(|e| GitCommandError::SpawnFailed {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !status.success() {
            return Err(GitCommandError::ExitError {
                command,
                stderr: format!("exited with {status}"),
            });
        }
        Ok(())
    }

    /// Replay `branch` onto `upstream`, leaving `branch` checked out.
    pub fn rebase(&self, upstream: &str, branch: &str) -> Result<(), GitCommandError> {
        self.run(&["rebase", "--quiet", upstream, branch])?;
        Ok(())
    }

    pub fn reset_hard(&self) -> Result<(), GitCommandError> {
        self.run(&["reset", "--quiet", "--hard"])?;
        Ok(())
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new("git");
        command.arg("-C").arg(&self.dir).args(args);
        command
    }

    /// Run to completion and capture output, whatever the exit status.
    fn output(&self, args: &[&str]) -> Result<Output, GitCommandError> {
        let command = command_line(args);
        tracing::debug!(%command, "running");
        self.command(args)
            .output()
            .map_err(|e| GitCommandError::SpawnFailed {
                command,
                message: e.to_string(),
            })
    }

    fn run(&self, args: &[&str]) -> Result<String, GitCommandError> {
        let output = self.output(args)?;
        check(args, output)
    }

    fn run_with_input(&self, args: &[&str], input: &str) -> Result<String, GitCommandError> {
        let command = command_line(args);
        tracing::debug!(%command, bytes = input.len(), "running with input");

        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GitCommandError::SpawnFailed {
                command: command.clone(),
                message: e.to_string(),
            })?;

        child
            .stdin
            .take()
            .ok_or_else(|| GitCommandError::StdinFailed {
                command: command.clone(),
            })?
            .write_all(input.as_bytes())
            .map_err(|e| GitCommandError::WriteFailed {
                command: command.clone(),
                message: e.to_string(),
            })?;

        let output = child
            .wait_with_output()
            .map_err(|e| GitCommandError::WaitFailed {
                command,
                message: e.to_string(),
            })?;

        check(args, output)
    }
}

fn command_line(args: &[&str]) -> String {
    format!("git {}", args.join(" "))
}

fn check(args: &[&str], output: Output) -> Result<String, GitCommandError> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitCommandError::ExitError {
            command: command_line(args),
            stderr: stderr.trim_end().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|e| GitCommandError::InvalidUtf8 {
        command: command_line(args),
        message: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn command_line_joins_arguments() {
        assert_eq!(
            command_line(&["apply", "--recount", "-"]),
            "git apply --recount -"
        );
    }

    #[test]
    fn failed_exit_reports_command_and_stderr() {
        let output = Output {
            status: exit_status(128),
            stdout: Vec::new(),
            stderr: b"fatal: not a git repository\n".to_vec(),
        };
        let err = check(&["status"], output).unwrap_err();
        assert_eq!(
            err.to_string(),
            "git status failed: fatal: not a git repository"
        );
    }

    #[cfg(unix)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code as u32)
    }
}
