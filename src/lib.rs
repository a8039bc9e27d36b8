use error_set::error_set;

pub mod diff;
pub mod git;
pub mod logging;
pub mod split;
pub mod tree;
pub mod ui;

pub use diff::ParseError;
pub use git::Git;
pub use split::{Finish, Outcome, Prompt, SplitConfig, Selector, Splitter};
pub use tree::{Commit, Node, ParseOptions, TreeError};
pub use ui::UiError;

error_set! {
    /// Top-level error for git-split operations
    GitSplitError := {
        #[display("Changes detected in tracked files. Please commit or stash changes before splitting.")]
        DirtyWorkingTree,
        #[display("HEAD is detached; check out the branch that holds the commit to split")]
        DetachedHead,
        #[display("Failed to commit the split: {message}\nThe original branch is saved as {backup}")]
        CommitFailed { backup: String, message: String },
        #[display("Split stopped: {message}\nThe original branch is saved as {backup}")]
        SessionFailed { backup: String, message: String },
        ParseError(ParseError),
        UiError(UiError),
    } || GitCommandError

    /// Errors from git command execution
    GitCommandError := {
        #[display("Failed to run {command}: {message}")]
        SpawnFailed { command: String, message: String },
        #[display("Failed to get stdin handle for {command}")]
        StdinFailed { command: String },
        #[display("Failed to write input to {command}: {message}")]
        WriteFailed { command: String, message: String },
        #[display("Failed to wait for {command}: {message}")]
        WaitFailed { command: String, message: String },
        #[display("{command} failed: {stderr}")]
        ExitError { command: String, stderr: String },
        #[display("Invalid UTF-8 in {command} output: {message}")]
        InvalidUtf8 { command: String, message: String },
    }
}
