//! One split session: turn a target commit into a series of smaller commits
//! chosen interactively.

use crate::git::Git;
use crate::tree::{Commit, Expansion, ParseOptions};
use crate::ui::UiError;
use crate::{GitCommandError, GitSplitError};

/// Pre-filled commit message. Comment lines are stripped when committing.
const DESCRIPTION_FORMAT: &str = "# Original commit: %H
# Author: %an <%ae>
# Date:   %ad
#
# The original commit message is below. You may edit it as you see fit.
%B";

const BACKUP_PREFIX: &str = "git-split-backups/";

/// Settings for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitConfig {
    /// Revision of the commit to split
    pub target: String,
    pub initial_expansion: Expansion,
    /// Open the editor on each new commit
    pub edit: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            target: "HEAD".to_string(),
            initial_expansion: Expansion::Collapsed,
            edit: true,
        }
    }
}

/// What the user decided on the selection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Commit the current selection
    Confirm,
    /// Stop splitting and restore the original branch
    Abort,
}

/// The front end that lets the user pick what goes into the next commit.
pub trait Selector {
    /// Let the user edit `commit`'s selection. `error` is the reason the
    /// previous confirmation could not be applied, if any.
    fn select(&mut self, commit: &mut Commit, error: Option<&str>) -> Result<Outcome, UiError>;
}

impl<S: Selector + ?Sized> Selector for &mut S {
    fn select(&mut self, commit: &mut Commit, error: Option<&str>) -> Result<Outcome, UiError> {
        (**self).select(commit, error)
    }
}

/// Asks whether to keep splitting after a commit.
pub trait Prompt {
    /// `false` commits everything that remains in one final commit.
    fn continue_splitting(&mut self) -> Result<bool, UiError>;
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finish {
    /// Every change was committed and the original branch rebased on top.
    Completed {
        commits: usize,
        /// Branch that still points at the original history
        backup: String,
    },
    /// The user aborted; the original branch is checked out unchanged.
    Aborted,
}

/// Branch state captured before the session moves HEAD.
struct Session {
    branch: String,
    backup: String,
    target: String,
}

pub struct Splitter<S, P> {
    git: Git,
    config: SplitConfig,
    selector: S,
    prompt: P,
}

impl<S: Selector, P: Prompt> Splitter<S, P> {
    pub fn new(git: Git, config: SplitConfig, selector: S, prompt: P) -> Self {
        Self {
            git,
            config,
            selector,
            prompt,
        }
    }

    /// Run the session to completion.
    ///
    /// # Errors
    ///
    /// Fails before touching anything if tracked files are modified or HEAD
    /// is detached. Once HEAD has moved, any failure discards the work in
    /// progress, checks out the original branch again and reports the
    /// backup branch.
    pub fn run(&mut self) -> Result<Finish, GitSplitError> {
        let session = self.start()?;
        self.split(&session)
            .map_err(|err| self.restore(&session, err))
    }

    fn split(&mut self, session: &Session) -> Result<Finish, GitSplitError> {
        let mut finish_up = false;
        let mut commits = 0;

        loop {
            let mut commit = Commit::parse(
                &self.git.diff("HEAD", &session.target)?,
                ParseOptions {
                    initial_expansion: self.config.initial_expansion,
                },
            )?;

            if commit.is_empty() {
                self.git.rebase("HEAD", &session.branch)?;
                tracing::info!(commits, backup = %session.backup, "split complete");
                return Ok(Finish::Completed {
                    commits,
                    backup: session.backup.clone(),
                });
            }

            commit.description = self
                .git
                .show_description(&session.target, DESCRIPTION_FORMAT)?;

            if finish_up {
                self.git.apply(&commit.to_patch())?;
            } else if !self.select_and_apply(&mut commit)? {
                self.git.checkout(&session.branch)?;
                self.git.force_delete_branch(&session.backup)?;
                tracing::info!("split aborted");
                return Ok(Finish::Aborted);
            }

            self.commit(&commit, session)?;
            commits += 1;
            tracing::info!(commits, "committed split");

            if !finish_up
                && self.git.is_different("HEAD", &session.target)?
                && !self.prompt.continue_splitting()?
            {
                finish_up = true;
            }
        }
    }

    /// Discard the work in progress and go back to the original branch.
    /// The backup branch is kept and named in the returned error.
    fn restore(&self, session: &Session, err: GitSplitError) -> GitSplitError {
        tracing::warn!(%err, "split failed, restoring original branch");
        let restored = self
            .git
            .reset_hard()
            .and_then(|()| self.git.checkout(&session.branch));
        if let Err(restore_err) = restored {
            tracing::error!(%restore_err, branch = %session.branch, "could not restore branch");
        }

        match err {
            GitSplitError::CommitFailed { .. } => err,
            other => GitSplitError::SessionFailed {
                backup: session.backup.clone(),
                message: other.to_string(),
            },
        }
    }

    /// Check preconditions, save the branch and move to the target's parent.
    fn start(&self) -> Result<Session, GitSplitError> {
        if self.git.has_changes()? {
            return Err(GitSplitError::DirtyWorkingTree);
        }

        let branch = self.git.current_branch()?;
        if branch.is_empty() {
            return Err(GitSplitError::DetachedHead);
        }

        // Hashes stay valid while HEAD moves around
        let target = self.git.rev_parse(&self.config.target)?;
        let parent = self.git.rev_parse(&format!("{target}^"))?;

        let backup = self.backup_name(&branch)?;
        self.git.create_branch(&backup)?;
        tracing::info!(%branch, %backup, %target, "starting split");

        if let Err(err) = self.git.checkout(&parent) {
            self.git.force_delete_branch(&backup)?;
            return Err(err.into());
        }
        Ok(Session {
            branch,
            backup,
            target,
        })
    }

    fn backup_name(&self, branch: &str) -> Result<String, GitCommandError> {
        let base = format!("{BACKUP_PREFIX}{branch}");
        let mut name = base.clone();
        let mut suffix = 0;
        while self.git.branch_exists(&name)? {
            suffix += 1;
            name = format!("{base}.{suffix}");
        }
        Ok(name)
    }

    /// Show the selector until the user aborts or a selection applies
    /// cleanly. Returns false on abort.
    fn select_and_apply(&mut self, commit: &mut Commit) -> Result<bool, GitSplitError> {
        let mut error: Option<String> = None;
        loop {
            match self.selector.select(commit, error.as_deref())? {
                Outcome::Abort => return Ok(false),
                Outcome::Confirm if commit.selected_files().is_empty() => {
                    error = Some("Nothing is selected".to_string());
                }
                Outcome::Confirm => match self.git.apply(&commit.to_patch()) {
                    Ok(()) => return Ok(true),
                    Err(err) => {
                        tracing::warn!(%err, "selected changes did not apply");
                        error = Some(err.to_string());
                    }
                },
            }
        }
    }

    /// Stage and commit what was applied.
    fn commit(&self, commit: &Commit, session: &Session) -> Result<(), GitSplitError> {
        self.git
            .add(&commit.selected_paths())
            .and_then(|()| self.git.commit(&commit.description))
            .and_then(|()| {
                if self.config.edit {
                    self.git.amend()
                } else {
                    Ok(())
                }
            })
            .map_err(|err| GitSplitError::CommitFailed {
                backup: session.backup.clone(),
                message: err.to_string(),
            })
    }
}
