//! Full-screen selection front end on crossterm.
//!
//! Key handling is kept apart from drawing: [`action_for_key`] maps a key to
//! an [`Action`] and [`apply`] runs it against the tree, so neither needs a
//! terminal.

use crate::split::{Outcome, Prompt, Selector};
use crate::tree::{Commit, DisplayOptions, Expansion, Node, TreeError};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Print, PrintStyledContent, SetAttribute, Stylize, style};
use crossterm::terminal::{
    self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
    LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{execute, queue};
use error_set::error_set;
use std::io::{self, BufRead, Write};

error_set! {
    /// Errors from the interactive front end
    UiError := {
        #[display("Terminal I/O failed: {message}")]
        Io { message: String },
        TreeError(TreeError),
    }
}

fn io_error(e: io::Error) -> UiError {
    UiError::Io {
        message: e.to_string(),
    }
}

/// Rows moved by shift+arrows and page keys.
const PAGE: usize = 15;

const BINDINGS: &[(&str, &str)] = &[
    ("space", "toggle selection"),
    ("a", "select all"),
    ("A", "select none"),
    ("q", "abort"),
    ("c", "confirm"),
    ("up/down", "navigate"),
    ("left/right", "collapse/expand"),
    ("+/-", "expand/collapse all"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up(usize),
    Down(usize),
    Top,
    Bottom,
    Toggle,
    SelectAll,
    SelectNone,
    Collapse,
    Expand,
    CollapseAll,
    ExpandAll,
    Confirm,
    Abort,
}

pub fn action_for_key(key: KeyEvent) -> Option<Action> {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    Some(match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Abort,
        KeyCode::Up if shift => Action::Up(PAGE),
        KeyCode::Up => Action::Up(1),
        KeyCode::Down if shift => Action::Down(PAGE),
        KeyCode::Down => Action::Down(1),
        KeyCode::PageUp => Action::Up(PAGE),
        KeyCode::PageDown => Action::Down(PAGE),
        KeyCode::Home => Action::Top,
        KeyCode::End => Action::Bottom,
        KeyCode::Char(' ') => Action::Toggle,
        KeyCode::Char('a') => Action::SelectAll,
        KeyCode::Char('A') => Action::SelectNone,
        KeyCode::Left => Action::Collapse,
        KeyCode::Right => Action::Expand,
        KeyCode::Char('+') => Action::ExpandAll,
        KeyCode::Char('-') => Action::CollapseAll,
        KeyCode::Char('c') => Action::Confirm,
        KeyCode::Char('q') | KeyCode::Esc => Action::Abort,
        _ => return None,
    })
}

/// Highlighted row of the listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub row: usize,
}

impl Cursor {
    /// Keep the cursor on an existing row.
    pub fn clamp(&mut self, rows: usize) {
        self.row = self.row.min(rows.saturating_sub(1));
    }
}

/// Run one action against the tree. The commit must have been rendered
/// since its last change, so rows map to nodes.
///
/// Returns the session outcome for confirm and abort.
pub fn apply(
    commit: &mut Commit,
    cursor: &mut Cursor,
    action: Action,
) -> Result<Option<Outcome>, TreeError> {
    let rows = commit.line_index()?.len();
    let current = if rows == 0 {
        None
    } else {
        Some(commit.node_at(cursor.row.min(rows - 1))?)
    };

    match (action, current) {
        (Action::Confirm, _) => return Ok(Some(Outcome::Confirm)),
        (Action::Abort, _) => return Ok(Some(Outcome::Abort)),
        (Action::Up(n), _) => cursor.row = cursor.row.saturating_sub(n),
        (Action::Down(n), _) => cursor.row = cursor.row.saturating_add(n),
        (Action::Top, _) => cursor.row = 0,
        (Action::Bottom, _) => cursor.row = rows.saturating_sub(1),
        (Action::SelectAll, _) => commit.select_all(),
        (Action::SelectNone, _) => commit.select_none(),
        (Action::ExpandAll, _) => commit.expand_all(),
        (Action::CollapseAll, _) => commit.collapse_all(),
        (_, None) => {}
        (Action::Toggle, Some(node)) => commit.toggle(node),
        (Action::Expand, Some(node)) => {
            commit.set_expansion(node, Expansion::Expanded);
        }
        (Action::Collapse, Some(node)) => collapse(commit, cursor, node)?,
    }
    cursor.clamp(rows);
    Ok(None)
}

/// Collapse the node, or move to the parent row when there is nothing left
/// to collapse.
fn collapse(commit: &mut Commit, cursor: &mut Cursor, node: Node) -> Result<(), TreeError> {
    match (node, commit.expansion(node)) {
        (Node::File(_), _) | (Node::Chunk(_), Some(Expansion::Expanded)) => {
            commit.set_expansion(node, Expansion::Collapsed);
        }
        _ => {
            if let Some(parent) = commit.parent(node)
                && let Some(row) = commit.row_of(parent)?
            {
                cursor.row = row;
            }
        }
    }
    Ok(())
}

/// Interactive selector on the process's terminal.
#[derive(Debug, Default)]
pub struct Terminal {
    cursor: Cursor,
    /// First listing row on screen
    top: usize,
    color: bool,
}

impl Terminal {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    fn draw(
        &mut self,
        out: &mut impl Write,
        listing: &str,
        status: Option<&str>,
    ) -> io::Result<()> {
        let (_, height) = terminal::size()?;
        let height = usize::from(height);
        // help line on top, status line at the bottom
        let view = height.saturating_sub(2).max(1);

        if self.cursor.row < self.top {
            self.top = self.cursor.row;
        } else if self.cursor.row >= self.top + view {
            self.top = self.cursor.row + 1 - view;
        }

        queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
        for &(key, usage) in BINDINGS {
            queue!(
                out,
                PrintStyledContent(style(key).cyan()),
                Print(format!(": {usage}  "))
            )?;
        }

        for (offset, line) in listing.lines().skip(self.top).take(view).enumerate() {
            queue!(out, MoveTo(0, screen_row(offset + 1)))?;
            if self.top + offset == self.cursor.row {
                queue!(
                    out,
                    SetAttribute(Attribute::Reverse),
                    Print(line),
                    SetAttribute(Attribute::Reset)
                )?;
            } else {
                queue!(out, Print(line))?;
            }
        }

        if let Some(status) = status {
            let status = status_line(status);
            queue!(
                out,
                MoveTo(0, screen_row(height.saturating_sub(1))),
                PrintStyledContent(style(status).red())
            )?;
        }
        out.flush()
    }
}

/// Fold a multi-line message, such as git's stderr, onto one row.
fn status_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn screen_row(row: usize) -> u16 {
    u16::try_from(row).unwrap_or(u16::MAX)
}

impl Selector for Terminal {
    fn select(&mut self, commit: &mut Commit, error: Option<&str>) -> Result<Outcome, UiError> {
        let mut out = io::stdout();
        enable_raw_mode().map_err(io_error)?;
        let _guard = TerminalGuard;
        execute!(out, EnterAlternateScreen, DisableLineWrap, Hide).map_err(io_error)?;

        let mut status = error.map(str::to_string);
        loop {
            let listing = commit.render(DisplayOptions { color: self.color });
            self.cursor.clamp(commit.line_index()?.len());
            self.draw(&mut out, &listing, status.as_deref())
                .map_err(io_error)?;

            let Event::Key(key) = event::read().map_err(io_error)? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            status = None;
            if let Some(action) = action_for_key(key)
                && let Some(outcome) = apply(commit, &mut self.cursor, action)?
            {
                tracing::debug!(?outcome, "selection finished");
                return Ok(outcome);
            }
        }
    }
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, EnableLineWrap, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Asks on stdin, in cooked mode.
#[derive(Debug, Default)]
pub struct LinePrompt;

impl Prompt for LinePrompt {
    fn continue_splitting(&mut self) -> Result<bool, UiError> {
        print!("Do you want to continue splitting? [Y/n]: ");
        io::stdout().flush().map_err(io_error)?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer).map_err(io_error)?;
        Ok(parse_answer(&answer))
    }
}

/// Anything but an explicit no continues.
fn parse_answer(answer: &str) -> bool {
    !answer.trim_start().starts_with(['n', 'N'])
}
