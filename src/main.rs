use clap::builder::BoolishValueParser;
use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::Shell;
use crossterm::style::Stylize;
use git_split::tree::Expansion;
use git_split::ui::{LinePrompt, Terminal};
use git_split::{Finish, Git, SplitConfig, Splitter, logging};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "git-split")]
#[command(about = "Interactively split a git commit into smaller commits")]
#[command(version)]
struct Cli {
    /// Commit to split
    #[arg(default_value = "HEAD")]
    reference: String,

    /// Start with every file and chunk expanded
    #[arg(long, env = "GIT_SPLIT_EXPAND", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    expand: bool,

    /// Do not open the editor on each new commit
    #[arg(long, env = "GIT_SPLIT_NO_EDIT", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    no_edit: bool,

    /// Run as if started in <DIR>
    #[arg(short = 'C', value_name = "DIR", default_value = ".")]
    dir: PathBuf,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL", exclusive = true)]
    completions: Option<Shell>,

    /// Print a man page and exit
    #[arg(long, exclusive = true)]
    man: bool,
}

impl Cli {
    fn config(&self) -> SplitConfig {
        SplitConfig {
            target: self.reference.clone(),
            initial_expansion: if self.expand {
                Expansion::Expanded
            } else {
                Expansion::Collapsed
            },
            edit: !self.no_edit,
        }
    }
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "git-split", &mut io::stdout());
        return ExitCode::SUCCESS;
    }
    if cli.man {
        return match clap_mangen::Man::new(Cli::command()).render(&mut io::stdout()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(&e),
        };
    }

    let color = io::stdout().is_terminal();
    let mut splitter = Splitter::new(
        Git::new(&cli.dir),
        cli.config(),
        Terminal::new(color),
        LinePrompt,
    );

    match splitter.run() {
        Ok(Finish::Completed { commits, backup }) => {
            eprintln!("Split into {commits} commits; the original is saved as {backup}");
            ExitCode::SUCCESS
        }
        Ok(Finish::Aborted) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn fail(error: &dyn std::fmt::Display) -> ExitCode {
    eprintln!("{}", error.to_string().red());
    ExitCode::FAILURE
}
