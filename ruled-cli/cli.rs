use std::path::PathBuf;

use clap::{
  ArgAction,
  Parser,
  Subcommand,
};

#[derive(Parser, Debug)]
#[command(name = "ruled", about, long_about = None)]
pub struct Cli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count, global = true)]
  pub verbosity: u8,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
  pub config_file: Option<PathBuf>,

  /// Note file; missing files start out as an empty note
  #[arg(value_name = "NOTE")]
  pub note: PathBuf,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Print every paragraph with its index and spacing
  Show,

  /// Replace the note's content with a plain text file
  Import {
    #[arg(value_name = "FILE")]
    file: PathBuf,
  },

  /// Move a paragraph so it ends up at another index
  Move { from: usize, to: usize },

  /// Delete a paragraph
  Delete { index: usize },

  /// Open a paragraph below INDEX, optionally typing TEXT into it
  Reply {
    index: usize,
    #[arg(long, value_name = "TEXT")]
    text:  Option<String>,
  },

  /// Tie a paragraph to the next one, or separate them with --unrelated
  Relate {
    index:     usize,
    #[arg(long)]
    unrelated: bool,
  },
}

impl Command {
  /// Whether the note has to be written back.
  pub fn mutates(&self) -> bool {
    !matches!(self, Command::Show)
  }
}
