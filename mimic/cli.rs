use std::path::PathBuf;

use clap::{
  ArgAction,
  Parser,
  Subcommand,
};

#[derive(Parser, Debug)]
#[command(
  name = "mimic",
  about = "Compile file edits into ghost actions and replay them",
  version
)]
pub struct Cli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count, global = true)]
  pub verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE", global = true)]
  pub log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
  pub config_file: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Compile the change from OLD to NEW into a replay record
  Compile {
    old:  PathBuf,
    new:  PathBuf,
    /// File path stored in the record (defaults to NEW)
    #[arg(long, value_name = "PATH")]
    path: Option<String>,
    /// Write the record here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    out:  Option<PathBuf>,
  },

  /// Count added and deleted lines and characters between OLD and NEW
  Stats { old: PathBuf, new: PathBuf },

  /// List the actions of a record
  Actions { record: PathBuf },

  /// Replay records without timing and check they reproduce their new content
  Verify {
    #[arg(required = true)]
    records: Vec<PathBuf>,
  },

  /// Replay records in real time
  Play {
    #[arg(required = true)]
    records:     Vec<PathBuf>,
    /// Playback speed multiplier
    #[arg(short, long, value_name = "N")]
    speed:       Option<f64>,
    /// Stop after each record instead of moving on to the next one
    #[arg(long)]
    no_autoplay: bool,
    /// Read transport commands from stdin
    #[arg(short, long)]
    interactive: bool,
  },
}
