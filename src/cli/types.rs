use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::completions::Shell;
use crate::report::GateMode;

#[derive(Parser)]
#[command(name = "gatecheck")]
#[command(about = "Compliance gate for verification blocks in guidance documents", long_about = None)]
#[command(version)]
#[command(subcommand_help_heading = "Commands")]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Route, extract and execute verification tests, then report the gate decision
    Run {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        execution: ExecutionArgs,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show which documents a task routes to
    Route {
        /// Entry document to start routing from
        #[arg(long)]
        entry: PathBuf,

        /// Task keywords (repeatable or comma-separated)
        #[arg(short, long = "task")]
        task: Vec<String>,

        /// Project root
        #[arg(long, default_value = ".")]
        project: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List resolved tests in execution order without running them
    List {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Generate shell completion script
    ///
    /// Add to your shell config:
    ///   bash: eval "$(gatecheck completions bash)"
    ///   zsh:  eval "$(gatecheck completions zsh)"
    ///   fish: gatecheck completions fish | source
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Which documents to check and how to resolve their variables
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Entry document; routing follows matching conditional blocks from here
    #[arg(long, conflicts_with = "doc", required_unless_present = "doc")]
    pub entry: Option<PathBuf>,

    /// Explicit document path or glob (repeatable); bypasses routing
    #[arg(long)]
    pub doc: Vec<String>,

    /// Task keywords (repeatable or comma-separated)
    #[arg(short, long = "task")]
    pub task: Vec<String>,

    /// Variable override NAME=VALUE (repeatable)
    #[arg(long = "var")]
    pub var: Vec<String>,

    /// Project root
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// Config file (default: <project>/gatecheck.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Overrides for the `[run]` table of the config
#[derive(Args, Debug, Clone, Default)]
pub struct ExecutionArgs {
    /// Gate mode
    #[arg(long, value_enum)]
    pub mode: Option<GateMode>,

    /// Per-test timeout in seconds (default: 30)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Maximum number of tests running at once (default: 4)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub jobs: Option<u64>,

    /// Extra attempts for a failing command (default: 0)
    #[arg(long)]
    pub retries: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
