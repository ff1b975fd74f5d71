use anyhow::Result;
use clap::CommandFactory;

use super::types::{Cli, Commands};
use crate::commands::{list, route, run};
use crate::completions::generate_completions;

/// Run a subcommand and return the process exit code.
pub fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run {
            input,
            execution,
            format,
        } => run::execute(&input, &execution, format),
        Commands::Route {
            entry,
            task,
            project,
            format,
        } => route::execute(&entry, &task, &project, format),
        Commands::List { input, format } => list::execute(&input, format),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate_completions(&mut cmd, shell, &mut std::io::stdout());
            Ok(0)
        }
    }
}
