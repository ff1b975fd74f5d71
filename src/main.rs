use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use gatecheck::cli::{dispatch, Cli};
use gatecheck::error::{GateError, EXIT_MALFORMED};
use gatecheck::logging::init_logging;

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dispatch(cli.command)
}

fn main() -> ExitCode {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            err.downcast_ref::<GateError>()
                .map(GateError::exit_code)
                .unwrap_or(EXIT_MALFORMED)
        }
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
