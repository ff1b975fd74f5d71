use anyhow::Result;

use super::common::build_request;
use crate::cli::{ExecutionArgs, InputArgs, OutputFormat};
use crate::pipeline::GateRun;
use crate::report::{render_json, render_text};

/// Execute the gate and print the report. Returns the gate's exit code.
pub fn execute(input: &InputArgs, execution: &ExecutionArgs, format: OutputFormat) -> Result<i32> {
    let request = build_request(input, execution)?;
    let report = GateRun::execute(request)?;

    match format {
        OutputFormat::Json => println!("{}", render_json(&report)?),
        OutputFormat::Text => print!("{}", render_text(&report)),
    }
    Ok(report.exit_code)
}
