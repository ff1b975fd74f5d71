use anyhow::Result;
use colored::Colorize;

use super::common::{build_request, truncate};
use crate::cli::{ExecutionArgs, InputArgs, OutputFormat};
use crate::models::{PlannedTest, Rendering};
use crate::pipeline::{GateRun, Plan};

const COMMAND_WIDTH: usize = 60;

/// Print the resolved test plan without executing anything.
pub fn execute(input: &InputArgs, format: OutputFormat) -> Result<i32> {
    let request = build_request(input, &ExecutionArgs::default())?;
    let plan = GateRun::plan(request)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Text => print!("{}", render_plan(&plan)),
    }
    Ok(0)
}

fn flags(test: &PlannedTest) -> &'static str {
    match (test.required, test.blocking) {
        (_, true) => "blocking",
        (true, false) => "required",
        (false, false) => "advisory",
    }
}

pub fn render_plan(plan: &Plan) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Documents:".bold()));
    for doc in &plan.documents {
        out.push_str(&format!("  {doc}\n"));
    }

    out.push_str(&format!("\n{} ({})\n", "Tests:".bold(), plan.tests.len()));
    for (n, test) in plan.tests.iter().enumerate() {
        let detail = match &test.rendering {
            Rendering::Ready(commands) => truncate(&commands.command, COMMAND_WIDTH),
            Rendering::Unresolved(err) => format!("unresolved: {}", err.unresolved.join(", "))
                .as_str()
                .red()
                .to_string(),
        };
        out.push_str(&format!(
            "  {:>3}. {} [{}]  {}\n",
            n + 1,
            test.id.as_str().cyan(),
            flags(test),
            detail
        ));
        if !test.depends_on.is_empty() {
            let deps: Vec<&str> = test.depends_on.iter().map(|d| d.as_str()).collect();
            out.push_str(&format!("       after {}\n", deps.join(", ").as_str().dimmed()));
        }
    }
    out
}
