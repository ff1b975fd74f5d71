//! Text and JSON rendering of a [`Report`]

use std::fmt::Write;

use colored::Colorize;

use crate::models::{ExecutionResult, TestStatus};

use super::{GateDecision, GateMode, Report};

pub fn render_json(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

fn status_marker(status: TestStatus) -> colored::ColoredString {
    match status {
        TestStatus::Pass => "✓".green(),
        TestStatus::Fail => "✗".red(),
        TestStatus::Skipped => "−".dimmed(),
        TestStatus::Blocked => "■".red().bold(),
    }
}

fn status_label(result: &ExecutionResult) -> colored::ColoredString {
    let label = result.status.label();
    match result.status {
        TestStatus::Pass => label.green(),
        TestStatus::Fail if result.advisory => format!("{label} (advisory)").as_str().yellow(),
        TestStatus::Fail => label.red(),
        TestStatus::Skipped => label.dimmed(),
        TestStatus::Blocked => label.red().bold(),
    }
}

pub fn render_text(report: &Report) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "Results:".bold());
    for result in &report.results {
        let _ = writeln!(
            out,
            "  {} {} {} {}",
            status_marker(result.status),
            result.id,
            status_label(result),
            format!("({}ms)", result.duration.as_millis()).as_str().dimmed()
        );
    }

    let failures: Vec<&ExecutionResult> = report.failures().collect();
    if !failures.is_empty() {
        let _ = writeln!(out, "\n{}", "Failures:".bold());
        for result in failures {
            let _ = writeln!(out, "  {} {}", status_marker(result.status), result.id.as_str().bold());
            let _ = writeln!(out, "      {}", result.message);
            if let Some(error) = &result.error_message {
                if result.status != TestStatus::Skipped {
                    let _ = writeln!(out, "      {} {}", "Error:".dimmed(), error);
                }
            }
            if let Some(fix) = &result.fix_command {
                let _ = writeln!(out, "      {} {}", "Fix:".dimmed(), fix);
            }
        }
    }

    if let Some(halted_by) = &report.halted_by {
        let _ = writeln!(
            out,
            "\n{} batch halted by blocking test {}",
            "■".red().bold(),
            halted_by
        );
    }

    let s = &report.summary;
    let _ = writeln!(
        out,
        "\n{} {} total, {} passed, {} failed, {} skipped, {} blocked",
        "Summary:".bold(),
        s.total,
        s.pass,
        s.fail,
        s.skipped,
        s.blocked
    );

    let decision = match report.decision {
        GateDecision::Pass => "PASS".green().bold(),
        GateDecision::Fail => "FAIL".red().bold(),
        GateDecision::Malformed => "MALFORMED".red().bold(),
    };
    let mode = match report.mode {
        GateMode::Blocking => "blocking",
        GateMode::Advisory => "advisory",
    };
    let _ = writeln!(out, "{} {decision} ({mode} mode, exit {})", "Gate:".bold(), report.exit_code);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::CacheStats;
    use crate::models::TestId;
    use std::time::Duration;

    fn report() -> Report {
        let failing = ExecutionResult {
            id: TestId::new("std", "tests_dir"),
            status: TestStatus::Fail,
            message: "exited with code 1".to_string(),
            duration: Duration::from_millis(12),
            exit_code: Some(1),
            timed_out: false,
            attempts: 1,
            required: true,
            blocking: false,
            advisory: false,
            error_message: Some("No tests directory".to_string()),
            fix_command: Some("mkdir -p tests".to_string()),
            output: None,
            unresolved_variables: Vec::new(),
        };
        let mut passing = failing.clone();
        passing.id = TestId::new("std", "readme");
        passing.status = TestStatus::Pass;
        Report::new(
            GateMode::Blocking,
            vec![passing, failing],
            None,
            vec!["docs/index.md".to_string()],
            CacheStats::default(),
        )
    }

    #[test]
    fn test_text_lists_failures_with_fix() {
        colored::control::set_override(false);
        let text = render_text(&report());
        assert!(text.contains("✓ std/readme pass"));
        assert!(text.contains("✗ std/tests_dir fail"));
        assert!(text.contains("Error: No tests directory"));
        assert!(text.contains("Fix: mkdir -p tests"));
        assert!(text.contains("2 total, 1 passed, 1 failed"));
        assert!(text.contains("Gate: FAIL (blocking mode, exit 1)"));
    }

    #[test]
    fn test_json_shape() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&report()).unwrap()).unwrap();
        assert_eq!(json["decision"], "fail");
        assert_eq!(json["mode"], "blocking");
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["phase"], "reported");
        assert_eq!(json["summary"]["fail"], 1);
        assert_eq!(json["results"][1]["fix_command"], "mkdir -p tests");
        assert!(json.get("halted_by").is_none());
    }
}
