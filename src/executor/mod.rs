//! Test execution: running rendered commands and classifying the outcome.

pub mod config;
pub mod process;
pub mod scheduler;

use std::path::Path;

use tracing::debug;

use crate::models::{ExecutionResult, PlannedTest, TestStatus};

pub use config::{ExecutorConfig, DEFAULT_COMMAND_TIMEOUT, DEFAULT_MAX_PARALLEL};
pub use process::{run_command, CommandOutcome};
pub use scheduler::{ExecutionOutcome, Scheduler};

/// Characters of command output kept on a failed result
const OUTPUT_EXCERPT_CHARS: usize = 2000;

/// Map a finished command onto a status and message.
///
/// - exit 0: `pass`
/// - timeout: `fail`, whatever the test's flags
/// - nonzero on a blocking test: `blocked`
/// - any other nonzero: `fail`
pub fn classify(test: &PlannedTest, outcome: &CommandOutcome, timeout_secs: u64) -> (TestStatus, String) {
    if outcome.timed_out {
        return (TestStatus::Fail, format!("timed out after {timeout_secs}s"));
    }
    if outcome.success() {
        return (TestStatus::Pass, "passed".to_string());
    }
    let message = match outcome.exit_code {
        Some(code) => format!("exited with code {code}"),
        None => "terminated by signal".to_string(),
    };
    let status = if test.blocking {
        TestStatus::Blocked
    } else {
        TestStatus::Fail
    };
    (status, message)
}

/// Run one test to completion, with retries for failing commands.
///
/// Timeouts are not retried. A test without rendered commands never reaches
/// this point; it is settled as a variable failure by the scheduler.
pub fn run_test(test: &PlannedTest, working_dir: &Path, config: &ExecutorConfig) -> ExecutionResult {
    let Some(commands) = test.commands() else {
        return ExecutionResult::unresolved(test)
            .unwrap_or_else(|| ExecutionResult::skipped(test, "not renderable"));
    };
    let timeout_secs = config.command_timeout.as_secs();

    let mut attempts = 0u32;
    let mut elapsed = std::time::Duration::ZERO;
    loop {
        attempts += 1;
        let outcome = match run_command(&commands.command, working_dir, config.command_timeout) {
            Ok(outcome) => outcome,
            Err(e) => {
                let mut result = ExecutionResult::completed(
                    test,
                    TestStatus::Fail,
                    format!("failed to spawn shell: {e}"),
                );
                result.attempts = attempts;
                result.duration = elapsed;
                return result;
            }
        };
        elapsed += outcome.duration;

        let retry = !outcome.success() && !outcome.timed_out && attempts <= config.retries;
        if retry {
            debug!(test = %test.id, attempt = attempts, "retrying failed command");
            continue;
        }

        let (status, message) = classify(test, &outcome, timeout_secs);
        debug!(test = %test.id, status = status.label(), attempts, "test finished");
        let mut result = ExecutionResult::completed(test, status, message);
        result.duration = elapsed;
        result.exit_code = outcome.exit_code;
        result.timed_out = outcome.timed_out;
        result.attempts = attempts;
        if !status.is_pass() {
            result.output = outcome.excerpt(OUTPUT_EXCERPT_CHARS);
        }
        return result;
    }
}
