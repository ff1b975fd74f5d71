//! Aggregation of execution results into a gate decision.

pub mod format;

use serde::{Deserialize, Serialize};

use crate::error::{VariableError, EXIT_MALFORMED};
use crate::extract::CacheStats;
use crate::models::{ExecutionResult, TestId, TestStatus};
use crate::pipeline::RunPhase;

pub use format::{render_json, render_text};

pub const EXIT_PASS: i32 = 0;
pub const EXIT_GATE_FAILED: i32 = 1;

/// Whether a failing gate stops the calling workflow
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    #[default]
    Blocking,
    Advisory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateDecision {
    Pass,
    Fail,
    Malformed,
}

impl GateDecision {
    /// Exit code under blocking semantics
    pub fn exit_code(&self) -> i32 {
        match self {
            GateDecision::Pass => EXIT_PASS,
            GateDecision::Fail => EXIT_GATE_FAILED,
            GateDecision::Malformed => EXIT_MALFORMED,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub pass: usize,
    pub fail: usize,
    pub skipped: usize,
    pub blocked: usize,
}

impl Summary {
    pub fn count(results: &[ExecutionResult]) -> Self {
        let mut summary = Summary {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            match result.status {
                TestStatus::Pass => summary.pass += 1,
                TestStatus::Fail => summary.fail += 1,
                TestStatus::Skipped => summary.skipped += 1,
                TestStatus::Blocked => summary.blocked += 1,
            }
        }
        summary
    }
}

/// Outcome of one run. Contains no timestamps, so an unchanged batch
/// produces the same report apart from durations.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub mode: GateMode,
    pub decision: GateDecision,
    pub exit_code: i32,
    pub phase: RunPhase,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_by: Option<TestId>,
    pub documents: Vec<String>,
    pub cache: CacheStats,
    /// In topological order
    pub results: Vec<ExecutionResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variable_errors: Vec<VariableError>,
}

impl Report {
    pub fn new(
        mode: GateMode,
        results: Vec<ExecutionResult>,
        halted_by: Option<TestId>,
        documents: Vec<String>,
        cache: CacheStats,
    ) -> Self {
        let decision = decide(&results);
        let exit_code = match mode {
            GateMode::Advisory => EXIT_PASS,
            GateMode::Blocking => decision.exit_code(),
        };
        let variable_errors = results
            .iter()
            .filter(|r| r.is_variable_error())
            .map(|r| VariableError {
                test: r.id.to_string(),
                unresolved: r.unresolved_variables.clone(),
            })
            .collect();

        Self {
            mode,
            decision,
            exit_code,
            phase: RunPhase::Reported,
            summary: Summary::count(&results),
            halted_by,
            documents,
            cache,
            results,
            variable_errors,
        }
    }

    /// Results that need attention, in report order
    pub fn failures(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.results.iter().filter(|r| !r.status.is_pass())
    }
}

/// Gate decision under blocking semantics.
///
/// - `Malformed` if a variable error hit a required or blocking test
/// - `Fail` if a required or blocking test failed or blocked, a blocking test
///   did not pass, or any variable error occurred
/// - `Pass` otherwise
pub fn decide(results: &[ExecutionResult]) -> GateDecision {
    let gating = |r: &ExecutionResult| r.required || r.blocking;

    if results.iter().any(|r| r.is_variable_error() && gating(r)) {
        return GateDecision::Malformed;
    }

    let failed = results.iter().any(|r| {
        let gate_failure =
            gating(r) && matches!(r.status, TestStatus::Fail | TestStatus::Blocked);
        let blocking_not_passed = r.blocking && !r.status.is_pass();
        gate_failure || blocking_not_passed || r.is_variable_error()
    });

    if failed {
        GateDecision::Fail
    } else {
        GateDecision::Pass
    }
}
