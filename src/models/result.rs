//! Per-test execution outcomes

use std::time::Duration;

use serde::{Serialize, Serializer};

use super::verification::{PlannedTest, TestId};

/// Terminal state of a test in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Skipped,
    Blocked,
}

impl TestStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, TestStatus::Pass)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestStatus::Pass => "pass",
            TestStatus::Fail => "fail",
            TestStatus::Skipped => "skipped",
            TestStatus::Blocked => "blocked",
        }
    }
}

fn serialize_duration_ms<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Result of one test
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub id: TestId,
    pub status: TestStatus,
    pub message: String,
    #[serde(rename = "duration_ms", serialize_with = "serialize_duration_ms")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub attempts: u32,
    pub required: bool,
    pub blocking: bool,
    pub advisory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved_variables: Vec<String>,
}

impl ExecutionResult {
    fn for_test(test: &PlannedTest, status: TestStatus, message: String) -> Self {
        let commands = test.commands();
        Self {
            id: test.id.clone(),
            status,
            message,
            duration: Duration::ZERO,
            exit_code: None,
            timed_out: false,
            attempts: 0,
            required: test.required,
            blocking: test.blocking,
            advisory: test.is_advisory(),
            error_message: commands.map(|c| c.error_message.clone()),
            fix_command: commands.and_then(|c| c.fix_command.clone()),
            output: None,
            unresolved_variables: Vec::new(),
        }
    }

    /// Result of a test whose process actually ran
    pub fn completed(test: &PlannedTest, status: TestStatus, message: String) -> Self {
        Self::for_test(test, status, message)
    }

    /// Test never ran because a prerequisite did not pass or the batch halted
    pub fn skipped(test: &PlannedTest, reason: impl Into<String>) -> Self {
        Self::for_test(test, TestStatus::Skipped, reason.into())
    }

    /// Terminal failure for a test whose templates could not be rendered
    pub fn unresolved(test: &PlannedTest) -> Option<Self> {
        let err = test.variable_error()?;
        let mut result = Self::for_test(test, TestStatus::Fail, err.to_string());
        result.unresolved_variables = err.unresolved.clone();
        Some(result)
    }

    /// A blocking test that ran and did not pass, timeouts included
    pub fn halts_batch(&self) -> bool {
        self.blocking && self.attempts > 0 && !self.status.is_pass()
    }

    pub fn is_variable_error(&self) -> bool {
        !self.unresolved_variables.is_empty()
    }
}
