use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::error::GateError;

/// Lifecycle of a single gate run.
///
/// - `Pending` -> `Extracting`
/// - `Extracting` -> `Resolving`
/// - `Resolving` -> `Executing`
/// - `Executing` -> `Reported` | `Halted`
/// - `Halted` -> `Reported`
/// - `Reported` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Pending,
    Extracting,
    Resolving,
    Executing,
    Halted,
    Reported,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Pending => "pending",
            RunPhase::Extracting => "extracting",
            RunPhase::Resolving => "resolving",
            RunPhase::Executing => "executing",
            RunPhase::Halted => "halted",
            RunPhase::Reported => "reported",
        };
        f.write_str(name)
    }
}

impl RunPhase {
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        matches!(
            (*self, next),
            (RunPhase::Pending, RunPhase::Extracting)
                | (RunPhase::Extracting, RunPhase::Resolving)
                | (RunPhase::Resolving, RunPhase::Executing)
                | (RunPhase::Executing, RunPhase::Reported | RunPhase::Halted)
                | (RunPhase::Halted, RunPhase::Reported)
        )
    }
}

/// Phase holder that only moves along valid transitions
#[derive(Debug)]
pub struct PhaseTracker {
    current: RunPhase,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self {
            current: RunPhase::Pending,
        }
    }
}

impl PhaseTracker {
    pub fn current(&self) -> RunPhase {
        self.current
    }

    pub fn advance(&mut self, next: RunPhase) -> Result<(), GateError> {
        if !self.current.can_transition_to(next) {
            return Err(GateError::Phase {
                from: self.current.to_string(),
                to: next.to_string(),
            });
        }
        info!(from = %self.current, to = %next, "run phase");
        self.current = next;
        Ok(())
    }
}
