//! Error taxonomy for a gate run.
//!
//! [`GateError`] aborts a whole batch before anything executes. [`VariableError`]
//! is scoped to a single test and is recorded in the report instead of being
//! propagated.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Exit code for malformed input (duplicate ids, cycles, disallowed commands, ...)
pub const EXIT_MALFORMED: i32 = 2;

/// Where in the document set a structural problem was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: PathBuf,
    pub line: Option<usize>,
}

impl Location {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            line: None,
        }
    }

    pub fn at_line(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line: Some(line),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.path.display(), line),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// Fatal, batch-aborting errors.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("{location}: {message}")]
    Structural { location: Location, message: String },

    #[error("{location}: command '{command}' rejected by policy ({class}: matched '{pattern}')")]
    Governance {
        location: Location,
        command: String,
        class: String,
        pattern: String,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("invalid run phase transition: {from} -> {to}")]
    Phase { from: String, to: String },
}

impl GateError {
    pub fn structural(location: Location, message: impl Into<String>) -> Self {
        GateError::Structural {
            location,
            message: message.into(),
        }
    }

    /// Every batch-aborting error maps to the malformed-input exit code.
    pub fn exit_code(&self) -> i32 {
        EXIT_MALFORMED
    }
}

/// A test referenced variables that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("test '{test}' references unresolved variable(s): {}", unresolved.join(", "))]
pub struct VariableError {
    pub test: String,
    pub unresolved: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_error_display_includes_line() {
        let err = GateError::structural(Location::at_line("docs/a.md", 12), "duplicate test name");
        assert_eq!(err.to_string(), "docs/a.md:12: duplicate test name");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_governance_error_display() {
        let err = GateError::Governance {
            location: Location::new("docs/net.md"),
            command: "curl example.com".to_string(),
            class: "network".to_string(),
            pattern: "curl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("curl example.com"));
        assert!(msg.contains("network"));
    }

    #[test]
    fn test_variable_error_lists_names() {
        let err = VariableError {
            test: "coverage/threshold".to_string(),
            unresolved: vec!["PROJECT_COVERAGE".to_string(), "MIN".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "test 'coverage/threshold' references unresolved variable(s): PROJECT_COVERAGE, MIN"
        );
    }
}
