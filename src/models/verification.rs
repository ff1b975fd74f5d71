use std::fmt;

use serde::Serialize;

use crate::error::{Location, VariableError};
use crate::variables::Template;

/// Batch-unique identity of a test: `<context-check>/<name>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    pub fn new(context_check: &str, name: &str) -> Self {
        Self(format!("{context_check}/{name}"))
    }

    /// Qualify a `DEPENDS_ON` entry: bare names refer to siblings in `context_check`.
    pub fn qualify(context_check: &str, reference: &str) -> Self {
        if reference.contains('/') {
            Self(reference.to_string())
        } else {
            Self::new(context_check, reference)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single `<test>` inside a verification block
#[derive(Debug, Clone)]
pub struct TestDefinition {
    pub name: String,
    pub command: Template,
    pub required: bool,
    pub blocking: bool,
    pub error_message: Template,
    pub fix_command: Option<Template>,
    pub description: String,
    /// Already qualified with the owning block
    pub depends_on: Vec<TestId>,
    /// Names that must resolve even if no template references them
    pub variables: Vec<String>,
    pub line: usize,
}

impl TestDefinition {
    /// Every variable name the test needs, in first-reference order
    pub fn referenced_variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let templates = [Some(&self.command), Some(&self.error_message), self.fix_command.as_ref()];
        let placeholders = templates
            .into_iter()
            .flatten()
            .flat_map(|t| t.placeholders());
        for name in placeholders.chain(self.variables.iter().map(String::as_str)) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// A parsed `<verification-block>`
#[derive(Debug, Clone)]
pub struct VerificationBlock {
    pub context_check: String,
    pub location: Location,
    pub fingerprint: String,
    pub tests: Vec<TestDefinition>,
}

impl VerificationBlock {
    pub fn test_id(&self, test: &TestDefinition) -> TestId {
        TestId::new(&self.context_check, &test.name)
    }
}

/// Commands of a test after variable substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedCommands {
    pub command: String,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_command: Option<String>,
}

/// Outcome of rendering a test's templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Rendering {
    Ready(RenderedCommands),
    Unresolved(VariableError),
}

/// A test after resolution, ready to schedule
#[derive(Debug, Clone, Serialize)]
pub struct PlannedTest {
    pub id: TestId,
    pub description: String,
    pub required: bool,
    pub blocking: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TestId>,
    pub rendering: Rendering,
    #[serde(skip)]
    pub location: Location,
}

impl PlannedTest {
    pub fn commands(&self) -> Option<&RenderedCommands> {
        match &self.rendering {
            Rendering::Ready(commands) => Some(commands),
            Rendering::Unresolved(_) => None,
        }
    }

    pub fn variable_error(&self) -> Option<&VariableError> {
        match &self.rendering {
            Rendering::Ready(_) => None,
            Rendering::Unresolved(err) => Some(err),
        }
    }

    /// Neither required nor blocking
    pub fn is_advisory(&self) -> bool {
        !self.required && !self.blocking
    }
}
