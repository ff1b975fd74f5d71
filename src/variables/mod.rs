//! Variable resolution and template rendering.
//!
//! Values come from, in order: explicit overrides, project introspection, and
//! the defaults of the detected profile. Anything else is undefined, and a test
//! that needs an undefined name fails with a [`VariableError`].

pub mod introspect;
pub mod profile;
pub mod template;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::error::VariableError;
use crate::models::{RenderedCommands, Rendering, TestDefinition, TestId};

pub use introspect::{ProjectIntrospection, ProjectIntrospector, PROJECT_PROFILE};
pub use profile::{Profile, ProfileDefaults};
pub use template::{Segment, Template, TemplateError};

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariableSource {
    Override,
    Detected,
    ProfileDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub source: VariableSource,
}

/// Memoising resolver, one per run
pub struct VariableResolver {
    overrides: BTreeMap<String, String>,
    introspection: Box<dyn ProjectIntrospection>,
    profiles: ProfileDefaults,
    memo: HashMap<String, Option<Variable>>,
}

impl VariableResolver {
    pub fn new(
        overrides: BTreeMap<String, String>,
        introspection: Box<dyn ProjectIntrospection>,
        profiles: ProfileDefaults,
    ) -> Self {
        Self {
            overrides,
            introspection,
            profiles,
            memo: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, name: &str) -> Option<Variable> {
        if let Some(cached) = self.memo.get(name) {
            return cached.clone();
        }
        let resolved = self.lookup(name);
        match &resolved {
            Some(var) => debug!(name, source = ?var.source, "resolved variable"),
            None => debug!(name, "variable undefined"),
        }
        self.memo.insert(name.to_string(), resolved.clone());
        resolved
    }

    fn lookup(&mut self, name: &str) -> Option<Variable> {
        let found = |value: String, source| {
            Some(Variable {
                name: name.to_string(),
                value,
                source,
            })
        };

        if let Some(value) = self.overrides.get(name) {
            return found(value.clone(), VariableSource::Override);
        }
        if let Some(value) = self.introspection.detect(name) {
            return found(value, VariableSource::Detected);
        }
        if name == PROJECT_PROFILE {
            return None;
        }
        let profile = self.resolve(PROJECT_PROFILE)?.value;
        let value = self.profiles.lookup(&profile, name)?.to_string();
        found(value, VariableSource::ProfileDefault)
    }

    /// Render every template of a test. Fails closed: one undefined name
    /// anywhere, including the declared `VARIABLES`, leaves the test unrendered.
    pub fn render_test(&mut self, id: &TestId, test: &TestDefinition) -> Rendering {
        let unresolved: Vec<String> = test
            .referenced_variables()
            .into_iter()
            .filter(|name| self.resolve(name).is_none())
            .map(String::from)
            .collect();
        if !unresolved.is_empty() {
            return Rendering::Unresolved(VariableError {
                test: id.to_string(),
                unresolved,
            });
        }

        match self.render_commands(test) {
            Ok(commands) => Rendering::Ready(commands),
            Err(unresolved) => Rendering::Unresolved(VariableError {
                test: id.to_string(),
                unresolved,
            }),
        }
    }

    fn render_commands(&mut self, test: &TestDefinition) -> Result<RenderedCommands, Vec<String>> {
        Ok(RenderedCommands {
            command: self.render(&test.command)?,
            error_message: self.render(&test.error_message)?,
            fix_command: test
                .fix_command
                .as_ref()
                .map(|t| self.render(t))
                .transpose()?,
        })
    }

    pub fn render(&mut self, template: &Template) -> Result<String, Vec<String>> {
        template.render(|name| self.resolve(name).map(|v| v.value))
    }

    /// Every variable resolved so far, sorted by name
    pub fn resolved(&self) -> Vec<Variable> {
        let mut vars: Vec<Variable> = self.memo.values().flatten().cloned().collect();
        vars.sort_by(|a, b| a.name.cmp(&b.name));
        vars
    }
}

/// Parse a `NAME=VALUE` override
pub fn parse_override(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if !template::is_valid_name(name) {
        return Err(format!("invalid variable name '{name}'"));
    }
    Ok((name.to_string(), value.to_string()))
}
