//! Fixture builders shared by the integration tests

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gatecheck::config::GateConfig;
use gatecheck::models::TestStatus;
use gatecheck::pipeline::{DocumentSource, RunRequest};
use gatecheck::report::Report;
use tempfile::TempDir;

/// A temporary project directory holding guidance documents
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp project"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root, creating parent directories
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    /// Introspection limited to the project root, so nothing leaks in from
    /// manifests or the environment
    fn introspection(&self) -> Box<BTreeMap<String, String>> {
        Box::new(BTreeMap::from([(
            "PROJECT_ROOT".to_string(),
            self.root().display().to_string(),
        )]))
    }

    pub fn explicit(&self, documents: &[&str]) -> RunRequest {
        let paths = documents
            .iter()
            .map(|d| self.root().join(d).display().to_string())
            .collect();
        RunRequest::new(DocumentSource::Explicit(paths), self.root(), GateConfig::default())
            .with_introspection(self.introspection())
    }

    pub fn routed(&self, entry: &str, keywords: &[&str]) -> RunRequest {
        RunRequest::new(
            DocumentSource::Entry(self.root().join(entry)),
            self.root(),
            GateConfig::default(),
        )
        .with_keywords(keywords.iter().map(|k| k.to_string()).collect())
        .with_introspection(self.introspection())
    }
}

/// Render a `<test>` element from `KEY: value` lines
pub fn test(name: &str, fields: &[&str]) -> String {
    let mut out = format!("  <test name=\"{name}\">\n");
    for field in fields {
        out.push_str("    ");
        out.push_str(field);
        out.push('\n');
    }
    out.push_str("  </test>\n");
    out
}

/// Render a `<verification-block>` around the given tests
pub fn verification(id: &str, tests: &[String]) -> String {
    format!(
        "<verification-block context-check=\"{id}\">\n{}</verification-block>\n",
        tests.concat()
    )
}

/// Render a routing rule
pub fn route(id: &str, condition: &str, target: &str) -> String {
    format!(
        "<conditional-block task-condition=\"{condition}\" context-check=\"{id}\">\nREAD: {target}\n</conditional-block>\n"
    )
}

pub fn status_of(report: &Report, id: &str) -> TestStatus {
    report
        .results
        .iter()
        .find(|r| r.id.as_str() == id)
        .unwrap_or_else(|| panic!("no result for {id}"))
        .status
}
