//! Per-profile default values for common project variables

use std::collections::BTreeMap;
use std::fmt;

/// Project flavour detected from manifest files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    Rust,
    Node,
    Python,
    Go,
}

impl Profile {
    pub const ALL: [Profile; 4] = [Profile::Rust, Profile::Node, Profile::Python, Profile::Go];

    pub fn name(&self) -> &'static str {
        match self {
            Profile::Rust => "rust",
            Profile::Node => "node",
            Profile::Python => "python",
            Profile::Go => "go",
        }
    }

    fn builtin_defaults(&self) -> [(&'static str, &'static str); 4] {
        match self {
            Profile::Rust => [
                ("TEST_COMMAND", "cargo test"),
                ("LINT_COMMAND", "cargo clippy -- -D warnings"),
                ("SOURCE_DIR", "src"),
                ("TEST_DIR", "tests"),
            ],
            Profile::Node => [
                ("TEST_COMMAND", "npm test"),
                ("LINT_COMMAND", "npm run lint"),
                ("SOURCE_DIR", "src"),
                ("TEST_DIR", "test"),
            ],
            Profile::Python => [
                ("TEST_COMMAND", "pytest"),
                ("LINT_COMMAND", "ruff check ."),
                ("SOURCE_DIR", "src"),
                ("TEST_DIR", "tests"),
            ],
            Profile::Go => [
                ("TEST_COMMAND", "go test ./..."),
                ("LINT_COMMAND", "go vet ./..."),
                ("SOURCE_DIR", "."),
                ("TEST_DIR", "."),
            ],
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default values keyed by profile name, then variable name
#[derive(Debug, Clone)]
pub struct ProfileDefaults {
    tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        let tables = Profile::ALL
            .into_iter()
            .map(|profile| {
                let table = profile
                    .builtin_defaults()
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                (profile.name().to_string(), table)
            })
            .collect();
        Self { tables }
    }
}

impl ProfileDefaults {
    /// Built-in tables extended by configured `[profiles.<name>]` tables.
    ///
    /// Configured profiles may be new names; their keys win over built-ins.
    pub fn with_overrides(overrides: &BTreeMap<String, BTreeMap<String, String>>) -> Self {
        let mut defaults = Self::default();
        for (profile, table) in overrides {
            let entry = defaults.tables.entry(profile.clone()).or_default();
            for (key, value) in table {
                entry.insert(key.clone(), value.clone());
            }
        }
        defaults
    }

    pub fn lookup(&self, profile: &str, name: &str) -> Option<&str> {
        self.tables.get(profile)?.get(name).map(String::as_str)
    }
}
