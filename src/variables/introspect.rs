//! Project detection from the filesystem.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::profile::Profile;

pub const PROJECT_ROOT: &str = "PROJECT_ROOT";
pub const PROJECT_NAME: &str = "PROJECT_NAME";
pub const PROJECT_PROFILE: &str = "PROJECT_PROFILE";

/// Source of detected variable values.
///
/// Implementations answer by name and return `None` for anything they do not
/// know; the resolver falls back to profile defaults after that.
pub trait ProjectIntrospection {
    fn detect(&self, name: &str) -> Option<String>;
}

/// Fixed key-value introspection, for callers that already know their project
impl ProjectIntrospection for BTreeMap<String, String> {
    fn detect(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Introspection of a project directory on disk
#[derive(Debug, Clone)]
pub struct ProjectIntrospector {
    root: PathBuf,
    configured: BTreeMap<String, String>,
}

impl ProjectIntrospector {
    /// `configured` holds the project config's `[variables]` table, which takes
    /// precedence over anything detected from manifests.
    pub fn new(root: &Path, configured: BTreeMap<String, String>) -> Self {
        Self {
            root: root.to_path_buf(),
            configured,
        }
    }
}

impl ProjectIntrospection for ProjectIntrospector {
    fn detect(&self, name: &str) -> Option<String> {
        if let Some(value) = self.configured.get(name) {
            return Some(value.clone());
        }
        match name {
            PROJECT_ROOT => Some(self.root.display().to_string()),
            PROJECT_NAME => detect_project_name(&self.root),
            PROJECT_PROFILE => detect_profile(&self.root).map(|p| p.name().to_string()),
            _ => None,
        }
    }
}

/// Detect the project profile from manifest files.
///
/// - Rust: Cargo.toml
/// - Node: package.json or tsconfig.json
/// - Python: pyproject.toml, requirements.txt or setup.py
/// - Go: go.mod
///
/// The first match in that order wins for polyglot repositories.
pub fn detect_profile(root: &Path) -> Option<Profile> {
    let markers: [(Profile, &[&str]); 4] = [
        (Profile::Rust, &["Cargo.toml"]),
        (Profile::Node, &["package.json", "tsconfig.json"]),
        (Profile::Python, &["pyproject.toml", "requirements.txt", "setup.py"]),
        (Profile::Go, &["go.mod"]),
    ];
    markers
        .into_iter()
        .find(|(_, files)| files.iter().any(|f| root.join(f).exists()))
        .map(|(profile, _)| profile)
}

/// Package name from the manifest, else the directory name
pub fn detect_project_name(root: &Path) -> Option<String> {
    manifest_name(root).or_else(|| {
        root.file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
    })
}

fn manifest_name(root: &Path) -> Option<String> {
    if let Ok(content) = fs::read_to_string(root.join("Cargo.toml")) {
        if let Some(name) = toml_string(&content, &["package", "name"]) {
            return Some(name);
        }
    }
    if let Ok(content) = fs::read_to_string(root.join("package.json")) {
        let name = serde_json::from_str::<serde_json::Value>(&content)
            .ok()
            .and_then(|value| value.get("name")?.as_str().map(String::from));
        if name.is_some() {
            return name;
        }
    }
    if let Ok(content) = fs::read_to_string(root.join("pyproject.toml")) {
        if let Some(name) = toml_string(&content, &["project", "name"]) {
            return Some(name);
        }
    }
    if let Ok(content) = fs::read_to_string(root.join("go.mod")) {
        return content
            .lines()
            .find_map(|line| line.trim().strip_prefix("module "))
            .and_then(|module| module.trim().rsplit('/').next())
            .map(String::from);
    }
    None
}

fn toml_string(content: &str, keys: &[&str]) -> Option<String> {
    let table: toml::Table = toml::from_str(content).ok()?;
    let (last, parents) = keys.split_last()?;
    let mut current = &table;
    for key in parents {
        current = current.get(*key)?.as_table()?;
    }
    current.get(*last)?.as_str().map(String::from)
}
