//! Guidance documents: loading, frontmatter, block scanning and routing rules.

pub mod blocks;
pub mod frontmatter;
pub mod sections;

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{GateError, Location};

pub use blocks::{BlockKind, BlockScanner, RawBlock};

/// Category used when neither frontmatter nor the directory provides one
pub const DEFAULT_CATEGORY: &str = "general";

/// Reference from a routing rule to a document, optionally narrowed to a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteTarget {
    pub path: String,
    pub section: Option<String>,
}

impl RouteTarget {
    /// Parse `path[#section]`
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_matches('`');
        if raw.is_empty() {
            return None;
        }
        let (path, section) = match raw.split_once('#') {
            Some((path, section)) if !section.trim().is_empty() => {
                (path.trim(), Some(sections::slugify(section)))
            }
            Some((path, _)) => (path.trim(), None),
            None => (raw, None),
        };
        if path.is_empty() {
            return None;
        }
        Some(Self {
            path: path.to_string(),
            section,
        })
    }

    /// Resolve against the project root (`@` prefix) or the containing document.
    pub fn resolve(&self, project_root: &Path, containing_doc: &Path) -> PathBuf {
        match self.path.strip_prefix('@') {
            Some(rooted) => project_root.join(rooted.trim_start_matches('/')),
            None => containing_doc
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(&self.path),
        }
    }
}

/// A routing rule: trigger keywords plus a target. Never carries tests.
#[derive(Debug, Clone, Serialize)]
pub struct ConditionalBlock {
    pub context_check: String,
    pub keywords: Vec<String>,
    pub target: RouteTarget,
    pub line: usize,
}

impl ConditionalBlock {
    fn from_raw(raw: &RawBlock, path: &Path) -> Result<Self, GateError> {
        let location = Location::at_line(path, raw.line);
        let context_check = raw.require_attribute("context-check", path)?.to_string();
        let keywords: Vec<String> = raw
            .require_attribute("task-condition", path)?
            .split('|')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect();
        if keywords.is_empty() {
            return Err(GateError::structural(
                location,
                "task-condition has no keywords",
            ));
        }

        let targets: Vec<&str> = raw
            .body
            .lines()
            .filter_map(|line| line.trim().strip_prefix("READ:"))
            .collect();
        let target = match targets.as_slice() {
            [single] => RouteTarget::parse(single).ok_or_else(|| {
                GateError::structural(location.clone(), "READ: line has no target path")
            })?,
            [] => {
                return Err(GateError::structural(
                    location,
                    format!("conditional block '{context_check}' has no READ: target"),
                ))
            }
            _ => {
                return Err(GateError::structural(
                    location,
                    format!("conditional block '{context_check}' declares more than one READ: target"),
                ))
            }
        };

        Ok(Self {
            context_check,
            keywords,
            target,
            line: raw.line,
        })
    }
}

/// Which part of a document the extractor should look at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionScope {
    Whole,
    Sections(BTreeSet<String>),
}

impl ExtractionScope {
    /// Widen the scope with another route's request.
    pub fn merge(&mut self, section: Option<&str>) {
        match section {
            None => *self = ExtractionScope::Whole,
            Some(name) => {
                if let ExtractionScope::Sections(set) = self {
                    set.insert(name.to_string());
                }
            }
        }
    }

    pub fn for_section(section: Option<&str>) -> Self {
        match section {
            Some(name) => ExtractionScope::Sections(BTreeSet::from([name.to_string()])),
            None => ExtractionScope::Whole,
        }
    }
}

/// A loaded guidance document
#[derive(Debug, Clone)]
pub struct Document {
    /// Canonical path, used as the document identity
    pub path: PathBuf,
    pub category: String,
    pub content: String,
    pub routes: Vec<ConditionalBlock>,
    pub scope: ExtractionScope,
    /// Hops from the entry point (0 for the entry or for explicit lists)
    pub depth: usize,
}

impl Document {
    /// True when the document only routes and declares no verification blocks
    pub fn is_dispatcher(&self, scanner: &BlockScanner) -> bool {
        scanner
            .scan(&self.content, &self.path)
            .map(|blocks| blocks.iter().all(|b| b.kind == BlockKind::Conditional))
            .unwrap_or(false)
    }

    /// Content restricted to the extraction scope, with line numbers preserved
    pub fn scoped_content(&self) -> Result<Cow<'_, str>, GateError> {
        match &self.scope {
            ExtractionScope::Whole => Ok(Cow::Borrowed(&self.content)),
            ExtractionScope::Sections(wanted) => sections::restrict_to_sections(&self.content, wanted)
                .map(Cow::Owned)
                .map_err(|missing| {
                    GateError::structural(
                        Location::new(&self.path),
                        format!("no section named {}", missing.join(", ")),
                    )
                }),
        }
    }

    /// Check that a section reference names a heading in this document
    pub fn has_section(&self, slug: &str) -> bool {
        sections::sections(&self.content)
            .iter()
            .any(|s| s.slug == slug)
    }
}

/// Read a document from disk, resolve its category and parse its routing rules.
pub fn load_document(path: &Path, scanner: &BlockScanner) -> Result<Document, GateError> {
    let canonical = path.canonicalize().map_err(|source| GateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let content = std::fs::read_to_string(&canonical).map_err(|source| GateError::Io {
        path: canonical.clone(),
        source,
    })?;
    parse_document(canonical, content, scanner)
}

/// Build a document from already-read content
pub fn parse_document(
    path: PathBuf,
    content: String,
    scanner: &BlockScanner,
) -> Result<Document, GateError> {
    let category = resolve_category(&path, &content)?;

    let routes = scanner
        .scan(&content, &path)?
        .iter()
        .filter(|raw| raw.kind == BlockKind::Conditional)
        .map(|raw| ConditionalBlock::from_raw(raw, &path))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Document {
        path,
        category,
        content,
        routes,
        scope: ExtractionScope::Whole,
        depth: 0,
    })
}

fn resolve_category(path: &Path, content: &str) -> Result<String, GateError> {
    let header = frontmatter::parse_frontmatter(content, path)?;
    if let Some(category) = header.and_then(|fm| fm.category()) {
        return Ok(category);
    }

    Ok(path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .map(String::from)
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()))
}
