//! Routing: walk from an entry document to the documents relevant to a task.
//!
//! The walk is breadth-first over an explicit routing graph. Every followed
//! edge is recorded, and the graph is checked for cycles once the walk is
//! done, so a diamond (two documents routing to the same third) is fine while
//! any loop, including a self-route, is rejected.

pub mod matcher;

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::{load_document, BlockScanner, Document, ExtractionScope};
use crate::error::{GateError, Location};
use crate::graph::cycle::find_cycle;

/// Maximum number of hops from the entry document
pub const MAX_ROUTING_DEPTH: usize = 3;

pub struct Router<'a> {
    project_root: &'a Path,
    keywords: &'a [String],
    scanner: &'a BlockScanner,
    max_depth: usize,
}

impl<'a> Router<'a> {
    pub fn new(project_root: &'a Path, keywords: &'a [String], scanner: &'a BlockScanner) -> Self {
        Self {
            project_root,
            keywords,
            scanner,
            max_depth: MAX_ROUTING_DEPTH,
        }
    }

    /// Produce the ordered set of documents reachable from `entry` whose
    /// routing rules match the task keywords. The entry document comes first,
    /// followed by the others in discovery order.
    pub fn route(&self, entry: &Path) -> Result<Vec<Document>, GateError> {
        let root = self
            .project_root
            .canonicalize()
            .unwrap_or_else(|_| self.project_root.to_path_buf());

        let entry_doc = load_document(entry, self.scanner)?;
        let mut index: HashMap<PathBuf, usize> = HashMap::new();
        let mut parents: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut edges: HashMap<String, Vec<String>> = HashMap::new();
        let mut queue = VecDeque::from([0usize]);

        index.insert(entry_doc.path.clone(), 0);
        let mut documents = vec![entry_doc];

        while let Some(current) = queue.pop_front() {
            let path = documents[current].path.clone();
            let depth = documents[current].depth;
            let routes = documents[current].routes.clone();

            for route in &routes {
                let Some(hit) = matcher::condition_matches(&route.keywords, self.keywords) else {
                    continue;
                };
                let location = Location::at_line(&path, route.line);
                let target = route
                    .target
                    .resolve(&root, &path)
                    .canonicalize()
                    .map_err(|_| {
                        GateError::structural(
                            location.clone(),
                            format!("routing target '{}' does not exist", route.target.path),
                        )
                    })?;
                debug!(
                    from = %display_path(&root, &path),
                    to = %display_path(&root, &target),
                    keyword = hit,
                    "following route"
                );

                edges
                    .entry(display_path(&root, &path))
                    .or_default()
                    .push(display_path(&root, &target));

                let section = route.target.section.as_deref();

                if let Some(&existing) = index.get(&target) {
                    check_section(&documents[existing], section, &location)?;
                    documents[existing].scope.merge(section);
                    continue;
                }

                if depth + 1 > self.max_depth {
                    let mut chain = ancestry(&parents, &path);
                    chain.push(target.clone());
                    let rendered: Vec<String> =
                        chain.iter().map(|p| display_path(&root, p)).collect();
                    return Err(GateError::structural(
                        location,
                        format!(
                            "routing exceeds {} hops: {}",
                            self.max_depth,
                            rendered.join(" -> ")
                        ),
                    ));
                }

                let mut doc = load_document(&target, self.scanner)?;
                check_section(&doc, section, &location)?;
                doc.depth = depth + 1;
                doc.scope = ExtractionScope::for_section(section);

                parents.insert(target.clone(), path.clone());
                index.insert(target, documents.len());
                queue.push_back(documents.len());
                documents.push(doc);
            }
        }

        let nodes: Vec<String> = documents
            .iter()
            .map(|d| display_path(&root, &d.path))
            .collect();
        if let Some(cycle) = find_cycle(&nodes, &edges) {
            return Err(GateError::structural(
                Location::new(&documents[0].path),
                format!("routing cycle detected: {}", cycle.join(" -> ")),
            ));
        }

        debug!(documents = documents.len(), "routing complete");
        Ok(documents)
    }
}

fn check_section(doc: &Document, section: Option<&str>, location: &Location) -> Result<(), GateError> {
    match section {
        Some(slug) if !doc.has_section(slug) => Err(GateError::structural(
            location.clone(),
            format!("{} has no section '#{slug}'", doc.path.display()),
        )),
        _ => Ok(()),
    }
}

/// Path from the entry document down to `path`, following BFS parents
fn ancestry(parents: &HashMap<PathBuf, PathBuf>, path: &Path) -> Vec<PathBuf> {
    let mut chain = vec![path.to_path_buf()];
    let mut cursor = path.to_path_buf();
    while let Some(parent) = parents.get(&cursor) {
        chain.push(parent.clone());
        cursor = parent.clone();
    }
    chain.reverse();
    chain
}

/// Render a path relative to the project root when possible
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Load an explicit list of documents, expanding glob patterns.
///
/// Documents keep the given order and are deduplicated by canonical path.
pub fn explicit_documents<S: AsRef<str>>(
    patterns: &[S],
    scanner: &BlockScanner,
) -> Result<Vec<Document>, GateError> {
    let mut paths: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        if pattern.contains(['*', '?', '[']) {
            let matches = glob::glob(pattern).map_err(|e| {
                GateError::structural(Location::new(pattern), format!("invalid glob pattern: {e}"))
            })?;
            let before = paths.len();
            for entry in matches {
                let path = entry.map_err(|e| GateError::Io {
                    path: e.path().to_path_buf(),
                    source: io::Error::new(e.error().kind(), e.error().to_string()),
                })?;
                paths.push(path);
            }
            if paths.len() == before {
                return Err(GateError::structural(
                    Location::new(pattern),
                    "pattern matched no documents",
                ));
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut documents = Vec::new();
    for path in paths {
        let doc = load_document(&path, scanner)?;
        if seen.insert(doc.path.clone()) {
            documents.push(doc);
        }
    }
    Ok(documents)
}
