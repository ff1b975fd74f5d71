use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::document::{BlockScanner, ExtractionScope};
use crate::router::matcher::parse_keywords;
use crate::router::{display_path, Router};

#[derive(Debug, Serialize)]
struct RoutedDocument {
    path: String,
    depth: usize,
    category: String,
    /// Only routes onward, declares no tests
    dispatcher: bool,
    scope: ExtractionScope,
}

/// Print the documents a task routes to, with hop depth and category.
pub fn execute(entry: &Path, task: &[String], project: &Path, format: OutputFormat) -> Result<i32> {
    let root: PathBuf = project
        .canonicalize()
        .with_context(|| format!("project root {} not found", project.display()))?;
    let keywords = parse_keywords(task);
    let scanner = BlockScanner::new();
    let documents = Router::new(&root, &keywords, &scanner).route(entry)?;

    let routed: Vec<RoutedDocument> = documents
        .into_iter()
        .map(|doc| RoutedDocument {
            path: display_path(&root, &doc.path),
            depth: doc.depth,
            dispatcher: doc.is_dispatcher(&scanner),
            category: doc.category,
            scope: doc.scope,
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&routed)?),
        OutputFormat::Text => {
            for doc in &routed {
                let sections = match &doc.scope {
                    ExtractionScope::Whole => String::new(),
                    ExtractionScope::Sections(names) => names
                        .iter()
                        .map(|s| format!("#{s}"))
                        .collect::<Vec<_>>()
                        .join(" "),
                };
                let kind = if doc.dispatcher { " (dispatcher)" } else { "" };
                println!(
                    "{}{} {}{} {}",
                    "  ".repeat(doc.depth),
                    doc.path.as_str().bold(),
                    format!("[{}]", doc.category).as_str().dimmed(),
                    kind,
                    sections
                );
            }
        }
    }
    Ok(0)
}
