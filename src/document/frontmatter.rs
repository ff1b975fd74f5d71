//! YAML frontmatter of guidance documents.
//!
//! Only `category` is interpreted; everything else in the header is ignored.

use std::path::Path;

use serde::Deserialize;

use crate::error::{GateError, Location};

/// Header fields read from a document
#[derive(Debug, Default, Deserialize)]
pub struct Frontmatter {
    #[serde(default)]
    category: Option<serde_yaml::Value>,
}

impl Frontmatter {
    /// Category as text, if it is a non-empty scalar
    pub fn category(&self) -> Option<String> {
        match self.category.as_ref()? {
            serde_yaml::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            serde_yaml::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// The raw YAML between the delimiters and the number of lines the header
/// spans, delimiters included.
///
/// The closing `---` must sit at the indentation of the opening one, so an
/// indented `---` inside a block scalar does not end the header early.
fn split(content: &str) -> Option<(String, usize)> {
    let mut lines = content.lines();
    let first = lines.next()?;
    if first.trim() != "---" {
        return None;
    }
    let indent = first.len() - first.trim_start().len();

    let mut body = Vec::new();
    for line in lines {
        let trimmed = line.trim_start();
        if trimmed.trim_end() == "---" && line.len() - trimmed.len() == indent {
            return Some((body.join("\n"), body.len() + 2));
        }
        body.push(line);
    }
    None
}

pub fn has_frontmatter(content: &str) -> bool {
    content
        .lines()
        .next()
        .is_some_and(|first| first.trim() == "---")
}

/// Number of lines occupied by the header; 0 without a closed header.
pub fn frontmatter_line_count(content: &str) -> usize {
    split(content).map_or(0, |(_, lines)| lines)
}

/// Parse the header of `content`.
///
/// A document that opens with `---` but never closes it, or whose header is
/// not valid YAML, is malformed.
pub fn parse_frontmatter(content: &str, path: &Path) -> Result<Option<Frontmatter>, GateError> {
    if !has_frontmatter(content) {
        return Ok(None);
    }
    let (yaml, _) = split(content).ok_or_else(|| {
        GateError::structural(Location::at_line(path, 1), "frontmatter is not closed with ---")
    })?;
    if yaml.trim().is_empty() {
        return Ok(Some(Frontmatter::default()));
    }
    serde_yaml::from_str(&yaml).map(Some).map_err(|e| {
        GateError::structural(Location::at_line(path, 1), format!("invalid frontmatter: {e}"))
    })
}
