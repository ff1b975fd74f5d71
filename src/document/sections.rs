//! Markdown structure helpers: fenced-code masking and heading sections.
//!
//! Both helpers preserve line numbering. Masked or out-of-scope lines are
//! replaced by empty lines rather than removed, so block locations reported
//! later still point at the original file.

use std::collections::BTreeSet;

use super::frontmatter::frontmatter_line_count;

/// A heading-delimited region of a document, as a half-open line range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub slug: String,
    pub level: usize,
    pub start_line: usize,
    pub end_line: usize,
}

/// Blank out every line that sits inside a fenced code region.
///
/// Fence lines themselves are blanked too. An unterminated fence masks the
/// rest of the document, matching how markdown renderers treat it.
pub fn mask_code_fences(content: &str) -> String {
    let mut out = Vec::new();
    let mut open_fence: Option<(char, usize)> = None;

    for line in content.lines() {
        let trimmed = line.trim_start();
        let fence = fence_marker(trimmed);

        match (open_fence, fence) {
            (None, Some(marker)) => {
                open_fence = Some(marker);
                out.push("");
            }
            (Some((ch, len)), Some((c, l))) if c == ch && l >= len && is_closing(trimmed, l) => {
                open_fence = None;
                out.push("");
            }
            (Some(_), _) => out.push(""),
            (None, None) => out.push(line),
        }
    }

    out.join("\n")
}

fn fence_marker(trimmed: &str) -> Option<(char, usize)> {
    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|&c| c == ch).count();
    (len >= 3).then_some((ch, len))
}

fn is_closing(trimmed: &str, fence_len: usize) -> bool {
    trimmed[fence_len..].trim().is_empty()
}

/// Turn a heading title into the slug used by `#section` references.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for ch in title.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if (ch.is_whitespace() || ch == '-' || ch == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// List the heading sections of a document, ignoring headings in code fences
/// and in frontmatter.
pub fn sections(content: &str) -> Vec<Section> {
    let masked = mask_code_fences(content);
    let lines: Vec<&str> = masked.lines().collect();
    let skip = frontmatter_line_count(content);

    let headings: Vec<(usize, usize, String)> = lines
        .iter()
        .enumerate()
        .skip(skip)
        .filter_map(|(idx, line)| {
            let level = line.chars().take_while(|&c| c == '#').count();
            if (1..=6).contains(&level) && line[level..].starts_with(' ') {
                Some((idx, level, slugify(&line[level..])))
            } else {
                None
            }
        })
        .collect();

    headings
        .iter()
        .enumerate()
        .map(|(pos, (start, level, slug))| {
            let end = headings[pos + 1..]
                .iter()
                .find(|(_, next_level, _)| next_level <= level)
                .map(|(line, _, _)| *line)
                .unwrap_or(lines.len());
            Section {
                slug: slug.clone(),
                level: *level,
                start_line: *start,
                end_line: end,
            }
        })
        .collect()
}

/// Keep only the lines that belong to one of the named sections.
///
/// Returns the names that matched no heading as the error value.
pub fn restrict_to_sections(content: &str, wanted: &BTreeSet<String>) -> Result<String, Vec<String>> {
    let all = sections(content);
    let missing: Vec<String> = wanted
        .iter()
        .filter(|name| !all.iter().any(|s| &s.slug == *name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }

    let selected: Vec<&Section> = all.iter().filter(|s| wanted.contains(&s.slug)).collect();
    let scoped = content
        .lines()
        .enumerate()
        .map(|(idx, line)| {
            if selected
                .iter()
                .any(|s| idx >= s.start_line && idx < s.end_line)
            {
                line
            } else {
                ""
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    Ok(scoped)
}
