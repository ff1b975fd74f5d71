//! Keyword matching for `task-condition` attributes

/// Normalize text for matching: lowercase, replace separators with spaces
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split task keyword arguments into normalized keywords.
///
/// Accepts comma- and pipe-separated lists so `--task "api,auth"` and
/// `--task api --task auth` behave the same.
pub fn parse_keywords<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for item in raw {
        for part in item.as_ref().split([',', '|']) {
            let normalized = normalize_text(part);
            if !normalized.is_empty() && !keywords.contains(&normalized) {
                keywords.push(normalized);
            }
        }
    }
    keywords
}

/// Whether a single condition alternative matches a single task keyword.
///
/// Partial match in either direction: `auth` matches `authentication`, and
/// `api endpoint` matches `api`.
pub fn alternative_matches(alternative: &str, keyword: &str) -> bool {
    let alt = normalize_text(alternative);
    let kw = normalize_text(keyword);
    if alt.is_empty() || kw.is_empty() {
        return false;
    }
    alt.contains(&kw) || kw.contains(&alt)
}

/// OR semantics across the alternatives of a condition and across keywords.
///
/// Returns the first alternative that matched, for logging.
pub fn condition_matches<'a>(alternatives: &'a [String], keywords: &[String]) -> Option<&'a str> {
    alternatives
        .iter()
        .find(|alt| keywords.iter().any(|kw| alternative_matches(alt, kw)))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Hello_World"), "hello world");
        assert_eq!(normalize_text("foo-bar-baz"), "foo bar baz");
        assert_eq!(normalize_text("  multiple   spaces  "), "multiple spaces");
    }

    #[test]
    fn test_parse_keywords_dedupes_and_splits() {
        let kws = parse_keywords(&["API, auth", "api|Database_Migration"][..]);
        assert_eq!(kws, vec!["api", "auth", "database migration"]);
    }

    #[test]
    fn test_alternative_matches_case_insensitive() {
        assert!(alternative_matches("Database", "database"));
        assert!(alternative_matches("DATABASE", "data"));
    }

    #[test]
    fn test_alternative_matches_partial_both_directions() {
        assert!(alternative_matches("auth", "authentication"));
        assert!(alternative_matches("api-endpoint", "endpoint"));
        assert!(!alternative_matches("frontend", "backend"));
    }

    #[test]
    fn test_condition_matches_or_semantics() {
        let alternatives = vec!["migration".to_string(), "schema".to_string()];
        assert_eq!(
            condition_matches(&alternatives, &["add schema column".to_string()]),
            Some("schema")
        );
        assert_eq!(condition_matches(&alternatives, &["styling".to_string()]), None);
        assert_eq!(condition_matches(&alternatives, &[]), None);
    }
}
