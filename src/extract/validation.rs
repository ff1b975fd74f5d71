//! Field-level validation for verification blocks

/// Maximum allowed length for `context-check` ids and test names
pub const MAX_ID_LENGTH: usize = 128;

/// An id is valid if it is non-empty, at most [`MAX_ID_LENGTH`] characters,
/// and made only of ASCII alphanumerics, dashes, underscores and dots.
pub fn validate_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("id cannot be empty".to_string());
    }

    if id.len() > MAX_ID_LENGTH {
        return Err(format!(
            "id too long: {} characters (max {MAX_ID_LENGTH})",
            id.len()
        ));
    }

    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid_chars {
        return Err(format!(
            "id '{id}' contains invalid characters; use only alphanumerics, '-', '_' and '.'"
        ));
    }

    if id.chars().all(|c| c == '.') {
        return Err(format!("id '{id}' is reserved"));
    }

    Ok(())
}

/// Strip one pair of matching surrounding quotes, unless the quote also
/// appears inside (`"a" && "b"` is left alone)
pub fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            let inner = &value[1..value.len() - 1];
            if !inner.contains(quote) {
                return inner;
            }
        }
    }
    value
}

pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" => Ok(true),
        "false" | "no" => Ok(false),
        other => Err(format!("expected true/false/yes/no, got '{other}'")),
    }
}

/// Comma-separated list with blanks dropped
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| strip_quotes(item).trim())
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
