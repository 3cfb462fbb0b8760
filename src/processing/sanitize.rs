//! Helpers for normalizing document metadata.

use std::collections::HashSet;

use super::types::DEFAULT_CATEGORY;

/// Trim string input and drop empties.
pub(crate) fn sanitize_string(value: Option<&str>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Trimmed category, falling back to [`DEFAULT_CATEGORY`].
pub fn sanitize_category(value: Option<&str>) -> String {
    sanitize_string(value).unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

/// Trim tags, drop blanks and exact repeats; case and inner punctuation are kept as given.
pub fn sanitize_tags(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty() && seen.insert(*tag))
        .map(str::to_string)
        .collect()
}
