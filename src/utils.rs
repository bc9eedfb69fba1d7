//! Utility functions for string flags, file sizes and URL-derived names

use serde::{Deserialize, Deserializer};
use std::path::Path;

/// Check whether a settings string spells "true"
///
/// Accepted spellings (case-insensitive): `true`, `t`, `yes`, `y`, `on`, `o`,
/// `1`, `+`. Everything else, including the empty string, is false.
///
/// # Examples
///
/// ```
/// use poddown::utils::is_truthy;
///
/// assert!(is_truthy("Yes"));
/// assert!(is_truthy("+"));
/// assert!(!is_truthy("nope"));
/// assert!(!is_truthy(""));
/// ```
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    const TRUTHY: [&str; 8] = ["true", "t", "yes", "y", "on", "o", "1", "+"];
    let value = value.trim();
    TRUTHY.iter().any(|t| value.eq_ignore_ascii_case(t))
}

/// A boolean as written in a settings or source-list document
#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

/// Deserialize an optional flag that may be a JSON boolean or a truthy string
///
/// Missing, `null` and empty/whitespace strings all map to `None` so the caller
/// can fall back to its default.
pub fn deserialize_opt_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = Option::<Flag>::deserialize(deserializer)?;
    Ok(match flag {
        None => None,
        Some(Flag::Bool(b)) => Some(b),
        Some(Flag::Text(s)) if s.trim().is_empty() => None,
        Some(Flag::Text(s)) => Some(is_truthy(&s)),
    })
}

/// Parse a size hint attribute; unparsable or non-positive values are unknown
///
/// # Examples
///
/// ```
/// use poddown::utils::parse_size_hint;
///
/// assert_eq!(parse_size_hint("12345"), Some(12345));
/// assert_eq!(parse_size_hint("0"), None);
/// assert_eq!(parse_size_hint("-1"), None);
/// assert_eq!(parse_size_hint("abc"), None);
/// ```
#[must_use]
pub fn parse_size_hint(value: &str) -> Option<u64> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .map(|n| n as u64)
}

/// Current size of a file, or `None` if it does not exist or cannot be read
#[must_use]
pub fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().map(|m| m.len())
}

/// Take the text after the last `/` of a URL as a filename
///
/// Returns `None` when there is no `/` or nothing follows it.
///
/// # Examples
///
/// ```
/// use poddown::utils::filename_from_url;
///
/// assert_eq!(filename_from_url("https://cdn.example.com/show/ep1.mp3"), Some("ep1.mp3"));
/// assert_eq!(filename_from_url("https://cdn.example.com/show/"), None);
/// assert_eq!(filename_from_url("ep1.mp3"), None);
/// ```
#[must_use]
pub fn filename_from_url(url: &str) -> Option<&str> {
    let (_, name) = url.rsplit_once('/')?;
    if name.is_empty() { None } else { Some(name) }
}
