//! SQL text helpers

/// Escape LIKE metacharacters (%, _, \) so they match literally
///
/// Pair the resulting pattern with `ESCAPE '\'`.
///
/// # Example
///
/// ```
/// use mimiron_server::utils::sql::escape_like_pattern;
///
/// assert_eq!(escape_like_pattern("50%_off"), "50\\%\\_off");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Case-insensitive substring pattern for `UPPER(column) LIKE ?`
///
/// Only ASCII letters are folded, matching SQLite's `UPPER` and `LIKE`.
pub fn contains_pattern(needle: &str) -> String {
    format!("%{}%", escape_like_pattern(&needle.to_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_pattern_plain() {
        assert_eq!(escape_like_pattern("admin"), "admin");
        assert_eq!(escape_like_pattern(""), "");
    }

    #[test]
    fn test_escape_like_pattern_metacharacters() {
        assert_eq!(escape_like_pattern("a\\b"), "a\\\\b");
        assert_eq!(escape_like_pattern("100%_\\x"), "100\\%\\_\\\\x");
    }

    #[test]
    fn test_contains_pattern_uppercases_and_wraps() {
        assert_eq!(contains_pattern("john_doe"), "%JOHN\\_DOE%");
        assert_eq!(contains_pattern(""), "%%");
    }

    #[test]
    fn test_contains_pattern_folds_ascii_only() {
        assert_eq!(contains_pattern("café"), "%CAFé%");
    }
}
